use super::*;
use crate::session::test_helpers::profile;
use crate::session::{SessionFault, SessionPhase};

fn signed_in(role: Role) -> SessionState {
    SessionState { phase: SessionPhase::Authenticated(profile(role)), pending_calls: 0, session_user: None }
}

fn anonymous() -> SessionState {
    SessionState { phase: SessionPhase::Anonymous, pending_calls: 0, session_user: None }
}

// =============================================================================
// role mappings
// =============================================================================

#[test]
fn post_auth_route_per_role() {
    assert_eq!(post_auth_route(Role::Admin), Route::Dashboard);
    assert_eq!(post_auth_route(Role::Client), Route::Services);
    assert_eq!(post_auth_route(Role::Employee), Route::Dashboard);
}

#[test]
fn post_auth_route_unknown_role_falls_back_to_dashboard() {
    assert_eq!(post_auth_route(Role::Unknown), Route::Dashboard);
}

#[test]
fn entry_route_per_role() {
    assert_eq!(entry_route(None), Route::SignIn);
    assert_eq!(entry_route(Some(&profile(Role::Admin))), Route::Dashboard);
    assert_eq!(entry_route(Some(&profile(Role::Client))), Route::Services);
    assert_eq!(entry_route(Some(&profile(Role::Employee))), Route::Tasks);
    assert_eq!(entry_route(Some(&profile(Role::Unknown))), Route::SignIn);
}

#[test]
fn employee_mappings_disagree() {
    let employee = profile(Role::Employee);
    assert_ne!(entry_route(Some(&employee)), post_auth_route(employee.role));
}

// =============================================================================
// Route / Location
// =============================================================================

#[test]
fn route_paths_and_groups() {
    assert_eq!(Route::SignIn.path(), "/sign-in");
    assert_eq!(Route::Services.to_string(), "/services");
    assert!(Route::SignUp.is_auth());
    assert!(!Route::Dashboard.is_auth());
}

#[test]
fn route_location_includes_group() {
    assert!(Route::ForgotPassword.location().in_auth_group());
    assert_eq!(Route::Tasks.location().segments(), ["(app)", "tasks"]);
}

#[test]
fn location_parse_ignores_empty_segments() {
    let loc = Location::parse("//(auth)//sign-in/");
    assert_eq!(loc.segments(), ["(auth)", "sign-in"]);
    assert!(loc.in_auth_group());
}

#[test]
fn root_location_is_outside_auth_group() {
    assert!(!Location::parse("/").in_auth_group());
    assert!(Location::parse("").segments().is_empty());
}

// =============================================================================
// redirect_for
// =============================================================================

#[test]
fn anonymous_outside_auth_goes_to_sign_in() {
    assert_eq!(redirect_for(None, &Location::parse("/(app)/dashboard")), Some(Route::SignIn));
}

#[test]
fn anonymous_inside_auth_stays() {
    assert_eq!(redirect_for(None, &Location::parse("/(auth)/sign-up")), None);
}

#[test]
fn signed_in_inside_auth_goes_to_role_route() {
    let loc = Location::parse("/(auth)/sign-in");
    assert_eq!(redirect_for(Some(&profile(Role::Client)), &loc), Some(Route::Services));
    assert_eq!(redirect_for(Some(&profile(Role::Admin)), &loc), Some(Route::Dashboard));
    assert_eq!(redirect_for(Some(&profile(Role::Employee)), &loc), Some(Route::Dashboard));
}

#[test]
fn signed_in_inside_app_stays() {
    assert_eq!(redirect_for(Some(&profile(Role::Admin)), &Location::parse("/(app)/users")), None);
}

// =============================================================================
// RouteGuard
// =============================================================================

#[test]
fn guard_waits_for_navigation_ready() {
    let mut guard = RouteGuard::new();
    assert_eq!(guard.observe(&anonymous(), None), None);
    assert_eq!(guard.observe(&anonymous(), Some(&Location::parse("/(app)/tasks"))), Some(Route::SignIn));
}

#[test]
fn guard_waits_for_restore() {
    let mut guard = RouteGuard::new();
    let loading = SessionState { phase: SessionPhase::Loading, pending_calls: 0, session_user: None };
    assert_eq!(guard.observe(&loading, Some(&Location::parse("/(app)/tasks"))), None);
}

#[test]
fn guard_only_fires_on_change() {
    let mut guard = RouteGuard::new();
    let loc = Location::parse("/(auth)/sign-in");
    let state = signed_in(Role::Client);

    assert_eq!(guard.observe(&state, Some(&loc)), Some(Route::Services));
    assert_eq!(guard.observe(&state, Some(&loc)), None);

    let moved = Location::parse("/(app)/services");
    assert_eq!(guard.observe(&state, Some(&moved)), None);

    assert_eq!(guard.observe(&anonymous(), Some(&moved)), Some(Route::SignIn));
}

#[test]
fn guard_treats_fault_as_signed_out() {
    let mut guard = RouteGuard::new();
    let failed = SessionState {
        phase: SessionPhase::Failed(SessionFault::ProfileNotFound),
        pending_calls: 0,
        session_user: None,
    };
    assert_eq!(guard.observe(&failed, Some(&Location::parse("/(app)/dashboard"))), Some(Route::SignIn));
}

// =============================================================================
// tabs_for
// =============================================================================

fn titles(role: Option<Role>) -> Vec<&'static str> {
    tabs_for(role).iter().map(|t| t.title).collect()
}

#[test]
fn admin_tabs() {
    assert_eq!(titles(Some(Role::Admin)), ["Dashboard", "Users", "Assignments", "Reports", "Settings"]);
}

#[test]
fn employee_tabs() {
    assert_eq!(titles(Some(Role::Employee)), ["My Tasks", "Schedule", "History", "Settings"]);
    assert_eq!(tabs_for(Some(Role::Employee))[0].route, Route::Tasks);
}

#[test]
fn client_tabs() {
    assert_eq!(titles(Some(Role::Client)), ["Services", "History", "Schedule", "Settings"]);
}

#[test]
fn no_tabs_without_known_role() {
    assert!(tabs_for(None).is_empty());
    assert!(tabs_for(Some(Role::Unknown)).is_empty());
}
