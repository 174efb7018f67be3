use super::*;
use crate::session::test_helpers::profile;

#[test]
fn default_state_is_uninitialized_and_loading() {
    let state = SessionState::default();
    assert_eq!(state.phase, SessionPhase::Uninitialized);
    assert!(state.is_loading());
    assert!(!state.is_settled());
    assert!(state.user().is_none());
}

#[test]
fn authenticated_exposes_user_and_role() {
    let user = profile(Role::Client);
    let state = SessionState { phase: SessionPhase::Authenticated(user.clone()), pending_calls: 0, session_user: None };
    assert_eq!(state.user(), Some(&user));
    assert_eq!(state.role(), Some(Role::Client));
    assert!(!state.is_loading());
    assert!(state.is_settled());
}

#[test]
fn pending_calls_raise_loading_flag() {
    let state = SessionState { phase: SessionPhase::Anonymous, pending_calls: 1, session_user: None };
    assert!(state.is_loading());
    assert!(state.is_settled());
}

#[test]
fn failed_state_has_no_user() {
    let state = SessionState {
        phase: SessionPhase::Failed(SessionFault::ProfileNotFound),
        pending_calls: 0,
        session_user: None,
    };
    assert!(state.user().is_none());
    assert_eq!(state.fault(), Some(&SessionFault::ProfileNotFound));
    assert!(!state.is_terminal());
}

#[test]
fn configuration_fault_is_terminal() {
    let fault = SessionFault::Configuration("missing BACKEND_URL".into());
    assert!(fault.is_terminal());
    assert!(!SessionFault::ProfileLoad.is_terminal());
    let state = SessionState { phase: SessionPhase::Failed(fault), pending_calls: 0, session_user: None };
    assert!(state.is_terminal());
}

#[test]
fn fault_messages_match_screen_copy() {
    assert_eq!(SessionFault::ProfileNotFound.to_string(), "User profile not found");
    assert_eq!(SessionFault::ProfileLoad.to_string(), "Error loading user profile");
    assert!(
        SessionFault::Configuration("x".into())
            .to_string()
            .starts_with("Missing backend configuration")
    );
}

#[test]
fn resolution_is_tied_to_the_session_user() {
    let user = profile(Role::Admin);
    let other = uuid::Uuid::new_v4();
    let state = SessionState {
        phase: SessionPhase::Authenticated(user.clone()),
        pending_calls: 0,
        session_user: Some(user.id),
    };
    assert!(state.is_resolved_for(user.id));
    assert!(!state.is_resolved_for(other));

    let stale_fault = SessionState {
        phase: SessionPhase::Failed(SessionFault::ProfileLoad),
        pending_calls: 0,
        session_user: Some(other),
    };
    assert!(!stale_fault.is_resolved_for(user.id));
    assert!(stale_fault.is_resolved_for(other));
}

#[test]
fn loading_is_never_resolved() {
    let id = uuid::Uuid::new_v4();
    let state = SessionState { phase: SessionPhase::Loading, pending_calls: 0, session_user: Some(id) };
    assert!(!state.is_resolved_for(id));
}
