//! Role-based navigation: routes, redirects, and tab sets.
//!
//! DESIGN
//! ======
//! Two role→route mappings exist and disagree for employees:
//! - entry (`/` index): employee lands on `tasks`
//! - post-auth (leaving the auth group): employee lands on `dashboard`
//!
//! Both are kept as-is pending a product decision on the canonical
//! employee landing route.

use std::fmt;

use crate::profile::{Role, UserProfile};
use crate::session::SessionState;

const AUTH_GROUP: &str = "(auth)";
const APP_GROUP: &str = "(app)";

// =============================================================================
// ROUTES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    SignUp,
    ForgotPassword,
    Dashboard,
    Users,
    Assignments,
    Reports,
    Settings,
    Tasks,
    Schedule,
    History,
    Services,
}

impl Route {
    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::SignIn => "/sign-in",
            Self::SignUp => "/sign-up",
            Self::ForgotPassword => "/forgot-password",
            Self::Dashboard => "/dashboard",
            Self::Users => "/users",
            Self::Assignments => "/assignments",
            Self::Reports => "/reports",
            Self::Settings => "/settings",
            Self::Tasks => "/tasks",
            Self::Schedule => "/schedule",
            Self::History => "/history",
            Self::Services => "/services",
        }
    }

    /// True for the public sign-in/sign-up screens.
    #[must_use]
    pub fn is_auth(self) -> bool {
        matches!(self, Self::SignIn | Self::SignUp | Self::ForgotPassword)
    }

    /// Route file location, group segment included.
    #[must_use]
    pub fn location(self) -> Location {
        let group = if self.is_auth() { AUTH_GROUP } else { APP_GROUP };
        Location::parse(&format!("/{group}{}", self.path()))
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Landing route when opening the app root.
#[must_use]
pub fn entry_route(user: Option<&UserProfile>) -> Route {
    match user.map(|u| u.role) {
        None | Some(Role::Unknown) => Route::SignIn,
        Some(Role::Admin) => Route::Dashboard,
        Some(Role::Client) => Route::Services,
        Some(Role::Employee) => Route::Tasks,
    }
}

/// Landing route when an authenticated user is still inside the auth group.
#[must_use]
pub fn post_auth_route(role: Role) -> Route {
    match role {
        Role::Client => Route::Services,
        Role::Admin | Role::Employee | Role::Unknown => Route::Dashboard,
    }
}

// =============================================================================
// LOCATION
// =============================================================================

/// Current navigation position as path segments, e.g. `["(auth)", "sign-in"]`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    segments: Vec<String>,
}

impl Location {
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    #[must_use]
    pub fn in_auth_group(&self) -> bool {
        self.segments.first().is_some_and(|s| s == AUTH_GROUP)
    }
}

// =============================================================================
// GUARD
// =============================================================================

/// Redirect decision for one `(user, location)` pair.
#[must_use]
pub fn redirect_for(user: Option<&UserProfile>, location: &Location) -> Option<Route> {
    match (user, location.in_auth_group()) {
        (None, false) => Some(Route::SignIn),
        (Some(user), true) => Some(post_auth_route(user.role)),
        _ => None,
    }
}

/// Re-evaluates the redirect whenever the current user or location changes.
///
/// Nothing is decided until navigation reports ready, or while the session
/// is still restoring.
#[derive(Debug, Default)]
pub struct RouteGuard {
    last: Option<(Option<(uuid::Uuid, Role)>, Location)>,
}

impl RouteGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a redirect only when the inputs changed since the previous
    /// call and the pair calls for one.
    pub fn observe(&mut self, state: &SessionState, location: Option<&Location>) -> Option<Route> {
        let location = location?;
        if !state.is_settled() {
            return None;
        }
        let user = state.user();
        let key = (user.map(|u| (u.id, u.role)), location.clone());
        if self.last.as_ref() == Some(&key) {
            return None;
        }
        self.last = Some(key);
        let redirect = redirect_for(user, location);
        if let Some(route) = redirect {
            tracing::debug!(%route, from = ?location.segments(), "route guard redirect");
        }
        redirect
    }
}

// =============================================================================
// TABS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tab {
    pub route: Route,
    pub title: &'static str,
}

const ADMIN_TABS: &[Tab] = &[
    Tab { route: Route::Dashboard, title: "Dashboard" },
    Tab { route: Route::Users, title: "Users" },
    Tab { route: Route::Assignments, title: "Assignments" },
    Tab { route: Route::Reports, title: "Reports" },
    Tab { route: Route::Settings, title: "Settings" },
];

const EMPLOYEE_TABS: &[Tab] = &[
    Tab { route: Route::Tasks, title: "My Tasks" },
    Tab { route: Route::Schedule, title: "Schedule" },
    Tab { route: Route::History, title: "History" },
    Tab { route: Route::Settings, title: "Settings" },
];

const CLIENT_TABS: &[Tab] = &[
    Tab { route: Route::Services, title: "Services" },
    Tab { route: Route::History, title: "History" },
    Tab { route: Route::Schedule, title: "Schedule" },
    Tab { route: Route::Settings, title: "Settings" },
];

/// Tab bar for the signed-in role; empty when nobody (or an unknown role)
/// is signed in.
#[must_use]
pub fn tabs_for(role: Option<Role>) -> &'static [Tab] {
    match role {
        Some(Role::Admin) => ADMIN_TABS,
        Some(Role::Employee) => EMPLOYEE_TABS,
        Some(Role::Client) => CLIENT_TABS,
        Some(Role::Unknown) | None => &[],
    }
}

#[cfg(test)]
#[path = "navigation_test.rs"]
mod tests;
