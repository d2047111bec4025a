//! Portal views and the guards that protect them.

use crate::auth_fsm::SessionSnapshot;
use crate::guards::{check_all, AuthGuard, GuardDecision, GuestGuard, RoleGuard, RouteGuard};
use portal_storage::Role;
use serde::Serialize;
use std::fmt;

/// A navigable view of the portal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    Home,
    /// Combined sign-in / sign-up view.
    Login,
    Doctors,
    Appointments,
    Beds,
    Emergency,
    HospitalDashboard,
}

impl View {
    pub const ALL: [View; 7] = [
        View::Home,
        View::Login,
        View::Doctors,
        View::Appointments,
        View::Beds,
        View::Emergency,
        View::HospitalDashboard,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            View::Home => "/",
            View::Login => "/register",
            View::Doctors => "/doctors",
            View::Appointments => "/appointments",
            View::Beds => "/beds",
            View::Emergency => "/emergency",
            View::HospitalDashboard => "/hospital-dashboard",
        }
    }

    /// Look up the view served at `path`. Trailing slashes are ignored.
    pub fn from_path(path: &str) -> Option<View> {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        View::ALL.into_iter().find(|view| view.path() == normalized)
    }

    /// Guards protecting this view, outermost first.
    pub fn guards(&self) -> Vec<Box<dyn RouteGuard>> {
        match self {
            View::Login => vec![Box::new(GuestGuard)],
            View::HospitalDashboard => vec![Box::new(AuthGuard), Box::new(RoleGuard::new(Role::Admin))],
            View::Home | View::Doctors | View::Appointments | View::Beds | View::Emergency => {
                Vec::new()
            }
        }
    }

    /// Evaluate this view's guards against a session snapshot.
    pub fn check(&self, session: &SessionSnapshot) -> GuardDecision {
        let guards = self.guards();
        let refs: Vec<&dyn RouteGuard> = guards.iter().map(|g| g.as_ref()).collect();
        check_all(&refs, session)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// What the router should do for a navigation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Render(View),
    Redirect(View),
    Pending,
    NotFound,
}

/// Resolve a navigation to `path` against the current session.
pub fn resolve(path: &str, session: &SessionSnapshot) -> RouteOutcome {
    let Some(view) = View::from_path(path) else {
        return RouteOutcome::NotFound;
    };

    match view.check(session) {
        GuardDecision::Allow => RouteOutcome::Render(view),
        GuardDecision::Redirect(target) => RouteOutcome::Redirect(target),
        GuardDecision::Pending => RouteOutcome::Pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use portal_storage::Identity;

    fn as_role(role: Role) -> SessionSnapshot {
        SessionSnapshot::authenticated(Identity::new(1).with_role(role))
    }

    #[test]
    fn test_paths_round_trip() {
        for view in View::ALL {
            assert_eq!(View::from_path(view.path()), Some(view));
        }
        assert_eq!(View::from_path("/doctors/"), Some(View::Doctors));
        assert_eq!(View::from_path(""), Some(View::Home));
        assert_eq!(View::from_path("/reports"), None);
    }

    #[test]
    fn test_dashboard_resolution() {
        assert_eq!(
            resolve("/hospital-dashboard", &SessionSnapshot::anonymous()),
            RouteOutcome::Redirect(View::Login)
        );
        assert_eq!(
            resolve("/hospital-dashboard", &as_role(Role::Doctor)),
            RouteOutcome::Redirect(View::Home)
        );
        assert_eq!(
            resolve("/hospital-dashboard", &as_role(Role::Admin)),
            RouteOutcome::Render(View::HospitalDashboard)
        );
        assert_eq!(
            resolve("/hospital-dashboard", &SessionSnapshot::initializing()),
            RouteOutcome::Pending
        );
    }

    #[test]
    fn test_login_view_bounces_signed_in_users() {
        assert_eq!(
            resolve("/register", &SessionSnapshot::anonymous()),
            RouteOutcome::Render(View::Login)
        );
        assert_eq!(
            resolve("/register", &as_role(Role::Staff)),
            RouteOutcome::Redirect(View::Home)
        );
    }

    #[test]
    fn test_public_views_render_for_everyone() {
        for path in ["/", "/doctors", "/appointments", "/beds", "/emergency"] {
            assert!(matches!(
                resolve(path, &SessionSnapshot::anonymous()),
                RouteOutcome::Render(_)
            ));
            assert!(matches!(
                resolve(path, &SessionSnapshot::initializing()),
                RouteOutcome::Render(_)
            ));
        }
    }

    #[test]
    fn test_unknown_path() {
        assert_eq!(
            resolve("/nowhere", &SessionSnapshot::anonymous()),
            RouteOutcome::NotFound
        );
    }
}
