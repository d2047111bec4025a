//! Navigation guards.
//!
//! Guards are pure functions of a [`SessionSnapshot`]. They never touch the
//! session themselves; callers re-run them whenever the snapshot changes.

use crate::auth_fsm::{SessionSnapshot, SessionState};
use crate::routes::View;
use portal_storage::Role;

/// Outcome of a guard check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(View),
    /// The session has not settled yet; render nothing protected.
    Pending,
}

impl GuardDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, GuardDecision::Allow)
    }
}

/// A navigation policy.
pub trait RouteGuard: Send + Sync {
    fn check(&self, session: &SessionSnapshot) -> GuardDecision;
}

/// Requires a signed-in user; otherwise sends them to the login view.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthGuard;

impl RouteGuard for AuthGuard {
    fn check(&self, session: &SessionSnapshot) -> GuardDecision {
        match &session.state {
            SessionState::Initializing => GuardDecision::Pending,
            SessionState::Anonymous => GuardDecision::Redirect(View::Login),
            SessionState::Authenticated(_) => GuardDecision::Allow,
        }
    }
}

/// Requires a signed-in user holding `role`.
///
/// Signed-out users go to the login view; signed-in users with another role
/// (or no recognized role) go home.
#[derive(Debug, Clone, Copy)]
pub struct RoleGuard {
    pub role: Role,
}

impl RoleGuard {
    pub fn new(role: Role) -> Self {
        Self { role }
    }
}

impl RouteGuard for RoleGuard {
    fn check(&self, session: &SessionSnapshot) -> GuardDecision {
        match AuthGuard.check(session) {
            GuardDecision::Allow => {}
            other => return other,
        }
        match session.identity() {
            Some(identity) if identity.has_role(self.role) => GuardDecision::Allow,
            _ => GuardDecision::Redirect(View::Home),
        }
    }
}

/// Only for signed-out users; signed-in users are sent home.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuestGuard;

impl RouteGuard for GuestGuard {
    fn check(&self, session: &SessionSnapshot) -> GuardDecision {
        match &session.state {
            SessionState::Initializing => GuardDecision::Pending,
            SessionState::Anonymous => GuardDecision::Allow,
            SessionState::Authenticated(_) => GuardDecision::Redirect(View::Home),
        }
    }
}

/// Run guards in order; the first non-Allow decision wins.
pub fn check_all(guards: &[&dyn RouteGuard], session: &SessionSnapshot) -> GuardDecision {
    guards
        .iter()
        .map(|guard| guard.check(session))
        .find(|decision| !decision.is_allowed())
        .unwrap_or(GuardDecision::Allow)
}
