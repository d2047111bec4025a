//! Session and authorization core for the hospital portal.
//!
//! This crate provides:
//! - Identity decoding from access tokens and login responses
//! - A request pipeline that injects the bearer token and normalizes errors
//! - Session management with an explicit FSM and overlapping-login protection
//! - Route guards and the portal's route table
//! - Resource API helpers for patients, doctors, appointments, staff and beds

mod api_client;
mod auth_fsm;
mod claims;
mod error;
mod forms;
mod guards;
mod resources;
mod routes;
mod session;

#[cfg(test)]
mod tests;

pub use api_client::{ApiBody, ApiClient, ApiError, ApiRequest, ApiResponse, Method};
pub use auth_fsm::session_machine;
pub use auth_fsm::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionSnapshot, SessionState,
};
pub use claims::{decode, resolve_identity, DecodeError, IdentitySource, ServerUser, TokenClaims};
pub use error::{AuthError, AuthResult, FALLBACK_MESSAGE};
pub use forms::{Credentials, RegistrationForm};
pub use guards::{check_all, AuthGuard, GuardDecision, GuestGuard, RoleGuard, RouteGuard};
pub use resources::{Resource, ResourceApi, UpdateMode};
pub use routes::{resolve, RouteOutcome, View};
pub use session::{
    NavigationCallback, SessionContext, LOGIN_ENDPOINT, LOGOUT_ENDPOINT, PROFILE_ENDPOINT,
    REGISTER_ENDPOINT,
};

pub use portal_storage::{Identity, Role};
