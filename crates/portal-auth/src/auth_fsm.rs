//! Session state machine using rust-fsm.
//!
//! ## State Diagram
//!
//! ```text
//!             ┌──────────────────┐
//!             │   Initializing   │ (initial)
//!             └────────┬─────────┘
//!   NoStoredSession    │    StoredSessionRestored
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐  LoginSucceeded  ┌─────────────────┐
//! │    Anonymous    │ ───────────────► │  Authenticated  │
//! │                 │ ◄─────────────── │                 │
//! └─────────────────┘  LogoutRequested └─────────────────┘
//!                      SessionRejected
//! ```
//!
//! A failed login leaves either settled state where it was.

use portal_storage::Identity;
use rust_fsm::*;
use serde::Serialize;

state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Initializing)

    Initializing => {
        StoredSessionRestored => Authenticated,
        NoStoredSession => Anonymous
    },
    Anonymous => {
        LoginSucceeded => Authenticated,
        LoginFailed => Anonymous,
        LogoutRequested => Anonymous,
        SessionRejected => Anonymous
    },
    Authenticated => {
        LoginSucceeded => Authenticated,
        LoginFailed => Authenticated,
        LogoutRequested => Anonymous,
        SessionRejected => Anonymous
    }
}

pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// Session state as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "identity", rename_all = "snake_case")]
pub enum SessionState {
    /// Stored session not yet read.
    Initializing,
    /// No signed-in user.
    Anonymous,
    /// Signed in as the given identity.
    Authenticated(Identity),
}

impl SessionState {
    pub fn is_settled(&self) -> bool {
        !matches!(self, SessionState::Initializing)
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Initializing => "initializing",
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticated(_) => "authenticated",
        }
    }
}

/// Point-in-time view of the session, broadcast on every change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    /// Whether a token pair was stored when the snapshot was taken.
    pub has_tokens: bool,
}

impl SessionSnapshot {
    pub fn initializing() -> Self {
        Self {
            state: SessionState::Initializing,
            has_tokens: false,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            state: SessionState::Anonymous,
            has_tokens: false,
        }
    }

    pub fn authenticated(identity: Identity) -> Self {
        Self {
            state: SessionState::Authenticated(identity),
            has_tokens: true,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.state.is_settled()
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.state.identity()
    }
}
