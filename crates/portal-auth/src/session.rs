//! Session context: the single owner of the signed-in user's state.
//!
//! State lives in an explicit FSM and is published on a `watch` channel so
//! guards and views re-evaluate on every change. Persistence goes through the
//! [`TokenStore`]; identity comes from the login response or the token claims.
//!
//! Overlapping logins are resolved with generation tickets. Each attempt takes
//! a ticket when it starts, and its result is applied only if no newer attempt
//! (or logout) has started since. The ticket check and the state change happen
//! under the same lock, so a stale result can never interleave with a newer one.

use crate::api_client::{ApiClient, ApiError, ApiRequest, ApiResponse};
use crate::auth_fsm::{SessionMachine, SessionMachineInput, SessionMachineState, SessionSnapshot};
use crate::claims;
use crate::error::FALLBACK_MESSAGE;
use crate::forms::{Credentials, RegistrationForm};
use crate::routes::View;
use crate::{AuthError, AuthResult};
use parking_lot::Mutex;
use portal_storage::{Identity, TokenPair, TokenStore};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

pub const LOGIN_ENDPOINT: &str = "/auth/login/";
pub const LOGOUT_ENDPOINT: &str = "/auth/logout/";
pub const REGISTER_ENDPOINT: &str = "/auth/register/";
pub const PROFILE_ENDPOINT: &str = "/auth/profile/";

/// Callback type for navigation requests raised by session changes.
pub type NavigationCallback = Box<dyn Fn(View) + Send + Sync>;

/// Successful login response.
#[derive(Debug, Deserialize)]
struct LoginResponse {
    access: String,
    refresh: String,
    #[serde(default)]
    user: Option<Value>,
}

/// Process-wide session state shared by every consumer.
pub struct SessionContext {
    client: ApiClient,
    tokens: Arc<TokenStore>,
    /// Internal FSM. Its lock also serializes every session mutation.
    fsm: Mutex<SessionMachine>,
    state_tx: watch::Sender<SessionSnapshot>,
    /// Bumped by every login attempt and every logout.
    generation: AtomicU64,
    navigation_callback: Mutex<Option<NavigationCallback>>,
}

impl SessionContext {
    /// Create an uninitialized session context over the given client.
    pub fn new(client: ApiClient) -> Self {
        let tokens = client.tokens().clone();
        let (state_tx, _) = watch::channel(SessionSnapshot::initializing());
        Self {
            client,
            tokens,
            fsm: Mutex::new(SessionMachine::new()),
            state_tx,
            generation: AtomicU64::new(0),
            navigation_callback: Mutex::new(None),
        }
    }

    /// Set a callback to be told where the user should be sent next.
    pub fn set_navigation_callback(&self, callback: NavigationCallback) {
        *self.navigation_callback.lock() = Some(callback);
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.tokens
    }

    /// Current session state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.state_tx.borrow().clone()
    }

    /// Receiver that observes every subsequent state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state_tx.subscribe()
    }

    /// Currently signed-in identity, if any.
    pub fn identity(&self) -> Option<Identity> {
        self.snapshot().identity().cloned()
    }

    /// Resolve once the stored session has been read.
    pub async fn wait_until_settled(&self) -> SessionSnapshot {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(SessionSnapshot::is_settled).await {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        };
        settled
    }

    /// Apply an FSM input while holding the FSM lock.
    fn transition(
        &self,
        fsm: &mut SessionMachine,
        input: &SessionMachineInput,
        snapshot: SessionSnapshot,
    ) -> AuthResult<()> {
        let old_state = fsm.state().clone();

        fsm.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input,
                fsm.state()
            ))
        })?;

        debug!(
            old_state = ?old_state,
            new_state = ?fsm.state(),
            input = ?input,
            "Session state transition"
        );
        self.state_tx.send_replace(snapshot);
        Ok(())
    }

    fn navigate(&self, view: View) {
        let cb = self.navigation_callback.lock();
        if let Some(callback) = cb.as_ref() {
            callback(view);
        }
    }

    // ==========================================
    // Initialization
    // ==========================================

    /// Read the stored session and settle into Anonymous or Authenticated.
    ///
    /// Calling this again after the session has settled is a no-op.
    pub fn initialize(&self) -> SessionSnapshot {
        let mut fsm = self.fsm.lock();
        if *fsm.state() != SessionMachineState::Initializing {
            return self.snapshot();
        }

        let (input, snapshot) = match self.restore_identity() {
            Some(identity) => {
                info!(
                    user_id = identity.user_id,
                    role = ?identity.role,
                    "Restored stored session"
                );
                (
                    SessionMachineInput::StoredSessionRestored,
                    SessionSnapshot::authenticated(identity),
                )
            }
            None => {
                info!("No stored session found");
                (SessionMachineInput::NoStoredSession, SessionSnapshot::anonymous())
            }
        };

        if let Err(e) = self.transition(&mut fsm, &input, snapshot) {
            warn!(error = %e, "Failed to settle session");
        }
        drop(fsm);
        self.snapshot()
    }

    fn restore_identity(&self) -> Option<Identity> {
        let pair = self.tokens.load()?;

        if let Some(identity) = self.tokens.load_identity() {
            return Some(identity);
        }

        match claims::decode(&pair.access) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!(error = %e, "Stored access token is undecodable, discarding session");
                if let Err(e) = self.tokens.clear() {
                    warn!(error = %e, "Failed to clear undecodable session");
                }
                None
            }
        }
    }

    // ==========================================
    // Login / logout
    // ==========================================

    /// Sign in. On success the session is Authenticated and the user is sent home.
    ///
    /// A failed or superseded attempt changes nothing.
    pub async fn login(&self, credentials: &Credentials) -> AuthResult<Identity> {
        if !self.snapshot().is_settled() {
            self.initialize();
        }

        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            username = %credentials.username,
            hospital_id = %credentials.hospital_id,
            attempt = ticket,
            "Login attempt"
        );

        let body = serde_json::to_value(credentials)?;
        let outcome = self
            .client
            .call(LOGIN_ENDPOINT, ApiRequest::post(body).anonymous())
            .await;

        let accepted = match outcome {
            Ok(response) if response.status == 200 => Self::parse_login(response),
            Ok(response) => Err(AuthError::LoginRejected(
                Self::rejection_message(response.into_value()),
            )),
            Err(ApiError::Status { data, .. }) => Err(AuthError::LoginRejected(
                data.map(Self::rejection_message)
                    .unwrap_or_else(|| FALLBACK_MESSAGE.to_string()),
            )),
            Err(e) => Err(AuthError::Api(e)),
        };

        let mut fsm = self.fsm.lock();
        if self.generation.load(Ordering::SeqCst) != ticket {
            info!(attempt = ticket, "Discarding superseded login result");
            return Err(AuthError::Superseded);
        }

        let (pair, identity) = match accepted {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(attempt = ticket, error = %e, "Login failed");
                let unchanged = self.snapshot();
                self.transition(&mut fsm, &SessionMachineInput::LoginFailed, unchanged)?;
                return Err(e);
            }
        };

        if let Err(e) = self.persist(&pair, &identity) {
            warn!(attempt = ticket, error = %e, "Failed to store session");
            let unchanged = self.snapshot();
            self.transition(&mut fsm, &SessionMachineInput::LoginFailed, unchanged)?;
            return Err(e);
        }
        self.transition(
            &mut fsm,
            &SessionMachineInput::LoginSucceeded,
            SessionSnapshot::authenticated(identity.clone()),
        )?;
        drop(fsm);

        info!(
            user_id = identity.user_id,
            role = ?identity.role,
            hospital_id = ?identity.hospital_id,
            "Login successful"
        );
        self.navigate(View::Home);
        Ok(identity)
    }

    fn parse_login(response: ApiResponse) -> AuthResult<(TokenPair, Identity)> {
        let login: LoginResponse = match response.into_value() {
            Value::Null => {
                return Err(AuthError::LoginRejected(FALLBACK_MESSAGE.to_string()));
            }
            value => serde_json::from_value(value)
                .map_err(|_| AuthError::LoginRejected(FALLBACK_MESSAGE.to_string()))?,
        };

        let identity = claims::resolve_identity(login.user.as_ref(), &login.access).map_err(|e| {
            warn!(error = %e, "Login response carried no usable identity");
            AuthError::LoginRejected(FALLBACK_MESSAGE.to_string())
        })?;

        Ok((TokenPair::new(login.access, login.refresh), identity))
    }

    fn rejection_message(data: Value) -> String {
        ApiError::Status {
            status: 0,
            data: Some(data),
        }
        .message()
    }

    /// Store the new session.
    ///
    /// The identity cache never describes a different token pair than the
    /// stored one. The previous cache entry is dropped before the pair is
    /// replaced, so a failed cache write leaves restore to decode the new
    /// token. If the pair itself cannot be written, the previous session
    /// stays as it was.
    fn persist(&self, pair: &TokenPair, identity: &Identity) -> AuthResult<()> {
        self.tokens.clear_identity()?;

        if let Err(e) = self.tokens.save(pair) {
            if let Some(previous) = self.identity() {
                if let Err(e) = self.tokens.save_identity(&previous) {
                    warn!(error = %e, "Failed to re-cache previous identity");
                }
            }
            return Err(e.into());
        }

        if let Err(e) = self.tokens.save_identity(identity) {
            warn!(error = %e, "Failed to cache identity, restore will decode the token");
        }
        Ok(())
    }

    /// Sign out locally. Always succeeds.
    pub fn logout(&self) {
        self.end_session(SessionMachineInput::LogoutRequested, "Logged out");
    }

    /// Revoke the refresh token on the backend, then sign out locally.
    ///
    /// Revocation is best effort: any failure is logged and ignored.
    pub async fn logout_and_revoke(&self) {
        if let Some(pair) = self.tokens.load() {
            let request = ApiRequest::post(json!({ "refresh_token": pair.refresh }));
            if let Err(e) = self.client.call(LOGOUT_ENDPOINT, request).await {
                warn!(error = %e, "Refresh token revocation failed");
            }
        }
        self.logout();
    }

    fn end_session(&self, input: SessionMachineInput, message: &str) {
        let mut fsm = self.fsm.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Err(e) = self.tokens.clear() {
            warn!(error = %e, "Failed to clear stored session");
        }

        if *fsm.state() == SessionMachineState::Initializing {
            // Nothing was restored yet; settle straight into Anonymous.
            if let Err(e) = self.transition(
                &mut fsm,
                &SessionMachineInput::NoStoredSession,
                SessionSnapshot::anonymous(),
            ) {
                warn!(error = %e, "Failed to settle session");
            }
        } else if let Err(e) = self.transition(&mut fsm, &input, SessionSnapshot::anonymous()) {
            warn!(error = %e, "Unexpected session transition failure");
        }
        drop(fsm);

        info!("{}", message);
        self.navigate(View::Login);
    }

    // ==========================================
    // Registration / profile
    // ==========================================

    /// Register a new staff account. Does not sign in.
    pub async fn register(&self, form: &RegistrationForm) -> AuthResult<Value> {
        if !form.passwords_match() {
            return Err(AuthError::PasswordMismatch);
        }

        info!(
            username = %form.username,
            hospital_id = %form.hospital_id,
            role = %form.role,
            "Registration attempt"
        );

        let body = serde_json::to_value(form)?;
        match self
            .client
            .call(REGISTER_ENDPOINT, ApiRequest::post(body).anonymous())
            .await
        {
            Ok(response) if response.status == 201 => {
                info!(username = %form.username, "Registration successful");
                Ok(response.into_value())
            }
            Ok(response) => Err(AuthError::RegistrationRejected(Self::rejection_message(
                response.into_value(),
            ))),
            Err(e @ ApiError::Status { .. }) => {
                warn!(status = ?e.status(), "Registration rejected");
                Err(AuthError::RegistrationRejected(e.message()))
            }
            Err(e) => Err(AuthError::Api(e)),
        }
    }

    /// Fetch the signed-in user's profile.
    pub async fn profile(&self) -> AuthResult<Value> {
        if !self.snapshot().state.is_authenticated() {
            return Err(AuthError::NotLoggedIn);
        }
        let response = self.authorized_call(PROFILE_ENDPOINT, ApiRequest::get()).await?;
        Ok(response.into_value())
    }

    // ==========================================
    // Authorized calls
    // ==========================================

    /// Issue a call on behalf of the session.
    ///
    /// A 401 means the backend no longer accepts the session: it is cleared
    /// and the user is sent to the login view before the error is returned.
    pub async fn authorized_call(&self, endpoint: &str, request: ApiRequest) -> AuthResult<ApiResponse> {
        let generation = self.generation.load(Ordering::SeqCst);
        match self.client.call(endpoint, request).await {
            Ok(response) => Ok(response),
            Err(e) if e.is_unauthorized() => {
                if self.generation.load(Ordering::SeqCst) == generation {
                    warn!(endpoint, "Backend rejected the session, re-authentication required");
                    self.end_session(SessionMachineInput::SessionRejected, "Session rejected");
                } else {
                    debug!(endpoint, "Ignoring 401 from a request issued under an older session");
                }
                Err(AuthError::Api(e))
            }
            Err(e) => Err(AuthError::Api(e)),
        }
    }
}
