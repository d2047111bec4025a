//! High-level API for the persisted session.

use crate::{ClientStorage, Identity, StorageError, StorageKeys, StorageResult, TokenPair};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

/// Owns the persisted token pair and the cached identity.
///
/// Reads never fail: a missing or malformed value is reported as absent so
/// callers can treat it as "not signed in".
pub struct TokenStore {
    storage: Box<dyn ClientStorage>,
}

impl TokenStore {
    /// Create a token store over the given storage backend
    pub fn new(storage: Box<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    // ==========================================
    // Token pair
    // ==========================================

    /// Persist the token pair, replacing any previous one.
    pub fn save(&self, pair: &TokenPair) -> StorageResult<()> {
        self.set_json(StorageKeys::AUTH_TOKENS, pair)?;
        debug!("Stored token pair");
        Ok(())
    }

    /// Load the token pair, if a well-formed one is stored.
    pub fn load(&self) -> Option<TokenPair> {
        self.get_json(StorageKeys::AUTH_TOKENS)
    }

    /// Access token to present as a bearer credential.
    ///
    /// Falls back to the raw token that older clients stored on their own.
    pub fn bearer_token(&self) -> Option<String> {
        if let Some(pair) = self.load() {
            return Some(pair.access);
        }

        match self.storage.get(StorageKeys::LEGACY_ACCESS_TOKEN) {
            Ok(Some(token)) if !token.trim().is_empty() => {
                debug!("Using legacy access token");
                Some(token)
            }
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read legacy access token");
                None
            }
        }
    }

    // ==========================================
    // Identity cache
    // ==========================================

    pub fn save_identity(&self, identity: &Identity) -> StorageResult<()> {
        self.set_json(StorageKeys::USER_INFO, identity)
    }

    pub fn load_identity(&self) -> Option<Identity> {
        self.get_json(StorageKeys::USER_INFO)
    }

    /// Drop the cached identity, leaving the token pair in place.
    pub fn clear_identity(&self) -> StorageResult<()> {
        self.storage.delete(StorageKeys::USER_INFO).map(|_| ())
    }

    // ==========================================
    // Lifecycle
    // ==========================================

    /// Remove every session key. Safe to call when nothing is stored.
    ///
    /// All keys are attempted even if one delete fails; the first error is
    /// returned.
    pub fn clear(&self) -> StorageResult<()> {
        let mut first_error = None;
        for key in [
            StorageKeys::AUTH_TOKENS,
            StorageKeys::USER_INFO,
            StorageKeys::LEGACY_ACCESS_TOKEN,
        ] {
            if let Err(e) = self.storage.delete(key) {
                warn!(key, error = %e, "Failed to delete session key");
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                debug!("Cleared stored session");
                Ok(())
            }
        }
    }

    /// Whether a token pair is stored.
    pub fn has_session(&self) -> bool {
        self.load().is_some()
    }

    fn set_json<T: Serialize>(&self, key: &str, value: &T) -> StorageResult<()> {
        let json = serde_json::to_string(value).map_err(|e| StorageError::Encoding(e.to_string()))?;
        self.storage.set(key, &json)
    }

    fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.storage.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "Failed to read stored value");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(key, error = %e, "Stored value is malformed, treating as absent");
                None
            }
        }
    }
}
