//! Identity extraction from access tokens and server user objects.
//!
//! Tokens are decoded without signature verification. The client cannot
//! verify them, and the backend re-checks every token it receives, so the
//! decoded claims are only used to decide what to show.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use portal_storage::{Identity, Role};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Failure to read identity claims out of a token.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Malformed token: {0}")]
    Malformed(String),
}

fn malformed(reason: impl Into<String>) -> DecodeError {
    DecodeError::Malformed(reason.into())
}

/// Claims carried in the access token payload.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    user_id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default)]
    exp: Option<i64>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    hospital_id: Option<Value>,
    #[serde(default)]
    username: Option<String>,
}

/// User object returned alongside tokens by the login endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerUser {
    #[serde(default, alias = "user_id", alias = "userId")]
    id: Option<Value>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default, alias = "hospitalId")]
    hospital_id: Option<Value>,
    #[serde(default, alias = "expiresAt")]
    expires_at: Option<Value>,
    #[serde(default)]
    username: Option<String>,
}

/// Where an identity came from. Both shapes normalize into [`Identity`].
#[derive(Debug, Clone)]
pub enum IdentitySource {
    Claims(TokenClaims),
    Server(ServerUser),
}

impl IdentitySource {
    /// Normalize into an identity. Returns `None` when no user id is present.
    pub fn into_identity(self) -> Option<Identity> {
        match self {
            IdentitySource::Claims(claims) => {
                let user_id = claims
                    .user_id
                    .as_ref()
                    .and_then(int_value)
                    .or_else(|| claims.sub.as_ref().and_then(int_value))?;
                Some(Identity {
                    user_id,
                    role: parse_role(claims.role.as_deref()),
                    hospital_id: claims.hospital_id.as_ref().and_then(int_value),
                    expires_at: claims.exp.and_then(timestamp),
                    username: claims.username,
                })
            }
            IdentitySource::Server(user) => {
                let user_id = user.id.as_ref().and_then(int_value)?;
                Some(Identity {
                    user_id,
                    role: parse_role(user.role.as_deref()),
                    hospital_id: user.hospital_id.as_ref().and_then(int_value),
                    expires_at: user.expires_at.as_ref().and_then(expiry_value),
                    username: user.username,
                })
            }
        }
    }
}

fn int_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn timestamp(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

/// Expiry as epoch seconds or an RFC 3339 string.
fn expiry_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_i64().and_then(timestamp),
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn parse_role(raw: Option<&str>) -> Option<Role> {
    let raw = raw?;
    match raw.parse() {
        Ok(role) => Some(role),
        Err(e) => {
            debug!(error = %e, "Token carries an unrecognized role");
            None
        }
    }
}

/// Read the claims segment of a JWT.
pub fn decode_claims(token: &str) -> Result<TokenClaims, DecodeError> {
    let segments: Vec<&str> = token.trim().split('.').collect();
    if segments.len() != 3 {
        return Err(malformed(format!(
            "expected 3 segments, found {}",
            segments.len()
        )));
    }

    let payload = segments[1].trim_end_matches('=');
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| malformed(format!("payload is not base64url: {}", e)))?;

    serde_json::from_slice(&bytes).map_err(|e| malformed(format!("payload is not JSON: {}", e)))
}

/// Decode the identity carried by an access token.
pub fn decode(token: &str) -> Result<Identity, DecodeError> {
    let claims = decode_claims(token)?;
    IdentitySource::Claims(claims)
        .into_identity()
        .ok_or_else(|| malformed("no subject claim"))
}

/// Decide the session identity after login.
///
/// A server user object carrying a user id wins; a missing expiry on it is
/// filled from the token. Otherwise the token claims are used.
pub fn resolve_identity(server_user: Option<&Value>, access_token: &str) -> Result<Identity, DecodeError> {
    let from_server = server_user
        .filter(|v| v.is_object())
        .and_then(|v| serde_json::from_value::<ServerUser>(v.clone()).ok())
        .and_then(|user| IdentitySource::Server(user).into_identity());

    match from_server {
        Some(mut identity) => {
            if identity.expires_at.is_none() {
                identity.expires_at = decode(access_token).ok().and_then(|c| c.expires_at);
            }
            Ok(identity)
        }
        None => decode(access_token),
    }
}
