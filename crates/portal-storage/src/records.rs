//! Session records persisted by the token store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Access/refresh token pair issued by the login endpoint.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

impl TokenPair {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access", &format_args!("<{} bytes>", self.access.len()))
            .field("refresh", &format_args!("<{} bytes>", self.refresh.len()))
            .finish()
    }
}

/// Staff role within a hospital.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Nurse,
    Receptionist,
    Staff,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Admin,
        Role::Doctor,
        Role::Nurse,
        Role::Receptionist,
        Role::Staff,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Nurse => "nurse",
            Role::Receptionist => "receptionist",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a role string is not one of the known roles.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == normalized)
            .ok_or_else(|| UnknownRole(s.to_string()))
    }
}

/// Normalized identity of the signed-in user.
///
/// Deserialization accepts the field spellings used by the login response
/// (`id`), token claims (`user_id`, `exp`) and older cached records
/// (`userId`, `hospitalId`), so a cache written by any client loads here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(alias = "id", alias = "userId", deserialize_with = "de_user_id")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "de_role")]
    pub role: Option<Role>,
    #[serde(default, alias = "hospitalId", deserialize_with = "de_opt_i64")]
    pub hospital_id: Option<i64>,
    #[serde(
        default,
        alias = "exp",
        alias = "expiresAt",
        with = "chrono::serde::ts_seconds_option"
    )]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Identity {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            role: None,
            hospital_id: None,
            expires_at: None,
            username: None,
        }
    }

    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    pub fn with_hospital(mut self, hospital_id: i64) -> Self {
        self.hospital_id = Some(hospital_id);
        self
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == Some(role)
    }

    /// Whether the identity's token expiry has passed at `now`.
    /// Identities without a known expiry never report expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }
}

/// Parse an integer that may arrive as a JSON number or numeric string.
pub(crate) fn lenient_i64(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn de_user_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    lenient_i64(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid user id: {}", value)))
}

fn de_opt_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(lenient_i64))
}

fn de_role<'de, D>(deserializer: D) -> Result<Option<Role>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.and_then(|s| match s.parse() {
        Ok(role) => Some(role),
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unrecognized role");
            None
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_role_round_trip_strings() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert_eq!(" Admin ".parse::<Role>().unwrap(), Role::Admin);
        assert!("superuser".parse::<Role>().is_err());
    }

    #[test]
    fn test_identity_accepts_server_user_shape() {
        let json = r#"{"id": 7, "username": "nurse.joy", "hospital_id": 3, "role": "nurse"}"#;
        let identity: Identity = serde_json::from_str(json).unwrap();

        assert_eq!(identity.user_id, 7);
        assert_eq!(identity.role, Some(Role::Nurse));
        assert_eq!(identity.hospital_id, Some(3));
        assert_eq!(identity.username.as_deref(), Some("nurse.joy"));
        assert!(identity.expires_at.is_none());
    }

    #[test]
    fn test_identity_accepts_claims_shape() {
        let json = r#"{"user_id": 12, "exp": 1700000000, "role": "doctor", "hospital_id": null}"#;
        let identity: Identity = serde_json::from_str(json).unwrap();

        assert_eq!(identity.user_id, 12);
        assert_eq!(identity.role, Some(Role::Doctor));
        assert_eq!(identity.hospital_id, None);
        assert_eq!(
            identity.expires_at,
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
    }

    #[test]
    fn test_identity_accepts_camel_case_and_string_ids() {
        let json = r#"{"userId": "1", "role": "admin", "hospitalId": "4"}"#;
        let identity: Identity = serde_json::from_str(json).unwrap();

        assert_eq!(identity.user_id, 1);
        assert_eq!(identity.hospital_id, Some(4));
        assert!(identity.has_role(Role::Admin));
    }

    #[test]
    fn test_unknown_role_is_dropped_not_promoted() {
        let json = r#"{"id": 5, "role": "superuser"}"#;
        let identity: Identity = serde_json::from_str(json).unwrap();
        assert_eq!(identity.role, None);
    }

    #[test]
    fn test_identity_requires_user_id() {
        assert!(serde_json::from_str::<Identity>(r#"{"role": "admin"}"#).is_err());
        assert!(serde_json::from_str::<Identity>(r#"{"id": "abc"}"#).is_err());
    }

    #[test]
    fn test_expiry_checks() {
        let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let identity = Identity::new(1).with_expiry(now);

        assert!(identity.is_expired_at(now));
        assert!(!identity.is_expired_at(now - chrono::Duration::seconds(1)));
        assert!(!Identity::new(1).is_expired_at(now));
    }

    #[test]
    fn test_token_pair_debug_hides_tokens() {
        let pair = TokenPair::new("secret-access", "secret-refresh");
        let debug = format!("{:?}", pair);
        assert!(!debug.contains("secret"));
    }
}
