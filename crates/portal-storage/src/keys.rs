//! Storage key constants.

/// Keys used in client storage.
///
/// The names match the browser portal's local storage layout so a profile
/// written by either client can be read by the other.
pub struct StorageKeys;

impl StorageKeys {
    /// Token pair (JSON `{access, refresh}`)
    pub const AUTH_TOKENS: &'static str = "authTokens";

    /// Cached identity (JSON)
    pub const USER_INFO: &'static str = "userInfo";

    /// Raw access token written by older clients
    pub const LEGACY_ACCESS_TOKEN: &'static str = "access_token";
}
