//! Session behavior tests against a scripted backend.
//!
//! - `login`: login, logout, revocation, registration and profile flows
//! - `overlap`: overlapping login attempts and logout races
//! - `persistence`: logins that cannot be fully written to storage
//! - `reauth`: 401 handling and stored-session restore
//! - `resources`: resource endpoints through the session


mod overlap;
mod reauth;
mod resources;
