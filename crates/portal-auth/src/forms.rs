//! Request bodies submitted by the user.

use portal_storage::Role;
use serde::Serialize;
use std::fmt;

/// Login form. Never persisted or logged.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    /// Hospital identifier as typed by the user.
    pub hospital_id: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        hospital_id: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            hospital_id: hospital_id.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("hospital_id", &self.hospital_id)
            .finish()
    }
}

/// Staff registration form.
#[derive(Clone, Serialize)]
pub struct RegistrationForm {
    pub username: String,
    pub password: String,
    pub password2: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub hospital_id: String,
    pub role: Role,
}

impl RegistrationForm {
    pub fn passwords_match(&self) -> bool {
        self.password == self.password2
    }
}

impl fmt::Debug for RegistrationForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistrationForm")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("hospital_id", &self.hospital_id)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_wire_shape() {
        let creds = Credentials::new("admin1", "pw", "1");
        let json = serde_json::to_value(&creds).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"username": "admin1", "password": "pw", "hospital_id": "1"})
        );
        assert!(format!("{:?}", creds).contains("<redacted>"));
    }

    #[test]
    fn test_registration_debug_hides_passwords() {
        let form = RegistrationForm {
            username: "nurse1".to_string(),
            password: "s3cret".to_string(),
            password2: "s3cret".to_string(),
            email: "n@example.org".to_string(),
            first_name: "N".to_string(),
            last_name: "One".to_string(),
            phone: "555".to_string(),
            hospital_id: "2".to_string(),
            role: Role::Nurse,
        };
        assert!(form.passwords_match());
        assert!(!format!("{:?}", form).contains("s3cret"));

        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["role"], "nurse");
        assert_eq!(json["password2"], "s3cret");
    }
}
