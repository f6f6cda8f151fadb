use std::fmt;

use crate::api::AuthError;
use crate::utils::validate::{
    is_valid_email, is_valid_password, is_valid_username, MAX_PASSWORD_LENGTH,
    MAX_USERNAME_LENGTH,
};

/// Login form input.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Build credentials from raw form input. The username is trimmed;
    /// the password is kept verbatim.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into().trim().to_string(),
            password: password.into(),
        }
    }

    /// Check the input before any network call is made
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(AuthError::Validation(
                "Username and password required".to_string(),
            ));
        }
        check_username(&self.username)?;
        check_password(&self.password)
    }
}

// Passwords never reach logs through Debug
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Registration form input.
#[derive(Clone, PartialEq, Eq)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS))]
#[cfg_attr(feature = "ts", ts(export))]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl NewAccount {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: password.into(),
        }
    }

    /// Check the input before any network call is made
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() || self.email.trim().is_empty() || self.password.is_empty()
        {
            return Err(AuthError::Validation(
                "Username, email and password required".to_string(),
            ));
        }
        check_username(&self.username)?;
        if !is_valid_email(&self.email) {
            return Err(AuthError::Validation(
                "Please enter a valid email address".to_string(),
            ));
        }
        check_password(&self.password)
    }
}

impl fmt::Debug for NewAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewAccount")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn check_username(username: &str) -> Result<(), AuthError> {
    if is_valid_username(username) {
        Ok(())
    } else {
        Err(AuthError::Validation(format!(
            "Username must be at most {} characters with no control characters",
            MAX_USERNAME_LENGTH
        )))
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if is_valid_password(password) {
        Ok(())
    } else {
        Err(AuthError::Validation(format!(
            "Password must be at most {} characters with no control characters",
            MAX_PASSWORD_LENGTH
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validation_message(result: Result<(), AuthError>) -> String {
        match result {
            Err(AuthError::Validation(message)) => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_credentials_trims_username_only() {
        let creds = Credentials::new("  alice ", " secret ");
        assert_eq!(creds.username, "alice");
        assert_eq!(creds.password, " secret ");
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn test_credentials_require_both_fields() {
        assert_eq!(
            validation_message(Credentials::new("", "secret").validate()),
            "Username and password required"
        );
        assert_eq!(
            validation_message(Credentials::new("alice", "").validate()),
            "Username and password required"
        );
        assert_eq!(
            validation_message(Credentials::new("   ", "secret").validate()),
            "Username and password required"
        );
    }

    #[test]
    fn test_credentials_field_limits() {
        let long_name = Credentials::new("a".repeat(51), "secret");
        assert!(validation_message(long_name.validate()).starts_with("Username must be"));

        let bad_password = Credentials::new("alice", "sec\x07ret");
        assert!(validation_message(bad_password.validate()).starts_with("Password must be"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", Credentials::new("alice", "secret"));
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn test_new_account_validation() {
        assert!(NewAccount::new("bob", "bob@x.com", "p").validate().is_ok());
        assert_eq!(
            validation_message(NewAccount::new("bob", "", "p").validate()),
            "Username, email and password required"
        );
        assert_eq!(
            validation_message(NewAccount::new("bob", "bob-at-x.com", "p").validate()),
            "Please enter a valid email address"
        );
    }

    #[test]
    fn test_new_account_debug_hides_password() {
        let rendered = format!("{:?}", NewAccount::new("bob", "bob@x.com", "hunter2"));
        assert!(rendered.contains("bob@x.com"));
        assert!(!rendered.contains("hunter2"));
    }
}
