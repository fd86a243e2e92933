//! Login credentials.

use std::fmt;

use crate::error::{AppError, Result};

pub const EMAIL_VAR: &str = "APP_EMAIL";
pub const PASSWORD_VAR: &str = "APP_PASSWORD";

/// Account used to sign in to the target site.
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Read `APP_EMAIL` and `APP_PASSWORD` from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`; both values must be non-empty.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| AppError::config(format!("{key} must be set")))
        };

        Ok(Self {
            email: read(EMAIL_VAR)?,
            password: read(PASSWORD_VAR)?,
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup() {
        let creds = Credentials::from_lookup(|key| match key {
            EMAIL_VAR => Some("user@example.com".to_string()),
            PASSWORD_VAR => Some("hunter2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(creds.email, "user@example.com");
        assert!(!format!("{creds:?}").contains("hunter2"));
    }

    #[test]
    fn test_missing_password_is_config_error() {
        let err = Credentials::from_lookup(|key| match key {
            EMAIL_VAR => Some("user@example.com".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_blank_email_rejected() {
        assert!(Credentials::from_lookup(|_| Some("  ".to_string())).is_err());
    }
}
