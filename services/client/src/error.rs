//! services/client/src/error.rs
//!
//! Defines the primary error type for the client service.

use crate::config::ConfigError;
use crate::stores::credentials::CredentialError;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A login, registration or session operation failed.
    #[error("{0}")]
    Credential(#[from] CredentialError),

    /// Represents an error from the underlying HTTP client library.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// An operation the user asked for did not go through. The message is shown as-is.
    #[error("{0}")]
    Failed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_facing_failures_print_their_own_message() {
        assert_eq!(ClientError::Failed("Login failed".to_string()).to_string(), "Login failed");
        assert_eq!(
            ClientError::from(CredentialError::NotAuthenticated).to_string(),
            "Not logged in"
        );
    }
}
