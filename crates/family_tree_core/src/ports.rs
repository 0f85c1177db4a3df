//! crates/family_tree_core/src/ports.rs
//!
//! Defines the service contracts (traits) the client's stores depend on.
//! These traits form the boundary of the hexagonal architecture, keeping the stores
//! independent of the HTTP client and of the durable storage medium.

use async_trait::async_trait;
use crate::domain::{Individual, IndividualId, IndividualPatch, Registration, TokenGrant, User};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (HTTP, filesystem).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Request rejected with status {status}")]
    Rejected { status: u16 },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

impl PortError {
    /// True when the server answered with a non-success status.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            PortError::NotFound(_) | PortError::Unauthorized | PortError::Rejected { .. }
        )
    }
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Remote API Ports
//=========================================================================================

#[async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchanges credentials for a bearer token.
    async fn login(&self, username: &str, password: &str) -> PortResult<TokenGrant>;

    async fn register(&self, username: &str, email: &str, password: &str)
        -> PortResult<Registration>;

    /// Returns the profile behind a bearer token.
    async fn current_user(&self, token: &str) -> PortResult<User>;

    async fn regenerate_api_key(&self, token: &str) -> PortResult<Registration>;
}

#[async_trait]
pub trait IndividualsApi: Send + Sync {
    async fn list_individuals(&self, token: &str) -> PortResult<Vec<Individual>>;

    async fn create_individual(&self, token: &str, patch: &IndividualPatch)
        -> PortResult<Individual>;

    async fn update_individual(
        &self,
        token: &str,
        id: &IndividualId,
        patch: &IndividualPatch,
    ) -> PortResult<Individual>;

    async fn delete_individual(&self, token: &str, id: &IndividualId) -> PortResult<()>;
}

//=========================================================================================
// Durable Storage Port
//=========================================================================================

/// Storage key of the bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key of the API key.
pub const API_KEY_KEY: &str = "apiKey";

/// A synchronous string key/value store that survives restarts.
///
/// Writes are last-write-wins; implementations need not coordinate between processes.
pub trait CredentialStorage: Send + Sync {
    fn get(&self, key: &str) -> PortResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> PortResult<()>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> PortResult<()>;
}
