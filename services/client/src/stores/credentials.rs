//! services/client/src/stores/credentials.rs
//!
//! The credential store: owns the session (token, API key, user profile), keeps the
//! token and API key in durable storage, and talks to the remote authentication API.

use family_tree_core::domain::User;
use family_tree_core::ports::{AuthApi, CredentialStorage, PortError, API_KEY_KEY, TOKEN_KEY};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Errors surfaced by credential operations. Their messages are shown as-is on the
/// login page.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Login failed")]
    Authentication,
    #[error("Registration failed")]
    Registration,
    #[error("Not logged in")]
    NotAuthenticated,
    #[error("Request failed: {0}")]
    Transport(PortError),
    #[error("Could not persist credentials: {0}")]
    Storage(PortError),
}

/// A snapshot of the current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub api_key: Option<String>,
}

impl SessionState {
    /// A session is authenticated exactly when it holds a token.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

pub struct CredentialStore {
    auth: Arc<dyn AuthApi>,
    storage: Arc<dyn CredentialStorage>,
    state: watch::Sender<SessionState>,
}

impl CredentialStore {
    /// Creates the store, restoring the token and API key left in durable storage.
    ///
    /// A restored token is trusted as-is; it is not revalidated against the server.
    pub fn new(auth: Arc<dyn AuthApi>, storage: Arc<dyn CredentialStorage>) -> Self {
        let initial = SessionState {
            user: None,
            token: restore(storage.as_ref(), TOKEN_KEY),
            api_key: restore(storage.as_ref(), API_KEY_KEY),
        };
        info!(
            "Credential store ready (authenticated: {})",
            initial.is_authenticated()
        );
        Self {
            auth,
            storage,
            state: watch::Sender::new(initial),
        }
    }

    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Returns a receiver that observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    /// Logs in and persists the returned bearer token.
    ///
    /// On failure the session and durable storage are left untouched.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), CredentialError> {
        let grant = self.auth.login(username, password).await.map_err(|e| {
            error!("Login error for '{}': {}", username, e);
            if e.is_rejection() {
                CredentialError::Authentication
            } else {
                CredentialError::Transport(e)
            }
        })?;

        self.storage
            .set(TOKEN_KEY, &grant.access_token)
            .map_err(CredentialError::Storage)?;
        self.state.send_modify(|state| {
            state.token = Some(grant.access_token);
        });
        info!("Logged in as '{}'", username);
        Ok(())
    }

    /// Registers an account, persisting the issued API key and keeping the profile.
    ///
    /// Registration does not log in: no token is set and the session stays
    /// unauthenticated until `login` succeeds.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, CredentialError> {
        let registration = self
            .auth
            .register(username, email, password)
            .await
            .map_err(|e| {
                error!("Registration error for '{}': {}", username, e);
                if e.is_rejection() {
                    CredentialError::Registration
                } else {
                    CredentialError::Transport(e)
                }
            })?;

        self.storage
            .set(API_KEY_KEY, &registration.api_key)
            .map_err(CredentialError::Storage)?;
        let user = registration.user.clone();
        self.state.send_modify(|state| {
            state.api_key = Some(registration.api_key);
            state.user = Some(registration.user);
        });
        info!("Registered '{}'", username);
        Ok(user)
    }

    /// Clears the session and removes both durable entries. Never fails.
    pub fn logout(&self) {
        for key in [TOKEN_KEY, API_KEY_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to remove '{}' from credential storage: {}", key, e);
            }
        }
        self.state.send_replace(SessionState::default());
        info!("Logged out");
    }

    /// Injects a token obtained out-of-band, persisting it.
    pub fn set_token(&self, token: &str) -> Result<(), CredentialError> {
        self.storage
            .set(TOKEN_KEY, token)
            .map_err(CredentialError::Storage)?;
        self.state.send_modify(|state| state.token = Some(token.to_string()));
        Ok(())
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<(), CredentialError> {
        self.storage
            .set(API_KEY_KEY, api_key)
            .map_err(CredentialError::Storage)?;
        self.state.send_modify(|state| state.api_key = Some(api_key.to_string()));
        Ok(())
    }

    /// Fetches the profile behind the current token and keeps it as the session user.
    pub async fn refresh_profile(&self) -> Result<User, CredentialError> {
        let token = self.token().ok_or(CredentialError::NotAuthenticated)?;
        let user = self.auth.current_user(&token).await.map_err(|e| {
            warn!("Profile lookup failed: {}", e);
            if e.is_rejection() {
                CredentialError::Authentication
            } else {
                CredentialError::Transport(e)
            }
        })?;
        self.state.send_modify(|state| state.user = Some(user.clone()));
        Ok(user)
    }

    /// Asks the server for a fresh API key, then persists and keeps it.
    pub async fn regenerate_api_key(&self) -> Result<String, CredentialError> {
        let token = self.token().ok_or(CredentialError::NotAuthenticated)?;
        let registration = self.auth.regenerate_api_key(&token).await.map_err(|e| {
            warn!("API key rotation failed: {}", e);
            if e.is_rejection() {
                CredentialError::Authentication
            } else {
                CredentialError::Transport(e)
            }
        })?;

        self.storage
            .set(API_KEY_KEY, &registration.api_key)
            .map_err(CredentialError::Storage)?;
        let api_key = registration.api_key.clone();
        self.state.send_modify(|state| {
            state.api_key = Some(registration.api_key);
            state.user = Some(registration.user);
        });
        info!("API key rotated");
        Ok(api_key)
    }
}

fn restore(storage: &dyn CredentialStorage, key: &str) -> Option<String> {
    match storage.get(key) {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not restore '{}' from credential storage: {}", key, e);
            None
        }
    }
}
