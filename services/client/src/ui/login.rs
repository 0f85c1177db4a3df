//! services/client/src/ui/login.rs
//!
//! Headless model of the login page: one form that either logs in or registers.

use crate::stores::CredentialStore;
use crate::ui::routes::Route;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginMode {
    #[default]
    Login,
    Register,
}

#[derive(Debug, Default)]
pub struct LoginPage {
    pub mode: LoginMode,
    pub username: String,
    pub email: String,
    pub password: String,
    error: Option<String>,
    notice: Option<String>,
}

impl LoginPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            LoginMode::Login => LoginMode::Register,
            LoginMode::Register => LoginMode::Login,
        };
        self.error = None;
        self.notice = None;
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    fn missing_field(&self) -> Option<&'static str> {
        if self.username.trim().is_empty() {
            return Some("Username is required");
        }
        if self.mode == LoginMode::Register && self.email.trim().is_empty() {
            return Some("Email is required");
        }
        if self.password.is_empty() {
            return Some("Password is required");
        }
        None
    }

    /// Submits the form. Returns where to navigate next, if anywhere.
    ///
    /// A successful registration does not sign the user in; the page switches back to
    /// login mode so the new account can log in.
    pub async fn submit(&mut self, credentials: &CredentialStore) -> Option<Route> {
        self.error = None;
        self.notice = None;
        if let Some(message) = self.missing_field() {
            self.error = Some(message.to_string());
            return None;
        }

        let username = self.username.trim().to_string();
        match self.mode {
            LoginMode::Login => {
                let result = credentials.login(&username, &self.password).await;
                match result {
                    Ok(()) => {
                        self.password.clear();
                        Some(Route::Home)
                    }
                    Err(e) => {
                        self.error = Some(e.to_string());
                        None
                    }
                }
            }
            LoginMode::Register => {
                let email = self.email.trim().to_string();
                let result = credentials.register(&username, &email, &self.password).await;
                match result {
                    Ok(user) => {
                        info!("Account '{}' created, awaiting login", user.username);
                        self.mode = LoginMode::Login;
                        self.password.clear();
                        self.notice = Some("Account created. Please log in.".to_string());
                        None
                    }
                    Err(e) => {
                        self.error = Some(e.to_string());
                        None
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::storage::MemoryCredentialStorage;
    use async_trait::async_trait;
    use chrono::Utc;
    use family_tree_core::domain::{Registration, TokenGrant, User};
    use family_tree_core::ports::{AuthApi, PortError, PortResult};
    use std::sync::Arc;
    use uuid::Uuid;

    struct FakeAuth;

    #[async_trait]
    impl AuthApi for FakeAuth {
        async fn login(&self, username: &str, password: &str) -> PortResult<TokenGrant> {
            if username == "alice" && password == "secret" {
                Ok(TokenGrant {
                    access_token: "tok".to_string(),
                    token_type: "bearer".to_string(),
                    expires_in: None,
                })
            } else {
                Err(PortError::Unauthorized)
            }
        }

        async fn register(
            &self,
            username: &str,
            email: &str,
            _password: &str,
        ) -> PortResult<Registration> {
            Ok(Registration {
                user: User {
                    id: Uuid::new_v4(),
                    username: username.to_string(),
                    email: email.to_string(),
                    is_active: true,
                    created_at: Utc::now(),
                },
                api_key: "key".to_string(),
            })
        }

        async fn current_user(&self, _token: &str) -> PortResult<User> {
            Err(PortError::Unauthorized)
        }

        async fn regenerate_api_key(&self, _token: &str) -> PortResult<Registration> {
            Err(PortError::Unauthorized)
        }
    }

    fn credentials() -> CredentialStore {
        CredentialStore::new(Arc::new(FakeAuth), Arc::new(MemoryCredentialStorage::new()))
    }

    #[tokio::test]
    async fn test_required_fields_are_checked_before_any_request() {
        let store = credentials();
        let mut page = LoginPage::new();
        page.username = "alice".to_string();

        assert_eq!(page.submit(&store).await, None);
        assert_eq!(page.error(), Some("Password is required"));

        page.toggle_mode();
        page.password = "pw".to_string();
        assert_eq!(page.submit(&store).await, None);
        assert_eq!(page.error(), Some("Email is required"));
    }

    #[tokio::test]
    async fn test_login_success_goes_home() {
        let store = credentials();
        let mut page = LoginPage::new();
        page.username = "alice".to_string();
        page.password = "secret".to_string();

        assert_eq!(page.submit(&store).await, Some(Route::Home));
        assert!(store.is_authenticated());
        assert!(page.password.is_empty());
    }

    #[tokio::test]
    async fn test_login_failure_shows_message() {
        let store = credentials();
        let mut page = LoginPage::new();
        page.username = "alice".to_string();
        page.password = "wrong".to_string();

        assert_eq!(page.submit(&store).await, None);
        assert_eq!(page.error(), Some("Login failed"));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn test_registration_returns_to_login_mode() {
        let store = credentials();
        let mut page = LoginPage::new();
        page.toggle_mode();
        page.username = "bob".to_string();
        page.email = "bob@example.test".to_string();
        page.password = "pw".to_string();

        assert_eq!(page.submit(&store).await, None);
        assert_eq!(page.mode, LoginMode::Login);
        assert!(page.notice().is_some());
        assert!(!store.is_authenticated());
    }
}
