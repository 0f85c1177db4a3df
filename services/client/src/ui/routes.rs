//! services/client/src/ui/routes.rs
//!
//! The route table and the guard that keeps signed-out users on the login page.

use crate::stores::{CredentialStore, SessionState};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Home,
    Individuals,
}

impl Route {
    /// Maps a path to a route; unknown paths land on the home page.
    pub fn from_path(path: &str) -> Self {
        match path.trim_end_matches('/') {
            "/login" => Route::Login,
            "/individuals" => Route::Individuals,
            _ => Route::Home,
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Home => "/",
            Route::Individuals => "/individuals",
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Returns the route that is actually shown when `requested` is asked for.
pub fn resolve(requested: Route, session: &SessionState) -> Route {
    if requested.is_protected() && !session.is_authenticated() {
        debug!("Redirecting {} to {}", requested, Route::Login);
        Route::Login
    } else {
        requested
    }
}

/// Tracks the current route the way a browser history would.
pub struct Navigator {
    current: Route,
}

impl Navigator {
    pub fn new(initial: Route, session: &SessionState) -> Self {
        Self {
            current: resolve(initial, session),
        }
    }

    pub fn current(&self) -> Route {
        self.current
    }

    pub fn navigate(&mut self, to: Route, session: &SessionState) -> Route {
        self.current = resolve(to, session);
        self.current
    }

    /// The navbar's logout button: ends the session and returns to the login page.
    pub fn logout(&mut self, credentials: &CredentialStore) -> Route {
        credentials.logout();
        self.current = Route::Login;
        self.current
    }
}
