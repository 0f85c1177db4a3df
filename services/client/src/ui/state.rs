//! services/client/src/ui/state.rs
//!
//! Defines the application state shared by every view.

use crate::adapters::{FileCredentialStorage, HttpApiAdapter};
use crate::config::Config;
use crate::error::ClientError;
use crate::stores::{CredentialStore, RecordStore};
use family_tree_core::ports::{AuthApi, CredentialStorage, IndividualsApi};
use std::sync::Arc;
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Views)
//=========================================================================================

/// The shared application state, created once at startup and handed to every view.
///
/// The two stores never reference each other; views pass the session token from the
/// credential store into record store calls.
#[derive(Clone)]
pub struct AppState {
    pub credentials: Arc<CredentialStore>,
    pub records: Arc<RecordStore>,
}

impl AppState {
    /// Wires the HTTP adapter and the file-backed credential storage from configuration.
    pub fn from_config(config: Config) -> Result<Self, ClientError> {
        let http = Arc::new(HttpApiAdapter::new(&config)?);
        let storage = Arc::new(FileCredentialStorage::new(config.credentials_path.clone()));
        info!(
            "Using API at {} with credentials in {}",
            config.api_base_url,
            storage.path().display()
        );
        Ok(Self::with_ports(http.clone(), http, storage))
    }

    /// Builds the state around arbitrary port implementations.
    pub fn with_ports(
        auth: Arc<dyn AuthApi>,
        individuals: Arc<dyn IndividualsApi>,
        storage: Arc<dyn CredentialStorage>,
    ) -> Self {
        Self {
            credentials: Arc::new(CredentialStore::new(auth, storage)),
            records: Arc::new(RecordStore::new(individuals)),
        }
    }

    /// Tears the instance down, cancelling any record request still in flight.
    pub fn shutdown(&self) {
        self.records.shutdown();
    }
}
