pub mod credentials;
pub mod records;

pub use credentials::{CredentialError, CredentialStore, SessionState};
pub use records::{RecordState, RecordStore, SyncOutcome};
