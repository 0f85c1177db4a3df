pub mod http;
pub mod storage;

pub use http::HttpApiAdapter;
pub use storage::{FileCredentialStorage, MemoryCredentialStorage};
