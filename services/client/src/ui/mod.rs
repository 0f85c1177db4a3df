pub mod individuals;
pub mod login;
pub mod routes;
pub mod state;

// Re-export the page models so the binary can drive them directly.
pub use individuals::{FormMode, IndividualsPage, MemberForm};
pub use login::{LoginMode, LoginPage};
pub use routes::{resolve, Navigator, Route};
pub use state::AppState;
