pub mod domain;
pub mod ports;

pub use domain::{Individual, IndividualId, IndividualPatch, Registration, Sex, TokenGrant, User};
pub use ports::{
    AuthApi, CredentialStorage, IndividualsApi, PortError, PortResult, API_KEY_KEY, TOKEN_KEY,
};
