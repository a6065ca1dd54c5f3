//! Pure security primitives: password hashing and session tokens.

pub mod hash;
pub mod token;

pub use hash::{CredentialHasher, HashParams};
pub use token::{Principal, TokenPair, TokenService};
