//! DocTrack Auth — password login, session-backed EdDSA access tokens
//! and the administrative user directory.

pub mod config;
pub mod directory;
pub mod error;
pub mod password;
pub mod service;
pub mod token;

pub use config::AuthConfig;
pub use directory::{UserDirectory, UserInput, UserQuery};
pub use error::AuthError;
pub use service::{Authenticated, AuthService, LoginInput, LoginOutput};
pub use token::AccessTokenClaims;
