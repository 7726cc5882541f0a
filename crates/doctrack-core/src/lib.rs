//! DocTrack Core — shared domain models, the error taxonomy, repository
//! traits and the authorization policy.

pub mod error;
pub mod models;
pub mod policy;
pub mod repository;
pub mod validation;
