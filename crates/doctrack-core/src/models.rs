//! Domain models for DocTrack.
//!
//! These are the core types shared across all crates.

pub mod department;
pub mod document_image;
pub mod outgoing_record;
pub mod receiving_record;
pub mod remark;
pub mod session;
pub mod sms_transaction;
pub mod user;
