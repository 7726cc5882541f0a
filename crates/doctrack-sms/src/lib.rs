//! DocTrack SMS — per-user credit ledger and the TxtBox gateway client.

pub mod config;
pub mod cost;
pub mod error;
pub mod gateway;
pub mod service;

pub use config::SmsConfig;
pub use error::GatewayError;
pub use gateway::{GatewayResponse, SmsGateway, TxtBoxGateway};
pub use service::{LogQuery, SendSms, SmsService};
