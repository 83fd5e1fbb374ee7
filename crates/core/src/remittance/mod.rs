//! Outgoing and incoming remittance records.

pub mod error;
pub mod service;
pub mod types;

pub use error::RemittanceError;
pub use service::RemittanceService;
pub use types::{IncomingRemittance, IncomingStatus, NewRemittance, OutgoingRemittance, OutgoingStatus};
