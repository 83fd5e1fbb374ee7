//! Settlement matcher: turns incoming credit into outgoing debt repayment.
//!
//! - Strategy ordering and proposals (`matcher`)
//! - Realized FX profit (`profit`)
//! - Atomic execution, retries, idempotency and auto-settlement (`service`)

pub mod error;
pub mod matcher;
pub mod profit;
pub mod service;
pub mod types;

#[cfg(test)]
mod matcher_props;

pub use error::SettlementError;
pub use profit::realized_profit;
pub use service::{SettlementService, AUTO_SETTLE_ROUTE, SETTLE_ROUTE};
pub use types::{AutoSettleOutcome, RemittanceSettlement, SettlementProposal, SettlementRequest, Strategy};
