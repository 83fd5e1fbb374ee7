//! Multi-currency client ledger.
//!
//! This module implements the ledger functionality:
//! - Signed ledger entries (credit positive, debit negative)
//! - Balance folds and running-balance statements
//! - Paired FX posting and reversals
//! - Error types for ledger operations

pub mod balance;
pub mod entry;
pub mod error;
pub mod service;

pub use balance::{ClientBalance, RunningBalance, StatementLine};
pub use entry::{EntryType, LedgerEntry};
pub use error::LedgerError;
pub use service::{ExchangePair, LedgerService, PostEntryInput, PostExchangeInput};
