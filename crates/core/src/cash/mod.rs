//! Branch cash: the movement log, derived balances, and daily counts.
//!
//! `final_balance = auto_calculated + manual_adjustment`, where
//! `auto_calculated` folds CASH legs on top of the last reconciliation
//! checkpoint.

pub mod error;
pub mod service;
pub mod types;

pub use error::CashError;
pub use service::CashService;
pub use types::{
    CashAdjustment, CashBalance, CashCheckpoint, CashMovement, CashScope, CurrencyCount,
    DailyReconciliation, NewCashMovement, NewReconciliation, PaymentMethod, ReconciliationLine,
    VarianceStatus,
};
