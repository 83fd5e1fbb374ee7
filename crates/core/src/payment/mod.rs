//! Partial-payment tracking against a transaction's total.
//!
//! Totals are always rebuilt from the active payments, so a cancellation
//! restores the exact pre-payment state.

pub mod error;
pub mod service;
pub mod types;

#[cfg(test)]
mod payment_props;

pub use error::PaymentError;
pub use service::{PaymentReceipt, PaymentService};
pub use types::{
    NewPayment, NewTransaction, Payment, PaymentState, PaymentStatus, PaymentTolerance,
    PaymentTransaction,
};
