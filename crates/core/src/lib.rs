//! Core business logic for Sarraf.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Storage, audit, rates and idempotency are reached through the traits in
//! `store`, `audit`, `currency` and `idempotency`.
//!
//! # Modules
//!
//! - `remittance` - Outgoing/incoming remittance records and their lifecycle
//! - `settlement` - Matching strategies, atomic settlement and auto-settle
//! - `ledger` - Append-only per-client multi-currency ledger
//! - `cash` - Branch cash balances and daily reconciliation
//! - `payment` - Partial payments and the payment status machine
//! - `reports` - Book summary

pub mod audit;
pub mod cash;
pub mod currency;
pub mod idempotency;
pub mod ledger;
pub mod payment;
pub mod remittance;
pub mod reports;
pub mod retry;
pub mod settlement;
pub mod store;
pub mod tenant;
