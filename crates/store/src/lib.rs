//! Storage adapters for Sarraf.
//!
//! Implements every port of `sarraf-core` in memory:
//! - [`MemoryStore`] - tenant-sharded, optimistically versioned records
//! - [`MemoryIdempotencyStore`] - moka-backed idempotency records with TTL
//! - [`TracingAuditSink`] / [`MemoryAuditSink`] - audit event destinations
//! - [`StaticRateTable`] - fixed FX quotes

pub mod audit;
pub mod idempotency;
pub mod memory;
pub mod rates;

pub use audit::{MemoryAuditSink, TracingAuditSink};
pub use idempotency::MemoryIdempotencyStore;
pub use memory::MemoryStore;
pub use rates::StaticRateTable;
