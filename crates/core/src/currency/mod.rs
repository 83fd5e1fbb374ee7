//! Currency conversion and the read-only rate lookup.

pub mod conversion;
pub mod rates;

pub use conversion::{convert_amount, divide_amount, round_bankers};
pub use rates::{RateError, RateProvider, require_rate};
