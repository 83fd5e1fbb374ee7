//! Application-wide error types.
//!
//! Domain crates keep their own detailed error enums; every one of them maps onto
//! an [`ErrorKind`] and converts into [`AppError`] at the service boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::MoneyError;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Machine-readable error taxonomy shared by every domain module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// Unknown tenant, client, remittance, payment or transaction.
    NotFound,
    /// Operation attempted against a cancelled or terminal record.
    InvalidState,
    /// Zero, negative or overshooting amount.
    InvalidAmount,
    /// Settlement preconditions violated (e.g. cross-tenant pair).
    InvalidSettlement,
    /// Arithmetic across mismatched currencies.
    CurrencyMismatch,
    /// Malformed currency code.
    InvalidCurrency,
    /// Single-payment transaction received a non-full amount.
    OverpaymentRejected,
    /// Optimistic-lock version mismatch; the caller should retry.
    ConcurrencyConflict,
    /// Idempotency key reused for a different request.
    IdempotencyConflict,
    /// Missing or malformed input outside the amount rules.
    Validation,
    /// Storage or transaction failure.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code the REST layer should answer with.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidAmount
            | Self::InvalidCurrency
            | Self::CurrencyMismatch
            | Self::Validation => 400,
            Self::ConcurrencyConflict | Self::IdempotencyConflict => 409,
            Self::InvalidState | Self::InvalidSettlement | Self::OverpaymentRejected => 422,
            Self::Internal => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::InvalidState => "INVALID_STATE",
            Self::InvalidAmount => "INVALID_AMOUNT",
            Self::InvalidSettlement => "INVALID_SETTLEMENT",
            Self::CurrencyMismatch => "CURRENCY_MISMATCH",
            Self::InvalidCurrency => "INVALID_CURRENCY",
            Self::OverpaymentRejected => "OVERPAYMENT_REJECTED",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
            Self::IdempotencyConflict => "IDEMPOTENCY_CONFLICT",
            Self::Validation => "VALIDATION_ERROR",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

/// Application error handed to the REST boundary.
#[derive(Debug, Error)]
pub enum AppError {
    /// A domain rule rejected the request; the message is safe to show.
    #[error("{message}")]
    Domain {
        /// Taxonomy bucket.
        kind: ErrorKind,
        /// Human-readable detail.
        message: String,
    },

    /// Optimistic retries were exhausted; the caller may try again.
    #[error("Concurrent modification, please retry: {0}")]
    RetryLater(String),

    /// Internal error; details are logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds a domain error.
    pub fn domain(kind: ErrorKind, message: impl Into<String>) -> Self {
        match kind {
            ErrorKind::ConcurrencyConflict => Self::RetryLater(message.into()),
            ErrorKind::Internal => Self::Internal(message.into()),
            _ => Self::Domain {
                kind,
                message: message.into(),
            },
        }
    }

    /// Returns the taxonomy bucket of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Domain { kind, .. } => *kind,
            Self::RetryLater(_) => ErrorKind::ConcurrencyConflict,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        self.kind().as_str()
    }

    /// Message that is safe to put in a response body.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::Internal(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<MoneyError> for AppError {
    fn from(err: MoneyError) -> Self {
        let kind = match err {
            MoneyError::CurrencyMismatch { .. } => ErrorKind::CurrencyMismatch,
            MoneyError::InvalidCurrency(_) => ErrorKind::InvalidCurrency,
            MoneyError::InvalidRate(_) => ErrorKind::Validation,
        };
        Self::domain(kind, err.to_string())
    }
}
