//! Storage error types.

use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

/// Errors returned by storage ports.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Row does not exist in the tenant's scope.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. "outgoing_remittance".
        entity: &'static str,
        /// Requested ID.
        id: String,
    },

    /// Row changed since it was read.
    #[error("{entity} {id} was modified concurrently: expected version {expected}, found {actual}")]
    VersionConflict {
        /// Entity kind.
        entity: &'static str,
        /// Row ID.
        id: String,
        /// Version the writer read.
        expected: u64,
        /// Version currently stored.
        actual: u64,
    },

    /// A unique row already exists.
    #[error("{entity} already exists: {id}")]
    Duplicate {
        /// Entity kind.
        entity: &'static str,
        /// Conflicting ID.
        id: String,
    },

    /// Backend failure.
    #[error("Storage failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Builds a `NotFound` error.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::VersionConflict { .. } => "CONCURRENCY_CONFLICT",
            Self::Duplicate { .. } => "DUPLICATE",
            Self::Backend(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::VersionConflict { .. } => ErrorKind::ConcurrencyConflict,
            Self::Duplicate { .. } => ErrorKind::InvalidState,
            Self::Backend(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns true if re-reading and retrying may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::VersionConflict { .. })
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}
