//! Idempotency-key integration.
//!
//! Mutating operations that accept a client key follow check-before /
//! store-after: [`IdempotencyStore::begin`] claims the key, the operation runs,
//! then [`IdempotencyStore::complete`] stores the serialized response for replay
//! or [`IdempotencyStore::release`] forgets a failed attempt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sarraf_shared::types::TenantId;
use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

/// Identity of one client request intent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdempotencyKey {
    /// Tenant scope.
    pub tenant_id: TenantId,
    /// Client-generated key.
    pub key: String,
    /// Logical route, e.g. "/remittances/settle".
    pub route: String,
    /// Request method.
    pub method: String,
}

impl IdempotencyKey {
    /// Builds a POST key for the route.
    pub fn post(tenant_id: TenantId, key: impl Into<String>, route: impl Into<String>) -> Self {
        Self {
            tenant_id,
            key: key.into(),
            route: route.into(),
            method: "POST".to_string(),
        }
    }

    /// Derives a child key, used for the individual steps of a batch.
    #[must_use]
    pub fn child(&self, suffix: &str) -> Self {
        Self {
            key: format!("{}:{suffix}", self.key),
            ..self.clone()
        }
    }
}

/// Outcome of claiming a key.
#[derive(Debug, Clone, PartialEq)]
pub enum Begin {
    /// First sighting; the caller must run the operation.
    Fresh,
    /// Already completed; replay this response.
    Replay(Value),
    /// Claimed by a request still running.
    InFlight,
}

/// Idempotency failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdempotencyError {
    /// Key was first used with a different request body.
    #[error("Idempotency key {key:?} was already used for a different request")]
    KeyReused {
        /// The reused key.
        key: String,
    },

    /// The first request holding the key has not finished.
    #[error("Request with idempotency key {key:?} is still in progress")]
    InFlight {
        /// The claimed key.
        key: String,
    },

    /// Stored response could not be decoded.
    #[error("Stored idempotent response is unreadable: {0}")]
    Corrupt(String),

    /// Backend failure.
    #[error("Idempotency store failure: {0}")]
    Backend(String),
}

impl IdempotencyError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::KeyReused { .. } => "IDEMPOTENCY_KEY_REUSED",
            Self::InFlight { .. } => "IDEMPOTENCY_IN_FLIGHT",
            Self::Corrupt(_) | Self::Backend(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::KeyReused { .. } => ErrorKind::IdempotencyConflict,
            Self::InFlight { .. } => ErrorKind::ConcurrencyConflict,
            Self::Corrupt(_) | Self::Backend(_) => ErrorKind::Internal,
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns true if the same request may succeed later.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::InFlight { .. })
    }
}

impl From<IdempotencyError> for AppError {
    fn from(err: IdempotencyError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}

/// Storage of idempotency records.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Claims `key` for a request with the given body fingerprint.
    ///
    /// Fails with `KeyReused` if the key is known under another fingerprint.
    async fn begin(&self, key: &IdempotencyKey, fingerprint: &str) -> Result<Begin, IdempotencyError>;

    /// Stores the response of a completed request.
    async fn complete(
        &self,
        key: &IdempotencyKey,
        fingerprint: &str,
        response: Value,
    ) -> Result<(), IdempotencyError>;

    /// Forgets a claim whose request failed, so a retry can run again.
    async fn release(&self, key: &IdempotencyKey) -> Result<(), IdempotencyError>;
}
