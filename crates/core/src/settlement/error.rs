//! Settlement error types.

use sarraf_shared::types::{MoneyError, TenantId};
use sarraf_shared::{AppError, ErrorKind};
use thiserror::Error;

use crate::idempotency::IdempotencyError;
use crate::remittance::RemittanceError;
use crate::retry::Retryable;
use crate::store::StoreError;

/// Errors raised while proposing or executing settlements.
#[derive(Debug, Error)]
pub enum SettlementError {
    /// A remittance rejected the amount or is not in a settleable state.
    #[error(transparent)]
    Remittance(#[from] RemittanceError),

    /// The two remittances belong to different tenants.
    #[error("Remittances belong to different tenants ({outgoing} and {incoming})")]
    TenantMismatch {
        /// Tenant of the outgoing remittance.
        outgoing: TenantId,
        /// Tenant of the incoming remittance.
        incoming: TenantId,
    },

    /// Strategy name not recognized.
    #[error("Unknown settlement strategy: {0:?}")]
    UnknownStrategy(String),

    /// MANUAL proposals overlap and cannot be executed blindly.
    #[error("The manual strategy requires the operator to pick settlements")]
    ManualNotAutomatic,

    /// Idempotency key conflict or in-flight duplicate.
    #[error(transparent)]
    Idempotency(#[from] IdempotencyError),

    /// Profit computation failed.
    #[error(transparent)]
    Money(#[from] MoneyError),

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl SettlementError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Remittance(e) => e.error_code(),
            Self::TenantMismatch { .. } => "INVALID_SETTLEMENT",
            Self::UnknownStrategy(_) => "UNKNOWN_STRATEGY",
            Self::ManualNotAutomatic => "MANUAL_NOT_AUTOMATIC",
            Self::Idempotency(e) => e.error_code(),
            Self::Money(_) => self.kind().as_str(),
            Self::Store(e) => e.error_code(),
        }
    }

    /// Returns the taxonomy bucket.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Remittance(e) => e.kind(),
            Self::TenantMismatch { .. } => ErrorKind::InvalidSettlement,
            Self::UnknownStrategy(_) | Self::ManualNotAutomatic => ErrorKind::Validation,
            Self::Idempotency(e) => e.kind(),
            Self::Money(MoneyError::CurrencyMismatch { .. }) => ErrorKind::CurrencyMismatch,
            Self::Money(MoneyError::InvalidCurrency(_)) => ErrorKind::InvalidCurrency,
            Self::Money(MoneyError::InvalidRate(_)) => ErrorKind::Validation,
            Self::Store(e) => e.kind(),
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
        match self {
            Self::Store(e) => e.is_retryable(),
            Self::Remittance(e) => e.is_retryable(),
            _ => false,
        }
    }
}

impl Retryable for SettlementError {
    fn is_retryable(&self) -> bool {
        SettlementError::is_retryable(self)
    }
}

impl From<SettlementError> for AppError {
    fn from(err: SettlementError) -> Self {
        Self::domain(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use sarraf_shared::types::{CurrencyCode, Money};

    #[rstest]
    #[case(
        SettlementError::TenantMismatch { outgoing: TenantId::new(), incoming: TenantId::new() },
        ErrorKind::InvalidSettlement
    )]
    #[case(
        SettlementError::Remittance(RemittanceError::NonPositiveAmount(Money::zero(CurrencyCode::IRR))),
        ErrorKind::InvalidAmount
    )]
    #[case(SettlementError::UnknownStrategy("x".into()), ErrorKind::Validation)]
    #[case(
        SettlementError::Idempotency(IdempotencyError::KeyReused { key: "k".into() }),
        ErrorKind::IdempotencyConflict
    )]
    #[case(SettlementError::Money(MoneyError::InvalidRate(dec!(0))), ErrorKind::Validation)]
    fn test_kind_mapping(#[case] err: SettlementError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        let conflict = SettlementError::Store(StoreError::VersionConflict {
            entity: "outgoing_remittance",
            id: "o".into(),
            expected: 1,
            actual: 2,
        });
        assert!(conflict.is_retryable());
        assert!(matches!(AppError::from(conflict), AppError::RetryLater(_)));
        assert!(!SettlementError::ManualNotAutomatic.is_retryable());
    }
}
