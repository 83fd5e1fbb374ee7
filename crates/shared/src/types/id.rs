//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing an `OutgoingRemittanceId` where an
//! `IncomingRemittanceId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(TenantId, "Unique identifier for a tenant (one exchange business).");
typed_id!(BranchId, "Unique identifier for a tenant branch.");
typed_id!(UserId, "Unique identifier for an operator.");
typed_id!(ClientId, "Unique identifier for a client of the exchange.");
typed_id!(LedgerEntryId, "Unique identifier for a client ledger entry.");
typed_id!(
    OutgoingRemittanceId,
    "Unique identifier for an outgoing (Canada to Iran) remittance."
);
typed_id!(
    IncomingRemittanceId,
    "Unique identifier for an incoming (Iran to Canada) remittance."
);
typed_id!(SettlementId, "Unique identifier for a remittance settlement.");
typed_id!(TransactionId, "Unique identifier for a money-moving transaction.");
typed_id!(PaymentId, "Unique identifier for a payment against a transaction.");
typed_id!(CashMovementId, "Unique identifier for a cash transaction leg.");
typed_id!(CashAdjustmentId, "Unique identifier for a manual cash adjustment.");
typed_id!(ReconciliationId, "Unique identifier for a daily cash reconciliation.");

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
