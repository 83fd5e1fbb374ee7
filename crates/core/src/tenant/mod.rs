//! Tenants and their clients.
//!
//! Every record in the system is scoped to a tenant; the tenant is the hard
//! isolation boundary for reads and writes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sarraf_shared::types::{ClientId, CurrencyCode, TenantId};

/// An exchange business using the system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    /// Tenant ID.
    pub id: TenantId,
    /// Display name.
    pub name: String,
    /// Currency the books are kept in (CAD for the Canada side).
    pub base_currency: CurrencyCode,
    /// The tenant's own ledger account, which receives realized settlement profit.
    pub house_client_id: ClientId,
}

/// Lifecycle tag of a client record.
///
/// Deletion is an explicit state, never a sentinel timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RecordState {
    /// Visible to every operation.
    Active,
    /// Soft-deleted; hidden from posting but kept for audit.
    Deleted {
        /// When the record was deleted.
        deleted_at: DateTime<Utc>,
    },
}

impl RecordState {
    /// Returns true if the record is active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// A client of the exchange with a multi-currency ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    /// Client ID.
    pub id: ClientId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Full name.
    pub name: String,
    /// Active or deleted.
    pub state: RecordState,
}

impl Client {
    /// Creates an active client.
    #[must_use]
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: ClientId::new(),
            tenant_id,
            name: name.into(),
            state: RecordState::Active,
        }
    }
}

impl Tenant {
    /// Creates a tenant together with its house client.
    #[must_use]
    pub fn with_house_client(name: impl Into<String>, base_currency: CurrencyCode) -> (Self, Client) {
        let id = TenantId::new();
        let name = name.into();
        let house = Client::new(id, format!("{name} (house)"));
        let tenant = Self {
            id,
            name,
            base_currency,
            house_client_id: house.id,
        };
        (tenant, house)
    }
}
