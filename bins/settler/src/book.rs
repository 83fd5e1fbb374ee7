//! Remittance book files and the in-memory services they are loaded into.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, bail};
use rust_decimal::Decimal;
use sarraf_core::remittance::{IncomingRemittance, NewRemittance, OutgoingRemittance, RemittanceService};
use sarraf_core::retry::RetryPolicy;
use sarraf_core::settlement::SettlementService;
use sarraf_core::tenant::Tenant;
use sarraf_shared::types::{CurrencyCode, Money, OutgoingRemittanceId, UserId};
use sarraf_shared::AppConfig;
use sarraf_store::{MemoryIdempotencyStore, MemoryStore, StaticRateTable, TracingAuditSink};
use serde::Deserialize;

/// One remittance line of a book.
#[derive(Debug, Clone, Deserialize)]
pub struct BookLine {
    /// Operator reference, unique within its side of the book.
    pub reference: String,
    /// Rial amount.
    pub amount_irr: Decimal,
    /// Rials per CAD; the book's default rate when absent.
    #[serde(default)]
    pub rate: Option<Decimal>,
}

/// A tenant's open remittances, as exported by the front office.
#[derive(Debug, Clone, Deserialize)]
pub struct Book {
    /// Tenant display name.
    #[serde(default = "default_tenant")]
    pub tenant: String,
    /// Rials per CAD used for lines without a rate.
    pub default_rate: Decimal,
    /// Debts, in creation order.
    #[serde(default)]
    pub outgoing: Vec<BookLine>,
    /// Credits, in creation order.
    #[serde(default)]
    pub incoming: Vec<BookLine>,
}

fn default_tenant() -> String {
    "default".to_string()
}

impl Book {
    /// Reads and parses a book file.
    pub fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let book: Self = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
        if book.default_rate <= Decimal::ZERO {
            bail!("default_rate must be positive, got {}", book.default_rate);
        }
        Ok(book)
    }
}

/// Services over a freshly loaded book.
pub struct Session {
    /// Tenant the book was loaded into.
    pub tenant: Tenant,
    /// Operator recorded on every write.
    pub actor: UserId,
    /// Remittance lifecycle.
    pub remittances: RemittanceService,
    /// Matcher.
    pub settlements: SettlementService,
    /// Outgoing rows, in book order.
    pub outgoing: Vec<OutgoingRemittance>,
    /// Incoming rows, in book order.
    pub incoming: Vec<IncomingRemittance>,
}

impl Session {
    /// Creates the services and records every book line.
    pub async fn load(book: &Book, config: &AppConfig) -> anyhow::Result<Self> {
        let store = Arc::new(MemoryStore::new());
        let rates = Arc::new(StaticRateTable::new());
        rates.set_global(CurrencyCode::CAD, CurrencyCode::IRR, book.default_rate);
        let audit = Arc::new(TracingAuditSink);
        let idempotency = Arc::new(MemoryIdempotencyStore::new(&config.idempotency));
        let retry = RetryPolicy::new(config.settlement.max_conflict_retries);

        let tenant = store.register_tenant(&book.tenant, CurrencyCode::CAD);
        let actor = UserId::new();
        let remittances = RemittanceService::new(store.clone(), store.clone(), rates, audit.clone(), retry);
        let settlements = SettlementService::new(store.clone(), store, idempotency, audit, &config.settlement)?;

        let input = |line: &BookLine| NewRemittance {
            tenant_id: tenant.id,
            client_id: None,
            reference: line.reference.clone(),
            amount_irr: Money::new(line.amount_irr, CurrencyCode::IRR),
            rate_cad: line.rate,
            created_by: actor,
        };
        let mut outgoing = Vec::with_capacity(book.outgoing.len());
        for line in &book.outgoing {
            let row = remittances
                .create_outgoing(input(line))
                .await
                .with_context(|| format!("outgoing {}", line.reference))?;
            outgoing.push(row);
        }
        let mut incoming = Vec::with_capacity(book.incoming.len());
        for line in &book.incoming {
            let row = remittances
                .create_incoming(input(line))
                .await
                .with_context(|| format!("incoming {}", line.reference))?;
            incoming.push(row);
        }
        tracing::info!(
            tenant = %tenant.name,
            outgoing = outgoing.len(),
            incoming = incoming.len(),
            "book loaded"
        );

        Ok(Self {
            tenant,
            actor,
            remittances,
            settlements,
            outgoing,
            incoming,
        })
    }

    /// Finds an incoming remittance by reference.
    pub fn incoming_by_reference(&self, reference: &str) -> anyhow::Result<&IncomingRemittance> {
        self.incoming
            .iter()
            .find(|i| i.reference == reference)
            .with_context(|| format!("no incoming remittance with reference {reference:?}"))
    }

    /// Reference of an outgoing remittance, for display.
    pub fn outgoing_reference(&self, id: OutgoingRemittanceId) -> &str {
        self.outgoing
            .iter()
            .find(|o| o.id == id)
            .map_or("?", |o| o.reference.as_str())
    }
}
