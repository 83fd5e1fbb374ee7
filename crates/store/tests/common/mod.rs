//! Shared wiring for integration tests: every service over one `MemoryStore`.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sarraf_core::cash::CashService;
use sarraf_core::ledger::LedgerService;
use sarraf_core::payment::PaymentService;
use sarraf_core::remittance::{IncomingRemittance, NewRemittance, OutgoingRemittance, RemittanceService};
use sarraf_core::retry::RetryPolicy;
use sarraf_core::settlement::SettlementService;
use sarraf_core::tenant::Tenant;
use sarraf_shared::types::{CurrencyCode, Money, UserId};
use sarraf_shared::AppConfig;
use sarraf_store::{MemoryAuditSink, MemoryIdempotencyStore, MemoryStore, StaticRateTable};

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub rates: Arc<StaticRateTable>,
    pub audit: Arc<MemoryAuditSink>,
    pub tenant: Tenant,
    pub actor: UserId,
    pub remittances: RemittanceService,
    pub settlements: SettlementService,
    pub ledger: LedgerService,
    pub cash: Arc<CashService>,
    pub payments: PaymentService,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&AppConfig::default())
    }

    pub fn with_config(config: &AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new());
        let rates = Arc::new(StaticRateTable::new());
        rates.set_global(CurrencyCode::CAD, CurrencyCode::IRR, dec!(80000));
        let audit = Arc::new(MemoryAuditSink::new());
        let idempotency = Arc::new(MemoryIdempotencyStore::new(&config.idempotency));
        let retry = RetryPolicy::new(config.settlement.max_conflict_retries);
        let tenant = store.register_tenant("Toronto Sarraf", CurrencyCode::CAD);

        let remittances = RemittanceService::new(store.clone(), store.clone(), rates.clone(), audit.clone(), retry);
        let settlements =
            SettlementService::new(store.clone(), store.clone(), idempotency, audit.clone(), &config.settlement)
                .expect("default strategy parses");
        let ledger = LedgerService::new(store.clone(), store.clone(), rates.clone(), audit.clone());
        let cash = Arc::new(CashService::new(store.clone(), store.clone(), audit.clone(), retry));
        let payments = PaymentService::new(
            store.clone(),
            store.clone(),
            cash.clone(),
            audit.clone(),
            retry,
            &config.payments,
        );

        Self {
            store,
            rates,
            audit,
            tenant,
            actor: UserId::new(),
            remittances,
            settlements,
            ledger,
            cash,
            payments,
        }
    }

    pub fn irr(amount: Decimal) -> Money {
        Money::new(amount, CurrencyCode::IRR)
    }

    fn input(&self, reference: &str, amount: Decimal, rate: Decimal) -> NewRemittance {
        NewRemittance {
            tenant_id: self.tenant.id,
            client_id: None,
            reference: reference.to_string(),
            amount_irr: Self::irr(amount),
            rate_cad: Some(rate),
            created_by: self.actor,
        }
    }

    pub async fn outgoing(&self, reference: &str, amount: Decimal, rate: Decimal) -> OutgoingRemittance {
        self.remittances
            .create_outgoing(self.input(reference, amount, rate))
            .await
            .expect("outgoing created")
    }

    pub async fn incoming(&self, reference: &str, amount: Decimal, rate: Decimal) -> IncomingRemittance {
        self.remittances
            .create_incoming(self.input(reference, amount, rate))
            .await
            .expect("incoming created")
    }

    /// Waits a tick so creation timestamps are strictly ordered.
    pub async fn tick() {
        let start = Utc::now();
        while Utc::now() == start {
            tokio::task::yield_now().await;
        }
    }
}
