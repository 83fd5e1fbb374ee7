//! Fixed rate table.
//!
//! Lookup order: tenant quote, global quote, then the inverse of either.

use dashmap::DashMap;
use rust_decimal::Decimal;
use sarraf_core::currency::RateProvider;
use sarraf_shared::types::{CurrencyCode, TenantId};

type PairKey = (Option<TenantId>, CurrencyCode, CurrencyCode);

/// In-memory FX quotes; 1 `base` = rate `target`.
#[derive(Debug, Default)]
pub struct StaticRateTable {
    quotes: DashMap<PairKey, Decimal>,
}

impl StaticRateTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a quote for every tenant.
    pub fn set_global(&self, base: CurrencyCode, target: CurrencyCode, rate: Decimal) {
        self.quotes.insert((None, base, target), rate);
    }

    /// Sets a quote for one tenant, shadowing the global one.
    pub fn set_for_tenant(&self, tenant_id: TenantId, base: CurrencyCode, target: CurrencyCode, rate: Decimal) {
        self.quotes.insert((Some(tenant_id), base, target), rate);
    }

    fn direct(&self, tenant_id: TenantId, base: CurrencyCode, target: CurrencyCode) -> Option<Decimal> {
        self.quotes
            .get(&(Some(tenant_id), base, target))
            .or_else(|| self.quotes.get(&(None, base, target)))
            .map(|r| *r.value())
    }
}

impl RateProvider for StaticRateTable {
    fn get_rate(&self, tenant_id: TenantId, base: CurrencyCode, target: CurrencyCode) -> Option<Decimal> {
        self.direct(tenant_id, base, target).or_else(|| {
            self.direct(tenant_id, target, base)
                .filter(|r| !r.is_zero())
                .and_then(|r| Decimal::ONE.checked_div(r))
        })
    }
}
