//! Ledger service: posting, exchange pairs, reversals and balance queries.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use sarraf_shared::types::{
    ClientId, CurrencyCode, LedgerEntryId, Money, MoneyError, TenantId, TransactionId, UserId,
};
use tracing::{info, instrument};

use super::balance::{balances_by_currency, build_statement, fold_balance, ClientBalance, StatementLine};
use super::entry::{EntryType, LedgerEntry};
use super::error::LedgerError;
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::currency::{convert_amount, require_rate, RateProvider};
use crate::store::{LedgerStore, StoreError, TenantDirectory};
use crate::tenant::Client;

/// Input for a single entry.
#[derive(Debug, Clone)]
pub struct PostEntryInput {
    /// Client whose balance moves.
    pub client_id: ClientId,
    /// Kind of movement.
    pub entry_type: EntryType,
    /// Currency code as received.
    pub currency: String,
    /// Signed amount; positive credits the client.
    pub amount: Decimal,
    /// Linked entry, if any.
    pub related_entry_id: Option<LedgerEntryId>,
    /// Business transaction that caused the entry.
    pub source_transaction_id: Option<TransactionId>,
    /// Free-text note.
    pub description: Option<String>,
    /// Operator.
    pub actor: UserId,
}

/// Input for an FX exchange: the client sells one currency and buys another.
#[derive(Debug, Clone)]
pub struct PostExchangeInput {
    /// The client.
    pub client_id: ClientId,
    /// Currency the client hands over.
    pub sell_currency: String,
    /// Positive amount handed over.
    pub sell_amount: Decimal,
    /// Currency the client receives.
    pub buy_currency: String,
    /// Amount received; derived from the rate when absent.
    pub buy_amount: Option<Decimal>,
    /// Units of buy currency per sell unit; looked up when absent.
    pub rate: Option<Decimal>,
    /// Business transaction that caused the exchange.
    pub source_transaction_id: Option<TransactionId>,
    /// Operator.
    pub actor: UserId,
}

/// Both legs of a posted exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangePair {
    /// FX_SELL leg (debit in the sold currency).
    pub sell: LedgerEntry,
    /// FX_BUY leg (credit in the bought currency).
    pub buy: LedgerEntry,
    /// Rate applied.
    pub rate: Decimal,
}

/// Append-only client ledger.
pub struct LedgerService {
    directory: Arc<dyn TenantDirectory>,
    store: Arc<dyn LedgerStore>,
    rates: Arc<dyn RateProvider>,
    audit: Arc<dyn AuditSink>,
}

impl LedgerService {
    /// Creates the service over its ports.
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        store: Arc<dyn LedgerStore>,
        rates: Arc<dyn RateProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            directory,
            store,
            rates,
            audit,
        }
    }

    async fn active_client(&self, tenant_id: TenantId, client_id: ClientId) -> Result<Client, LedgerError> {
        match self.directory.client(tenant_id, client_id).await {
            Ok(client) if client.state.is_active() => Ok(client),
            Ok(_) | Err(StoreError::NotFound { entity: "client", .. }) => {
                Err(LedgerError::ClientNotFound(client_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Appends one entry to a client's ledger.
    #[instrument(skip(self, input), fields(client_id = %input.client_id, entry_type = ?input.entry_type))]
    pub async fn post_entry(&self, tenant_id: TenantId, input: PostEntryInput) -> Result<LedgerEntry, LedgerError> {
        let currency = CurrencyCode::parse(&input.currency)?;
        self.active_client(tenant_id, input.client_id).await?;

        let entry = LedgerEntry {
            id: LedgerEntryId::new(),
            tenant_id,
            client_id: input.client_id,
            entry_type: input.entry_type,
            amount: Money::new(input.amount, currency),
            related_entry_id: input.related_entry_id,
            source_transaction_id: input.source_transaction_id,
            description: input.description,
            created_by: input.actor,
            created_at: Utc::now(),
        };

        let mut stored = self.store.append_entries(tenant_id, vec![entry]).await?;
        let entry = stored
            .pop()
            .ok_or_else(|| StoreError::Backend("append returned no entry".to_string()))?;

        info!(entry_id = %entry.id, amount = %entry.amount, "ledger entry posted");
        self.audit.emit(
            AuditEvent::new(tenant_id, input.actor, AuditAction::EntryPosted, "ledger_entry", entry.id)
                .after(&entry),
        );
        Ok(entry)
    }

    /// Posts both legs of an exchange, or neither.
    ///
    /// The bought amount must equal `sell_amount * rate` rounded to the bought
    /// currency's minor units, give or take one minor unit.
    #[instrument(skip(self, input), fields(client_id = %input.client_id))]
    pub async fn post_exchange(&self, tenant_id: TenantId, input: PostExchangeInput) -> Result<ExchangePair, LedgerError> {
        let sell_currency = CurrencyCode::parse(&input.sell_currency)?;
        let buy_currency = CurrencyCode::parse(&input.buy_currency)?;
        if sell_currency == buy_currency {
            return Err(LedgerError::SameCurrencyExchange);
        }
        if input.sell_amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveExchange(input.sell_amount));
        }
        self.active_client(tenant_id, input.client_id).await?;

        let rate = match input.rate {
            Some(rate) if rate > Decimal::ZERO => rate,
            Some(rate) => return Err(LedgerError::Money(MoneyError::InvalidRate(rate))),
            None => require_rate(self.rates.as_ref(), tenant_id, sell_currency, buy_currency)?,
        };

        let expected = convert_amount(input.sell_amount, rate, buy_currency.decimal_places());
        let buy_amount = input.buy_amount.unwrap_or(expected);
        if (buy_amount - expected).abs() > buy_currency.minor_unit() {
            return Err(LedgerError::ExchangeMismatch {
                currency: buy_currency,
                expected,
                actual: buy_amount,
            });
        }

        let now = Utc::now();
        let sell_id = LedgerEntryId::new();
        let buy_id = LedgerEntryId::new();
        let leg = |id, entry_type, amount: Money, related| LedgerEntry {
            id,
            tenant_id,
            client_id: input.client_id,
            entry_type,
            amount,
            related_entry_id: Some(related),
            source_transaction_id: input.source_transaction_id,
            description: Some(format!("{sell_currency}->{buy_currency} @ {rate}")),
            created_by: input.actor,
            created_at: now,
        };
        let sell = leg(
            sell_id,
            EntryType::FxSell,
            Money::new(-input.sell_amount, sell_currency),
            buy_id,
        );
        let buy = leg(buy_id, EntryType::FxBuy, Money::new(buy_amount, buy_currency), sell_id);

        let mut stored = self.store.append_entries(tenant_id, vec![sell, buy]).await?.into_iter();
        let (Some(sell), Some(buy)) = (stored.next(), stored.next()) else {
            return Err(StoreError::Backend("append returned fewer entries than posted".to_string()).into());
        };

        info!(sell = %sell.amount, buy = %buy.amount, %rate, "exchange posted");
        self.audit.emit(
            AuditEvent::new(tenant_id, input.actor, AuditAction::ExchangePosted, "ledger_entry", sell.id)
                .after(&(&sell, &buy)),
        );
        Ok(ExchangePair { sell, buy, rate })
    }

    /// Appends a REVERSAL negating `entry_id`.
    #[instrument(skip(self, reason))]
    pub async fn reverse_entry(
        &self,
        tenant_id: TenantId,
        entry_id: LedgerEntryId,
        reason: &str,
        actor: UserId,
    ) -> Result<LedgerEntry, LedgerError> {
        if reason.trim().is_empty() {
            return Err(LedgerError::ReasonRequired);
        }
        let original = self.store.entry(tenant_id, entry_id).await?;
        if original.entry_type == EntryType::Reversal {
            return Err(LedgerError::CannotReverseReversal(entry_id));
        }
        if self.store.reversal_of(tenant_id, entry_id).await?.is_some() {
            return Err(LedgerError::AlreadyReversed(entry_id));
        }

        let reversal = original.reversal(reason.trim(), actor, Utc::now());
        let reversal = match self.store.append_entries(tenant_id, vec![reversal]).await {
            Ok(mut stored) => stored
                .pop()
                .ok_or_else(|| StoreError::Backend("append returned no entry".to_string()))?,
            Err(StoreError::Duplicate { .. }) => return Err(LedgerError::AlreadyReversed(entry_id)),
            Err(e) => return Err(e.into()),
        };

        info!(reversal_id = %reversal.id, "ledger entry reversed");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::EntryReversed, "ledger_entry", entry_id)
                .before(&original)
                .after(&reversal),
        );
        Ok(reversal)
    }

    /// Current balance of a client in one currency.
    pub async fn balance(&self, tenant_id: TenantId, client_id: ClientId, currency: &str) -> Result<Money, LedgerError> {
        let currency = CurrencyCode::parse(currency)?;
        self.active_client(tenant_id, client_id).await?;
        let entries = self
            .store
            .entries_for_client(tenant_id, client_id, Some(currency))
            .await?;
        Ok(fold_balance(currency, &entries)?)
    }

    /// Balance of a client in every currency it has entries in.
    pub async fn balances(&self, tenant_id: TenantId, client_id: ClientId) -> Result<Vec<ClientBalance>, LedgerError> {
        self.active_client(tenant_id, client_id).await?;
        let entries = self.store.entries_for_client(tenant_id, client_id, None).await?;
        Ok(balances_by_currency(client_id, &entries))
    }

    /// Entries of one currency with running balances.
    pub async fn statement(
        &self,
        tenant_id: TenantId,
        client_id: ClientId,
        currency: &str,
    ) -> Result<Vec<StatementLine>, LedgerError> {
        let currency = CurrencyCode::parse(currency)?;
        self.active_client(tenant_id, client_id).await?;
        let entries = self
            .store
            .entries_for_client(tenant_id, client_id, Some(currency))
            .await?;
        Ok(build_statement(entries)?)
    }
}
