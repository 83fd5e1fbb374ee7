//! Settlement service: propose, execute and auto-settle.
//!
//! Execution is a read-validate-commit cycle. Both remittances are read at a
//! version, the new states are computed in memory, and the whole changeset is
//! committed through [`RemittanceStore::commit_settlement`], which refuses it if
//! either row moved. Conflicts are retried from fresh reads.

use std::sync::Arc;

use chrono::Utc;
use sarraf_shared::config::SettlementConfig;
use sarraf_shared::types::{IncomingRemittanceId, LedgerEntryId, SettlementId, TenantId, UserId};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::error::SettlementError;
use super::matcher;
use super::profit::realized_profit;
use super::types::{AutoSettleOutcome, RemittanceSettlement, SettlementProposal, SettlementRequest, Strategy};
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::idempotency::{Begin, IdempotencyError, IdempotencyKey, IdempotencyStore};
use crate::ledger::{EntryType, LedgerEntry};
use crate::reports::{summarize_book, BookSummary};
use crate::retry::RetryPolicy;
use crate::store::{RemittanceStore, SettlementCommit, SettlementFilter, TenantDirectory};

/// Route recorded with single-settlement idempotency keys.
pub const SETTLE_ROUTE: &str = "/remittances/settle";
/// Route recorded with auto-settlement idempotency keys.
pub const AUTO_SETTLE_ROUTE: &str = "/auto-settlement/auto-settle";

/// Matches incoming credit against outgoing debt.
pub struct SettlementService {
    directory: Arc<dyn TenantDirectory>,
    store: Arc<dyn RemittanceStore>,
    idempotency: Arc<dyn IdempotencyStore>,
    audit: Arc<dyn AuditSink>,
    default_strategy: Strategy,
    profit_decimal_places: u32,
    retry: RetryPolicy,
}

impl SettlementService {
    /// Creates the service over its ports.
    ///
    /// # Errors
    ///
    /// Fails if the configured default strategy is unknown.
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        store: Arc<dyn RemittanceStore>,
        idempotency: Arc<dyn IdempotencyStore>,
        audit: Arc<dyn AuditSink>,
        config: &SettlementConfig,
    ) -> Result<Self, SettlementError> {
        Ok(Self {
            directory,
            store,
            idempotency,
            audit,
            default_strategy: config.default_strategy.parse()?,
            profit_decimal_places: config.profit_decimal_places,
            retry: RetryPolicy::new(config.max_conflict_retries),
        })
    }

    /// Strategy used when the caller names none.
    #[must_use]
    pub fn default_strategy(&self) -> Strategy {
        self.default_strategy
    }

    /// Proposes matches for an incoming remittance without changing anything.
    #[instrument(skip(self))]
    pub async fn propose(
        &self,
        tenant_id: TenantId,
        incoming_id: IncomingRemittanceId,
        strategy: Strategy,
    ) -> Result<Vec<SettlementProposal>, SettlementError> {
        let incoming = self.store.incoming(tenant_id, incoming_id).await?.value;
        let candidates = self
            .store
            .open_outgoing(tenant_id)
            .await?
            .into_iter()
            .map(|row| row.value)
            .collect();
        matcher::propose(&incoming, candidates, strategy, self.profit_decimal_places)
    }

    /// Executes one settlement atomically.
    ///
    /// With an idempotency key, a repeated request replays the stored
    /// settlement instead of settling twice.
    #[instrument(skip(self, request), fields(
        outgoing_id = %request.outgoing_id,
        incoming_id = %request.incoming_id,
        amount = %request.amount_irr,
    ))]
    pub async fn execute(&self, request: SettlementRequest) -> Result<RemittanceSettlement, SettlementError> {
        match request.idempotency_key.clone() {
            Some(key) => {
                let key = IdempotencyKey::post(request.tenant_id, key, SETTLE_ROUTE);
                self.execute_once(&key, &request).await
            }
            None => self.execute_with_retry(&request).await,
        }
    }

    async fn execute_once(
        &self,
        key: &IdempotencyKey,
        request: &SettlementRequest,
    ) -> Result<RemittanceSettlement, SettlementError> {
        let fingerprint = request.fingerprint();
        match self.idempotency.begin(key, &fingerprint).await? {
            Begin::Replay(response) => {
                info!(key = %key.key, "replaying settlement for idempotency key");
                serde_json::from_value(response)
                    .map_err(|e| IdempotencyError::Corrupt(e.to_string()).into())
            }
            Begin::InFlight => Err(IdempotencyError::InFlight { key: key.key.clone() }.into()),
            Begin::Fresh => match self.execute_with_retry(request).await {
                Ok(settlement) => {
                    self.remember(key, &fingerprint, &settlement).await;
                    Ok(settlement)
                }
                Err(e) => {
                    self.forget(key).await;
                    Err(e)
                }
            },
        }
    }

    /// Stores the response under `key` once the work behind it has committed.
    ///
    /// The commit already happened, so a failure here is logged and the key
    /// released rather than reported to the caller.
    async fn remember<T: Serialize>(&self, key: &IdempotencyKey, fingerprint: &str, response: &T) {
        let stored = match serde_json::to_value(response) {
            Ok(value) => self
                .idempotency
                .complete(key, fingerprint, value)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };
        if let Err(error) = stored {
            warn!(key = %key.key, %error, "committed but could not store idempotent response");
            self.forget(key).await;
        }
    }

    async fn forget(&self, key: &IdempotencyKey) {
        if let Err(release) = self.idempotency.release(key).await {
            warn!(key = %key.key, error = %release, "failed to release idempotency key");
        }
    }

    async fn execute_with_retry(&self, request: &SettlementRequest) -> Result<RemittanceSettlement, SettlementError> {
        self.retry
            .run("execute_settlement", |_| self.try_execute(request))
            .await
    }

    async fn try_execute(&self, request: &SettlementRequest) -> Result<RemittanceSettlement, SettlementError> {
        let tenant = self.directory.tenant(request.tenant_id).await?;
        let outgoing = self.store.outgoing(request.tenant_id, request.outgoing_id).await?;
        let incoming = self.store.incoming(request.tenant_id, request.incoming_id).await?;

        if outgoing.value.tenant_id != incoming.value.tenant_id || outgoing.value.tenant_id != tenant.id {
            return Err(SettlementError::TenantMismatch {
                outgoing: outgoing.value.tenant_id,
                incoming: incoming.value.tenant_id,
            });
        }

        let now = Utc::now();
        let next_outgoing = outgoing.value.apply_settlement(request.amount_irr, now)?;
        let next_incoming = incoming.value.apply_allocation(request.amount_irr, now)?;
        let profit_cad = realized_profit(
            request.amount_irr,
            outgoing.value.buy_rate_cad,
            incoming.value.sell_rate_cad,
            self.profit_decimal_places,
        )?;

        let settlement = RemittanceSettlement {
            id: SettlementId::new(),
            tenant_id: tenant.id,
            outgoing_id: outgoing.value.id,
            incoming_id: incoming.value.id,
            settled_irr: request.amount_irr,
            outgoing_buy_rate: outgoing.value.buy_rate_cad,
            incoming_sell_rate: incoming.value.sell_rate_cad,
            profit_cad,
            ledger_entry_id: LedgerEntryId::new(),
            idempotency_key: request.idempotency_key.clone(),
            created_by: request.actor,
            created_at: now,
        };
        let ledger_entry = LedgerEntry {
            id: settlement.ledger_entry_id,
            tenant_id: tenant.id,
            client_id: tenant.house_client_id,
            entry_type: EntryType::Settlement,
            amount: profit_cad,
            related_entry_id: None,
            source_transaction_id: None,
            description: Some(format!("settlement {}", settlement.id)),
            created_by: request.actor,
            created_at: now,
        };

        let settlement = self
            .store
            .commit_settlement(SettlementCommit {
                tenant_id: tenant.id,
                outgoing: outgoing.with_value(next_outgoing.clone()),
                incoming: incoming.with_value(next_incoming.clone()),
                settlement,
                ledger_entry,
            })
            .await?;

        info!(
            settlement_id = %settlement.id,
            profit_cad = %settlement.profit_cad,
            outgoing_status = %next_outgoing.status,
            incoming_status = %next_incoming.status,
            "settlement executed"
        );
        self.audit.emit(
            AuditEvent::new(
                tenant.id,
                request.actor,
                AuditAction::SettlementExecuted,
                "remittance_settlement",
                settlement.id,
            )
            .before(&(&outgoing.value, &incoming.value))
            .after(&(&settlement, &next_outgoing, &next_incoming)),
        );
        Ok(settlement)
    }

    /// Proposes with `strategy` (default when `None`) and executes each proposal
    /// in order, stopping at the first failure.
    ///
    /// Committed settlements are kept when a later one fails; the failure is
    /// reported in the outcome. Errors before anything executes are returned
    /// directly. With an idempotency key, a completed run is replayed and each
    /// step runs under a derived key.
    #[instrument(skip(self, idempotency_key))]
    pub async fn auto_settle(
        &self,
        tenant_id: TenantId,
        incoming_id: IncomingRemittanceId,
        strategy: Option<Strategy>,
        actor: UserId,
        idempotency_key: Option<&str>,
    ) -> Result<AutoSettleOutcome, SettlementError> {
        let strategy = strategy.unwrap_or(self.default_strategy);
        if strategy == Strategy::Manual {
            return Err(SettlementError::ManualNotAutomatic);
        }

        let Some(key) = idempotency_key else {
            return self.run_auto_settle(tenant_id, incoming_id, strategy, actor, None).await;
        };
        let parent = IdempotencyKey::post(tenant_id, key, AUTO_SETTLE_ROUTE);
        let fingerprint = format!("{incoming_id}:{strategy}");
        match self.idempotency.begin(&parent, &fingerprint).await? {
            Begin::Replay(response) => {
                info!(key = %parent.key, "replaying auto-settlement for idempotency key");
                let settlements = serde_json::from_value(response)
                    .map_err(|e| IdempotencyError::Corrupt(e.to_string()))?;
                return Ok(AutoSettleOutcome {
                    settlements,
                    error: None,
                });
            }
            Begin::InFlight => return Err(IdempotencyError::InFlight { key: parent.key }.into()),
            Begin::Fresh => {}
        }

        let outcome = self
            .run_auto_settle(tenant_id, incoming_id, strategy, actor, Some(&parent))
            .await;
        match &outcome {
            Ok(done) if done.is_complete() => self.remember(&parent, &fingerprint, &done.settlements).await,
            _ => self.forget(&parent).await,
        }
        outcome
    }

    async fn run_auto_settle(
        &self,
        tenant_id: TenantId,
        incoming_id: IncomingRemittanceId,
        strategy: Strategy,
        actor: UserId,
        parent: Option<&IdempotencyKey>,
    ) -> Result<AutoSettleOutcome, SettlementError> {
        let proposals = self.propose(tenant_id, incoming_id, strategy).await?;

        let mut outcome = AutoSettleOutcome {
            settlements: Vec::with_capacity(proposals.len()),
            error: None,
        };
        for (step, proposal) in proposals.into_iter().enumerate() {
            let request = SettlementRequest {
                tenant_id,
                outgoing_id: proposal.outgoing_id,
                incoming_id,
                amount_irr: proposal.proposed_irr,
                actor,
                idempotency_key: None,
            };
            let result = match parent {
                Some(parent) => {
                    let key = parent.child(&format!("{incoming_id}:{}:{step}", proposal.outgoing_id));
                    let request = SettlementRequest {
                        idempotency_key: Some(key.key.clone()),
                        ..request
                    };
                    self.execute_once(&key, &request).await
                }
                None => self.execute_with_retry(&request).await,
            };
            match result {
                Ok(settlement) => outcome.settlements.push(settlement),
                Err(e) => {
                    warn!(step, error = %e, "auto-settlement stopped early");
                    outcome.error = Some(e);
                    break;
                }
            }
        }

        info!(
            settled = outcome.settlements.len(),
            complete = outcome.is_complete(),
            %strategy,
            "auto-settlement finished"
        );
        Ok(outcome)
    }

    /// Lists settlements of the tenant.
    pub async fn settlements(
        &self,
        tenant_id: TenantId,
        filter: SettlementFilter,
    ) -> Result<Vec<RemittanceSettlement>, SettlementError> {
        Ok(self.store.settlements(tenant_id, filter).await?)
    }

    /// Outstanding debt, unallocated credit and realized profit of the tenant.
    pub async fn book_summary(&self, tenant_id: TenantId) -> Result<BookSummary, SettlementError> {
        let outgoing: Vec<_> = self.store.list_outgoing(tenant_id).await?.into_iter().map(|r| r.value).collect();
        let incoming: Vec<_> = self.store.list_incoming(tenant_id).await?.into_iter().map(|r| r.value).collect();
        let settlements = self.store.settlements(tenant_id, SettlementFilter::default()).await?;
        Ok(summarize_book(&outgoing, &incoming, &settlements)?)
    }
}
