//! Remittance lifecycle outside of settlement: create, cancel, pay out, query.

use std::sync::Arc;

use chrono::Utc;
use sarraf_shared::types::{
    ClientId, CurrencyCode, IncomingRemittanceId, OutgoingRemittanceId, TenantId, UserId,
};
use tracing::{info, instrument};

use super::error::RemittanceError;
use super::types::{IncomingRemittance, NewRemittance, OutgoingRemittance};
use crate::audit::{AuditAction, AuditEvent, AuditSink};
use crate::currency::{require_rate, RateProvider};
use crate::retry::RetryPolicy;
use crate::store::{RemittanceStore, StoreError, TenantDirectory};

/// Creates and transitions remittance records.
pub struct RemittanceService {
    directory: Arc<dyn TenantDirectory>,
    store: Arc<dyn RemittanceStore>,
    rates: Arc<dyn RateProvider>,
    audit: Arc<dyn AuditSink>,
    retry: RetryPolicy,
}

impl RemittanceService {
    /// Creates the service over its ports.
    pub fn new(
        directory: Arc<dyn TenantDirectory>,
        store: Arc<dyn RemittanceStore>,
        rates: Arc<dyn RateProvider>,
        audit: Arc<dyn AuditSink>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            directory,
            store,
            rates,
            audit,
            retry,
        }
    }

    async fn check_client(&self, tenant_id: TenantId, client_id: Option<ClientId>) -> Result<(), RemittanceError> {
        let Some(client_id) = client_id else {
            return Ok(());
        };
        match self.directory.client(tenant_id, client_id).await {
            Ok(client) if client.state.is_active() => Ok(()),
            Ok(_) | Err(StoreError::NotFound { entity: "client", .. }) => {
                Err(RemittanceError::ClientNotFound(client_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn rate_for(&self, input: &NewRemittance) -> Result<rust_decimal::Decimal, RemittanceError> {
        match input.rate_cad {
            Some(rate) => Ok(rate),
            None => Ok(require_rate(
                self.rates.as_ref(),
                input.tenant_id,
                CurrencyCode::CAD,
                CurrencyCode::IRR,
            )?),
        }
    }

    /// Records a debt to deliver rials in Iran.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, amount = %input.amount_irr))]
    pub async fn create_outgoing(&self, input: NewRemittance) -> Result<OutgoingRemittance, RemittanceError> {
        self.directory.tenant(input.tenant_id).await?;
        self.check_client(input.tenant_id, input.client_id).await?;
        let rate = self.rate_for(&input)?;
        let (tenant_id, actor) = (input.tenant_id, input.created_by);

        let remittance = OutgoingRemittance::new(input, rate, Utc::now())?;
        let stored = self.store.insert_outgoing(remittance).await?.value;

        info!(outgoing_id = %stored.id, buy_rate = %stored.buy_rate_cad, "outgoing remittance created");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::RemittanceCreated, "outgoing_remittance", stored.id)
                .after(&stored),
        );
        Ok(stored)
    }

    /// Records rials received in the Iran corridor.
    #[instrument(skip(self, input), fields(tenant_id = %input.tenant_id, amount = %input.amount_irr))]
    pub async fn create_incoming(&self, input: NewRemittance) -> Result<IncomingRemittance, RemittanceError> {
        self.directory.tenant(input.tenant_id).await?;
        self.check_client(input.tenant_id, input.client_id).await?;
        let rate = self.rate_for(&input)?;
        let (tenant_id, actor) = (input.tenant_id, input.created_by);

        let remittance = IncomingRemittance::new(input, rate, Utc::now())?;
        let stored = self.store.insert_incoming(remittance).await?.value;

        info!(incoming_id = %stored.id, sell_rate = %stored.sell_rate_cad, "incoming remittance created");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::RemittanceCreated, "incoming_remittance", stored.id)
                .after(&stored),
        );
        Ok(stored)
    }

    /// Cancels an outgoing remittance, keeping what was already settled.
    #[instrument(skip(self))]
    pub async fn cancel_outgoing(
        &self,
        tenant_id: TenantId,
        id: OutgoingRemittanceId,
        actor: UserId,
    ) -> Result<OutgoingRemittance, RemittanceError> {
        let (before, after) = self
            .retry
            .run("cancel_outgoing", |_| async move {
                let row = self.store.outgoing(tenant_id, id).await?;
                let next = row.value.cancel(Utc::now())?;
                let stored = self.store.update_outgoing(row.with_value(next)).await?;
                Ok::<_, RemittanceError>((row.value, stored.value))
            })
            .await?;

        info!(outgoing_id = %id, "outgoing remittance cancelled");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::RemittanceCancelled, "outgoing_remittance", id)
                .before(&before)
                .after(&after),
        );
        Ok(after)
    }

    /// Cancels an incoming remittance, keeping what was already allocated.
    #[instrument(skip(self))]
    pub async fn cancel_incoming(
        &self,
        tenant_id: TenantId,
        id: IncomingRemittanceId,
        actor: UserId,
    ) -> Result<IncomingRemittance, RemittanceError> {
        let (before, after) = self
            .retry
            .run("cancel_incoming", |_| async move {
                let row = self.store.incoming(tenant_id, id).await?;
                let next = row.value.cancel(Utc::now())?;
                let stored = self.store.update_incoming(row.with_value(next)).await?;
                Ok::<_, RemittanceError>((row.value, stored.value))
            })
            .await?;

        info!(incoming_id = %id, "incoming remittance cancelled");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::RemittanceCancelled, "incoming_remittance", id)
                .before(&before)
                .after(&after),
        );
        Ok(after)
    }

    /// Marks an incoming remittance as paid out to its recipient.
    #[instrument(skip(self))]
    pub async fn mark_incoming_paid(
        &self,
        tenant_id: TenantId,
        id: IncomingRemittanceId,
        actor: UserId,
    ) -> Result<IncomingRemittance, RemittanceError> {
        let (before, after) = self
            .retry
            .run("mark_incoming_paid", |_| async move {
                let row = self.store.incoming(tenant_id, id).await?;
                let next = row.value.mark_paid(Utc::now())?;
                let stored = self.store.update_incoming(row.with_value(next)).await?;
                Ok::<_, RemittanceError>((row.value, stored.value))
            })
            .await?;

        info!(incoming_id = %id, "incoming remittance paid out");
        self.audit.emit(
            AuditEvent::new(tenant_id, actor, AuditAction::RemittancePaid, "incoming_remittance", id)
                .before(&before)
                .after(&after),
        );
        Ok(after)
    }

    /// Loads an outgoing remittance.
    pub async fn outgoing(&self, tenant_id: TenantId, id: OutgoingRemittanceId) -> Result<OutgoingRemittance, RemittanceError> {
        Ok(self.store.outgoing(tenant_id, id).await?.value)
    }

    /// Loads an incoming remittance.
    pub async fn incoming(&self, tenant_id: TenantId, id: IncomingRemittanceId) -> Result<IncomingRemittance, RemittanceError> {
        Ok(self.store.incoming(tenant_id, id).await?.value)
    }

    /// All outgoing remittances of the tenant, oldest first.
    pub async fn list_outgoing(&self, tenant_id: TenantId) -> Result<Vec<OutgoingRemittance>, RemittanceError> {
        let rows = self.store.list_outgoing(tenant_id).await?;
        Ok(rows.into_iter().map(|r| r.value).collect())
    }

    /// All incoming remittances of the tenant, oldest first.
    pub async fn list_incoming(&self, tenant_id: TenantId) -> Result<Vec<IncomingRemittance>, RemittanceError> {
        let rows = self.store.list_incoming(tenant_id).await?;
        Ok(rows.into_iter().map(|r| r.value).collect())
    }
}
