//! Audit event sinks.

use parking_lot::Mutex;
use sarraf_core::audit::{AuditAction, AuditEvent, AuditSink};

/// Writes each event as a structured `tracing` event on target `sarraf::audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        let before = event.before.as_ref().map(ToString::to_string);
        let after = event.after.as_ref().map(ToString::to_string);
        tracing::info!(
            target: "sarraf::audit",
            tenant_id = %event.tenant_id,
            actor = %event.actor,
            action = event.action.as_str(),
            entity_type = event.entity_type,
            entity_id = %event.entity_id,
            before = before.as_deref(),
            after = after.as_deref(),
            occurred_at = %event.occurred_at,
            "audit"
        );
    }
}

/// Keeps events in memory; used by tests and the CLI report.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All events so far, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    /// Events with the given action.
    pub fn with_action(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.events.lock().iter().filter(|e| e.action == action).cloned().collect()
    }
}

impl AuditSink for MemoryAuditSink {
    fn emit(&self, event: AuditEvent) {
        self.events.lock().push(event);
    }
}
