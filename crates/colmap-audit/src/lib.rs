//! Append-only audit trail.
//!
//! [`AuditLog`] stamps nothing itself: events arrive fully built from the
//! pipeline, are written to an [`AuditSink`], and mirrored into `tracing`
//! at a level derived from their risk.

#![deny(unsafe_code)]

mod sink;

use colmap_model::{AuditEvent, IntegrationError, RiskLevel};
use thiserror::Error;
use tracing::{info, warn};

pub use sink::{JsonlAuditSink, MemoryAuditSink};

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("failed to open audit log {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write audit event: {0}")]
    Write(#[from] std::io::Error),

    #[error("failed to encode audit event: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("audit sink lock poisoned")]
    Poisoned,
}

impl From<AuditError> for IntegrationError {
    fn from(error: AuditError) -> Self {
        IntegrationError::Audit(error.to_string())
    }
}

/// Destination for audit events. Records are never rewritten.
pub trait AuditSink: Send {
    fn record(&mut self, event: &AuditEvent) -> Result<(), AuditError>;
}

pub struct AuditLog {
    sink: Box<dyn AuditSink>,
    recorded: usize,
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("recorded", &self.recorded)
            .finish_non_exhaustive()
    }
}

impl AuditLog {
    pub fn new(sink: impl AuditSink + 'static) -> Self {
        Self {
            sink: Box::new(sink),
            recorded: 0,
        }
    }

    /// Log backed by a fresh [`MemoryAuditSink`]; the returned handle sees
    /// every recorded event.
    pub fn in_memory() -> (Self, MemoryAuditSink) {
        let sink = MemoryAuditSink::default();
        (Self::new(sink.clone()), sink)
    }

    /// Number of events written through this log.
    pub fn recorded(&self) -> usize {
        self.recorded
    }

    pub fn record(&mut self, event: AuditEvent) -> Result<(), AuditError> {
        let event_type = serde_json::to_value(event.event_type)?;
        let category = serde_json::to_value(event.category)?;
        let event_type = event_type.as_str().unwrap_or_default();
        let category = category.as_str().unwrap_or_default();
        match event.risk_level {
            RiskLevel::High => warn!(
                category,
                event_type,
                risk = %event.risk_level,
                payload = %serde_json::Value::Object(event.payload.clone()),
                "audit event"
            ),
            RiskLevel::Medium | RiskLevel::Low => info!(
                category,
                event_type,
                risk = %event.risk_level,
                "audit event"
            ),
        }
        self.sink.record(&event)?;
        self.recorded += 1;
        Ok(())
    }
}
