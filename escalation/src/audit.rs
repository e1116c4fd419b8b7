//! Audit sinks for recorded decisions
//!
//! The engine never writes anywhere on its own. A caller that wants an audit
//! trail wraps each decision in an [`AuditEntry`] (which adds the wall-clock
//! timestamp the decision deliberately lacks) and hands it to a sink.

use crate::engine::EscalationDecision;
use crate::error::{EscalationError, EscalationResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::{Mutex, PoisonError};
use tracing::info;

/// A decision plus the time it was recorded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub recorded_at: DateTime<Utc>,
    pub decision: EscalationDecision,
}

impl AuditEntry {
    pub fn new(recorded_at: DateTime<Utc>, decision: EscalationDecision) -> Self {
        Self {
            recorded_at,
            decision,
        }
    }

    pub fn now(decision: EscalationDecision) -> Self {
        Self::new(Utc::now(), decision)
    }
}

/// Destination for audit entries
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry) -> EscalationResult<()>;
}

/// Emits each entry as a structured `tracing` event
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: &AuditEntry) -> EscalationResult<()> {
        let d = &entry.decision;
        info!(
            recorded_at = %entry.recorded_at.to_rfc3339(),
            task_id = %d.task_id,
            role = %d.role,
            score = d.total_score,
            escalation = %d.escalation_type,
            confidence = %d.confidence,
            model = %d.selected_model,
            cost = d.cost_estimate,
            "Escalation decision recorded"
        );
        Ok(())
    }
}

/// Writes one JSON object per line
pub struct JsonLinesAuditSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesAuditSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> AuditSink for JsonLinesAuditSink<W> {
    fn record(&self, entry: &AuditEntry) -> EscalationResult<()> {
        let line = serde_json::to_string(entry).map_err(|e| EscalationError::Audit {
            message: format!("serialize: {e}"),
        })?;
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}")
            .and_then(|_| writer.flush())
            .map_err(|e| EscalationError::Audit {
                message: format!("write: {e}"),
            })
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: &AuditEntry) -> EscalationResult<()> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.clone());
        Ok(())
    }
}
