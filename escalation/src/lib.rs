//! Escalation Decision Engine
//!
//! Decides whether a task should move from a cheap default model tier to an
//! expensive, more capable one. The decision is a pure function of the
//! reviewing role, the task's context signals and the engine configuration:
//!
//! ```text
//! (role, task_id, context)
//!     │
//!     ├─ criteria   per-role weighted criteria → contribution per criterion
//!     ├─ scorer     Σ(weight · contribution) / Σ(weight) → total score
//!     ├─ threshold  score vs escalate / auto-escalate thresholds → verdict
//!     ├─ cost       verdict → model tier → USD estimate
//!     ▼
//! EscalationDecision (immutable, serializable)
//! ```
//!
//! # Usage
//!
//! ```
//! use escalation_engine::{EscalationEngine, TaskContext};
//!
//! let engine = EscalationEngine::new();
//! let ctx = TaskContext::new()
//!     .with_services("affected_services", ["orchestrator", "console"])
//!     .with_flags("security_factors", [("authentication", true)]);
//!
//! let decision = engine
//!     .make_escalation_decision("architect", "TASK-42", &ctx)
//!     .unwrap();
//! assert!(!decision.should_escalate);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod audit;
pub mod config;
pub mod context;
pub mod cost;
pub mod criteria;
pub mod engine;
pub mod error;
pub mod scorer;
pub mod summary;
pub mod threshold;
pub mod triggers;

// Re-export the decision entry point
pub use engine::{EscalationDecision, EscalationEngine, SharedEngine};

// Re-export configuration types
pub use config::{EngineConfig, CONFIG_ENV_VAR};
pub use cost::{ModelRouting, ModelTier, PricingTable, DEFAULT_TOKENS_ESTIMATED};
pub use criteria::{
    CriteriaCatalog, Criterion, CriterionScore, Extractor, RoleEvaluation, ARCHITECT, INTEGRATOR,
};
pub use threshold::{Confidence, EscalationType, RoleThresholds, ThresholdConfig, ThresholdOutcome};

// Re-export context types
pub use context::{SeverityLevel, Signal, TaskContext, TokenEstimate};

// Re-export scoring types
pub use scorer::{ScoreBreakdown, NO_CRITERIA_MET};

// Re-export error types
pub use error::{EscalationError, EscalationResult};

// Re-export audit and summary types
pub use audit::{AuditEntry, AuditSink, JsonLinesAuditSink, MemoryAuditSink, TracingAuditSink};
pub use summary::{DecisionSummary, RoleSummary};
pub use triggers::infer_context;
