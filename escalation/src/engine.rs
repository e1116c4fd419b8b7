//! Escalation Engine — deterministic decision assembly
//!
//! Ties the catalog, scorer, threshold policy and cost estimator into the one
//! public entry point, [`EscalationEngine::make_escalation_decision`]. The
//! engine is immutable once built; [`SharedEngine`] swaps whole engines when
//! configuration changes so readers never see a half-updated catalog.

use crate::audit::{AuditEntry, AuditSink};
use crate::config::EngineConfig;
use crate::context::TaskContext;
use crate::cost::ModelTier;
use crate::criteria::CriterionScore;
use crate::error::{EscalationError, EscalationResult};
use crate::scorer::{self, ScoreBreakdown};
use crate::threshold::{Confidence, EscalationType, RoleThresholds};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info, warn};

/// Decision produced by the Escalation Engine
///
/// Built once per call and never mutated. Contains no wall-clock data, so two
/// calls with the same inputs serialize identically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationDecision {
    /// Reviewing role the decision was made for
    pub role: String,
    /// Caller's task identifier, echoed verbatim
    pub task_id: String,
    /// Normalized weighted score in [0, 1]
    pub total_score: f64,
    pub should_escalate: bool,
    pub escalation_type: EscalationType,
    pub confidence: Confidence,
    /// Met criteria in catalog order, or the "no criteria met" sentinel
    pub reasoning: Vec<String>,
    /// Estimated USD cost on the selected model
    pub cost_estimate: f64,
    pub selected_model: String,
    pub tier: ModelTier,
    /// Token count the cost was computed from
    pub tokens_estimated: u64,
    /// Thresholds the score was compared against
    pub thresholds: RoleThresholds,
    /// Per-criterion breakdown
    pub criteria: Vec<CriterionScore>,
    /// Context values that were malformed and scored as zero or replaced by a default
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EscalationDecision {
    /// Compact one-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "task={} role={} score={:.3} type={} confidence={} model={} cost=${:.4}",
            self.task_id,
            self.role,
            self.total_score,
            self.escalation_type,
            self.confidence,
            self.selected_model,
            self.cost_estimate
        )
    }
}

/// Scores contexts and assembles decisions over an immutable configuration
#[derive(Debug, Clone)]
pub struct EscalationEngine {
    config: EngineConfig,
}

impl EscalationEngine {
    /// Create an engine with the built-in catalogs, thresholds and pricing
    pub fn new() -> Self {
        // Built-in defaults always pass `EngineConfig::validate`.
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Create with custom config, failing fast if it is inconsistent
    pub fn with_config(config: EngineConfig) -> EscalationResult<Self> {
        config.validate()?;
        info!(roles = ?config.roles(), "Escalation engine configured");
        Ok(Self { config })
    }

    /// Build from [`EngineConfig::resolve`], which has already validated
    pub fn resolve(path: Option<&Path>) -> EscalationResult<Self> {
        let config = EngineConfig::resolve(path)?;
        info!(roles = ?config.roles(), "Escalation engine configured");
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn roles(&self) -> Vec<String> {
        self.config.roles()
    }

    fn thresholds_for(&self, role: &str) -> EscalationResult<RoleThresholds> {
        self.config
            .thresholds
            .get(role)
            .copied()
            .ok_or_else(|| EscalationError::UnknownRole {
                role: role.to_string(),
                known: self.roles(),
            })
    }

    /// Score a context without deciding
    pub fn score(&self, role: &str, ctx: &TaskContext) -> EscalationResult<ScoreBreakdown> {
        scorer::score(&self.config.catalog, role, ctx)
    }

    /// Estimated cost of running `tokens` on `model`
    pub fn estimate_cost(&self, model: &str, tokens: Option<u64>) -> f64 {
        self.config
            .pricing
            .estimate_cost(model, Some(tokens.unwrap_or(self.config.routing.default_tokens)))
    }

    /// Decide whether `task_id` should escalate for `role`.
    ///
    /// Fails only for an unknown role. Malformed context values score zero
    /// and are listed in `warnings`.
    pub fn make_escalation_decision(
        &self,
        role: &str,
        task_id: &str,
        ctx: &TaskContext,
    ) -> EscalationResult<EscalationDecision> {
        let thresholds = self.thresholds_for(role)?;
        let breakdown = self.score(role, ctx)?;
        let outcome = thresholds.decide(breakdown.total_score);

        let tier = ModelTier::for_escalation(outcome.should_escalate);
        let selected_model = self.config.routing.model_for(tier).to_string();
        let tokens_estimated = ctx
            .tokens()
            .unwrap_or(self.config.routing.default_tokens);
        let cost_estimate = self
            .config
            .pricing
            .estimate_cost(&selected_model, Some(tokens_estimated));

        let ScoreBreakdown {
            total_score,
            reasoning,
            mut evaluation,
        } = breakdown;

        if let Some(raw) = ctx.malformed_tokens() {
            evaluation.warnings.push(format!(
                "tokens_estimated: expected a non-negative integer but found {raw}, using {tokens_estimated}"
            ));
        }
        for w in &evaluation.warnings {
            warn!(task_id, role, "{}", w);
        }

        let decision = EscalationDecision {
            role: role.to_string(),
            task_id: task_id.to_string(),
            total_score,
            should_escalate: outcome.should_escalate,
            escalation_type: outcome.escalation_type,
            confidence: outcome.confidence,
            reasoning,
            cost_estimate,
            selected_model,
            tier,
            tokens_estimated,
            thresholds,
            criteria: evaluation.scores,
            warnings: evaluation.warnings,
        };

        debug!(
            task_id,
            role,
            score = decision.total_score,
            escalation = %decision.escalation_type,
            confidence = %decision.confidence,
            "Escalation decision made"
        );
        Ok(decision)
    }

    /// Decide, then hand the decision to `sink`.
    ///
    /// A sink failure is returned as an error; the decision is not.
    pub fn decide_and_record(
        &self,
        role: &str,
        task_id: &str,
        ctx: &TaskContext,
        sink: &dyn AuditSink,
    ) -> EscalationResult<EscalationDecision> {
        let decision = self.make_escalation_decision(role, task_id, ctx)?;
        sink.record(&AuditEntry::now(decision.clone()))?;
        Ok(decision)
    }

    /// Decide for several tasks of the same role, stopping at the first error
    pub fn decide_batch<'a, I>(&self, role: &str, tasks: I) -> EscalationResult<Vec<EscalationDecision>>
    where
        I: IntoIterator<Item = (&'a str, &'a TaskContext)>,
    {
        tasks
            .into_iter()
            .map(|(task_id, ctx)| self.make_escalation_decision(role, task_id, ctx))
            .collect()
    }
}

impl Default for EscalationEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Engine handle whose configuration can be replaced at runtime
///
/// Readers take an `Arc` snapshot; a reload builds and validates a complete
/// new engine before swapping it in.
pub struct SharedEngine {
    inner: RwLock<Arc<EscalationEngine>>,
}

impl SharedEngine {
    pub fn new(engine: EscalationEngine) -> Self {
        Self {
            inner: RwLock::new(Arc::new(engine)),
        }
    }

    /// Snapshot of the engine currently in service
    pub fn current(&self) -> Arc<EscalationEngine> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Validate `config` and swap it in. On error the old engine stays live.
    pub fn replace(&self, config: EngineConfig) -> EscalationResult<()> {
        let engine = Arc::new(EscalationEngine::with_config(config)?);
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = engine;
        info!("Escalation engine configuration replaced");
        Ok(())
    }

    pub fn make_escalation_decision(
        &self,
        role: &str,
        task_id: &str,
        ctx: &TaskContext,
    ) -> EscalationResult<EscalationDecision> {
        self.current().make_escalation_decision(role, task_id, ctx)
    }
}

impl Default for SharedEngine {
    fn default() -> Self {
        Self::new(EscalationEngine::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::MemoryAuditSink;
    use crate::context::SeverityLevel;
    use crate::criteria::{ARCHITECT, INTEGRATOR};
    use crate::scorer::NO_CRITERIA_MET;

    fn loaded_integrator_ctx() -> TaskContext {
        TaskContext::new()
            .with_flags(
                "conflict_factors",
                [
                    ("merge_conflicts", true),
                    ("api_contract_changes", true),
                    ("schema_changes", true),
                    ("dependency_conflicts", true),
                ],
            )
            .with_flags(
                "boundary_factors",
                [
                    ("cross_service_boundary", true),
                    ("shared_data_ownership", true),
                    ("public_api_surface", true),
                ],
            )
            .with_flags(
                "integration_factors",
                [
                    ("external_api", true),
                    ("message_queue", true),
                    ("database_migration", true),
                    ("third_party_service", true),
                ],
            )
            .with_severity("risk_factors", SeverityLevel::Critical)
    }

    #[test]
    fn test_engine_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EscalationEngine>();
        assert_send_sync::<SharedEngine>();
    }

    #[test]
    fn test_empty_context_does_not_escalate() {
        let engine = EscalationEngine::new();
        let d = engine
            .make_escalation_decision(ARCHITECT, "task-empty", &TaskContext::new())
            .unwrap();

        assert_eq!(d.total_score, 0.0);
        assert!(!d.should_escalate);
        assert_eq!(d.escalation_type, EscalationType::NoEscalation);
        assert_eq!(d.confidence, Confidence::Low);
        assert_eq!(d.reasoning, vec![NO_CRITERIA_MET.to_string()]);
        assert_eq!(d.selected_model, "standard");
        assert_eq!(d.tier, ModelTier::Standard);
        assert!((d.cost_estimate - 0.002).abs() < 1e-12);
        assert_eq!(d.tokens_estimated, 1000);
    }

    #[test]
    fn test_fully_loaded_integrator_auto_escalates() {
        let engine = EscalationEngine::new();
        let d = engine
            .make_escalation_decision(INTEGRATOR, "task-merge", &loaded_integrator_ctx())
            .unwrap();

        assert!((d.total_score - 1.0).abs() < 1e-12);
        assert!(d.should_escalate);
        assert_eq!(d.escalation_type, EscalationType::Auto);
        assert_eq!(d.confidence, Confidence::High);
        assert_eq!(d.selected_model, "premium");
        assert_eq!(d.reasoning.len(), 4);
        assert_eq!(d.reasoning[3], "Met risk criteria: critical");
    }

    #[test]
    fn test_tokens_drive_cost() {
        let engine = EscalationEngine::new();
        let ctx = loaded_integrator_ctx().with_tokens(10_000);
        let d = engine
            .make_escalation_decision(INTEGRATOR, "task-big", &ctx)
            .unwrap();
        assert_eq!(d.tokens_estimated, 10_000);
        assert!((d.cost_estimate - 0.15).abs() < 1e-12);
        assert!((engine.estimate_cost("premium", Some(10_000)) - d.cost_estimate).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_role_fails_fast() {
        let engine = EscalationEngine::new();
        let err = engine
            .make_escalation_decision("designer", "task-1", &TaskContext::new())
            .unwrap_err();
        match err {
            EscalationError::UnknownRole { role, known } => {
                assert_eq!(role, "designer");
                assert_eq!(known, vec![ARCHITECT.to_string(), INTEGRATOR.to_string()]);
            }
            other => panic!("Expected UnknownRole, got {other:?}"),
        }
    }

    #[test]
    fn test_with_config_rejects_invalid() {
        let cfg = EngineConfig::default().with_thresholds(ARCHITECT, RoleThresholds::new(0.9, 0.5));
        assert!(EscalationEngine::with_config(cfg).is_err());
    }

    #[test]
    fn test_decide_and_record() {
        let engine = EscalationEngine::new();
        let sink = MemoryAuditSink::new();
        let d = engine
            .decide_and_record(INTEGRATOR, "task-audit", &loaded_integrator_ctx(), &sink)
            .unwrap();

        let entries = sink.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].decision, d);
    }

    #[test]
    fn test_decide_batch() {
        let engine = EscalationEngine::new();
        let empty = TaskContext::new();
        let loaded = loaded_integrator_ctx();
        let decisions = engine
            .decide_batch(INTEGRATOR, [("a", &empty), ("b", &loaded)])
            .unwrap();
        assert_eq!(decisions.len(), 2);
        assert!(!decisions[0].should_escalate);
        assert!(decisions[1].should_escalate);
    }

    #[test]
    fn test_shared_engine_swap() {
        let shared = SharedEngine::default();
        let before = shared.current();

        // Lower the integrator bar so an empty-ish context escalates
        let cfg = EngineConfig::default().with_thresholds(INTEGRATOR, RoleThresholds::new(0.0, 1.0));
        shared.replace(cfg).unwrap();

        let d = shared
            .make_escalation_decision(INTEGRATOR, "t", &TaskContext::new())
            .unwrap();
        assert!(d.should_escalate);
        assert_eq!(d.escalation_type, EscalationType::Recommended);

        // Old snapshot is untouched
        let old = before
            .make_escalation_decision(INTEGRATOR, "t", &TaskContext::new())
            .unwrap();
        assert!(!old.should_escalate);
    }

    #[test]
    fn test_shared_engine_keeps_old_config_on_error() {
        let shared = SharedEngine::default();
        let bad = EngineConfig::default().with_thresholds("ghost", RoleThresholds::new(0.5, 0.9));
        assert!(shared.replace(bad).is_err());
        assert_eq!(shared.current().roles().len(), 2);
    }

    #[test]
    fn test_readers_see_whole_configs_during_reload() {
        let old = RoleThresholds::new(0.80, 0.90);
        let new = RoleThresholds::new(0.30, 0.60);
        let shared = SharedEngine::default();
        let ctx = loaded_integrator_ctx();

        std::thread::scope(|s| {
            for reader in 0..4 {
                let shared = &shared;
                let ctx = &ctx;
                s.spawn(move || {
                    for i in 0..200 {
                        let task_id = format!("reader-{reader}-{i}");
                        let d = shared
                            .make_escalation_decision(INTEGRATOR, &task_id, ctx)
                            .unwrap();
                        assert!(
                            d.thresholds == old || d.thresholds == new,
                            "mixed thresholds {:?}",
                            d.thresholds
                        );
                        assert_eq!(d.should_escalate, d.total_score >= d.thresholds.escalate_threshold);
                        assert_eq!(
                            d.escalation_type == EscalationType::Auto,
                            d.total_score >= d.thresholds.auto_escalate_threshold
                        );
                    }
                });
            }

            let shared = &shared;
            s.spawn(move || {
                for i in 0..100 {
                    let thresholds = if i % 2 == 0 { new } else { old };
                    shared
                        .replace(EngineConfig::default().with_thresholds(INTEGRATOR, thresholds))
                        .unwrap();
                }
            });
        });

        // 100 swaps ending on an odd index leave the original thresholds live
        assert_eq!(shared.current().config().thresholds.get(INTEGRATOR), Some(&old));
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_malformed_values_are_logged_as_warnings() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::WARN)
            .finish();

        let ctx = TaskContext::new()
            .with_signal("risk_factors", crate::context::Signal::Severity("apocalyptic".to_string()));
        let d = tracing::subscriber::with_default(subscriber, || {
            EscalationEngine::new()
                .make_escalation_decision(INTEGRATOR, "task-noisy", &ctx)
                .unwrap()
        });
        assert_eq!(d.warnings.len(), 1);

        let out = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(out.contains("WARN"), "{out}");
        assert!(out.contains("unrecognised severity 'apocalyptic'"), "{out}");
        assert!(out.contains("task-noisy"), "{out}");
        assert!(!out.contains("Escalation decision made"), "{out}");
    }

    #[test]
    fn test_summary_line() {
        let d = EscalationEngine::new()
            .make_escalation_decision(ARCHITECT, "task-9", &TaskContext::new())
            .unwrap();
        let line = d.summary();
        assert!(line.contains("task=task-9"), "{line}");
        assert!(line.contains("type=none"), "{line}");
    }
}
