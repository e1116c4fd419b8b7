//! Weighted scoring of criterion contributions
//!
//! `total = Σ(weight · contribution) / Σ(weight)` over the role's whole
//! catalog. Every criterion is always applicable, so the denominator is fixed
//! per role and the total stays in [0, 1].

use crate::context::TaskContext;
use crate::criteria::{CriteriaCatalog, CriterionScore, RoleEvaluation};
use crate::error::EscalationResult;
use serde::{Deserialize, Serialize};

/// Sentinel reasoning line for a context that met nothing
pub const NO_CRITERIA_MET: &str = "No escalation criteria met";

/// Total score plus the evidence behind it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub total_score: f64,
    /// One line per met criterion in catalog order, or the sentinel
    pub reasoning: Vec<String>,
    pub evaluation: RoleEvaluation,
}

impl ScoreBreakdown {
    /// Build the breakdown from an already computed evaluation
    pub fn from_evaluation(evaluation: RoleEvaluation) -> Self {
        let total_score = weighted_total(&evaluation.scores);
        let mut reasoning: Vec<String> = evaluation
            .scores
            .iter()
            .filter(|s| s.met())
            .map(CriterionScore::reason)
            .collect();
        if reasoning.is_empty() {
            reasoning.push(NO_CRITERIA_MET.to_string());
        }
        Self {
            total_score,
            reasoning,
            evaluation,
        }
    }

    pub fn any_met(&self) -> bool {
        self.evaluation.scores.iter().any(CriterionScore::met)
    }
}

/// Weighted mean of contributions, clamped to [0, 1]
pub fn weighted_total(scores: &[CriterionScore]) -> f64 {
    let (numerator, denominator) = scores.iter().fold((0.0_f64, 0.0_f64), |(n, d), s| {
        (n + s.weight * s.contribution, d + s.weight)
    });
    if denominator <= 0.0 {
        return 0.0;
    }
    (numerator / denominator).clamp(0.0, 1.0)
}

/// Score `ctx` for `role` using `catalog`
pub fn score(
    catalog: &CriteriaCatalog,
    role: &str,
    ctx: &TaskContext,
) -> EscalationResult<ScoreBreakdown> {
    let evaluation = catalog.evaluate(role, ctx)?;
    Ok(ScoreBreakdown::from_evaluation(evaluation))
}
