//! Aggregate statistics over a set of decisions
//!
//! Useful for dashboards and for tuning thresholds: if the escalation rate for
//! a role drifts far from what the budget allows, its threshold is likely off.

use crate::engine::EscalationDecision;
use crate::threshold::EscalationType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-role slice of a [`DecisionSummary`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleSummary {
    pub decisions: usize,
    pub escalated: usize,
    pub mean_score: f64,
    pub total_cost: f64,
}

/// Counts, rates and costs across decisions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionSummary {
    pub total: usize,
    pub escalated: usize,
    pub recommended: usize,
    pub auto: usize,
    /// escalated / total (0.0 when empty)
    pub escalation_rate: f64,
    pub total_cost: f64,
    pub mean_cost: f64,
    pub by_role: BTreeMap<String, RoleSummary>,
}

impl DecisionSummary {
    /// Summarize `decisions`. Returns an all-zero summary for an empty slice.
    pub fn from_decisions(decisions: &[EscalationDecision]) -> Self {
        if decisions.is_empty() {
            return Self::default();
        }

        let mut summary = Self {
            total: decisions.len(),
            ..Default::default()
        };
        let mut score_sums: BTreeMap<String, f64> = BTreeMap::new();

        for d in decisions {
            match d.escalation_type {
                EscalationType::Auto => summary.auto += 1,
                EscalationType::Recommended => summary.recommended += 1,
                EscalationType::NoEscalation => {}
            }
            if d.should_escalate {
                summary.escalated += 1;
            }
            summary.total_cost += d.cost_estimate;

            let role = summary.by_role.entry(d.role.clone()).or_default();
            role.decisions += 1;
            role.total_cost += d.cost_estimate;
            if d.should_escalate {
                role.escalated += 1;
            }
            *score_sums.entry(d.role.clone()).or_insert(0.0) += d.total_score;
        }

        let n = summary.total as f64;
        summary.escalation_rate = summary.escalated as f64 / n;
        summary.mean_cost = summary.total_cost / n;
        for (role, stats) in summary.by_role.iter_mut() {
            if let Some(sum) = score_sums.get(role) {
                stats.mean_score = sum / stats.decisions as f64;
            }
        }
        summary
    }
}
