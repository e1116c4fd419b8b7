//! Threshold policy — turns a score into an escalation verdict
//!
//! ```text
//! score ≥ auto_escalate_threshold          → auto
//! escalate_threshold ≤ score < auto ceiling → recommended
//! score < escalate_threshold               → none
//! ```
//!
//! Confidence is banded on `d = score - escalate_threshold`:
//! `d < 0` low, `d < 0.15` medium, `d < 0.30` high, otherwise very high.

use crate::criteria::{ARCHITECT, INTEGRATOR};
use crate::error::{EscalationError, EscalationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lower edge of the `high` confidence band
pub const HIGH_CONFIDENCE_MARGIN: f64 = 0.15;
/// Lower edge of the `very_high` confidence band
pub const VERY_HIGH_CONFIDENCE_MARGIN: f64 = 0.30;

/// Kind of escalation a decision carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EscalationType {
    /// Stay on the default tier
    #[serde(rename = "none")]
    NoEscalation,
    /// Escalate, but below the auto ceiling
    Recommended,
    /// At or above the auto ceiling
    Auto,
}

impl std::fmt::Display for EscalationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoEscalation => write!(f, "none"),
            Self::Recommended => write!(f, "recommended"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

/// Qualitative confidence in the verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Confidence {
    /// Band a signed distance from the escalate threshold
    pub fn from_distance(d: f64) -> Self {
        if d < 0.0 {
            Self::Low
        } else if d < HIGH_CONFIDENCE_MARGIN {
            Self::Medium
        } else if d < VERY_HIGH_CONFIDENCE_MARGIN {
            Self::High
        } else {
            Self::VeryHigh
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::VeryHigh => write!(f, "very_high"),
        }
    }
}

/// Cutoffs for one role
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoleThresholds {
    pub escalate_threshold: f64,
    pub auto_escalate_threshold: f64,
}

/// Verdict derived from a score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdOutcome {
    pub should_escalate: bool,
    pub escalation_type: EscalationType,
    pub confidence: Confidence,
}

impl RoleThresholds {
    pub fn new(escalate_threshold: f64, auto_escalate_threshold: f64) -> Self {
        Self {
            escalate_threshold,
            auto_escalate_threshold,
        }
    }

    pub fn decide(&self, total_score: f64) -> ThresholdOutcome {
        let escalation_type = if total_score >= self.auto_escalate_threshold {
            EscalationType::Auto
        } else if total_score >= self.escalate_threshold {
            EscalationType::Recommended
        } else {
            EscalationType::NoEscalation
        };
        ThresholdOutcome {
            should_escalate: escalation_type != EscalationType::NoEscalation,
            escalation_type,
            confidence: Confidence::from_distance(total_score - self.escalate_threshold),
        }
    }

    fn validate(&self, role: &str) -> EscalationResult<()> {
        let in_unit = |v: f64| v.is_finite() && (0.0..=1.0).contains(&v);
        if !in_unit(self.escalate_threshold) || !in_unit(self.auto_escalate_threshold) {
            return Err(EscalationError::invalid(format!(
                "role '{role}' thresholds ({}, {}) must lie in [0, 1]",
                self.escalate_threshold, self.auto_escalate_threshold
            )));
        }
        if self.auto_escalate_threshold < self.escalate_threshold {
            return Err(EscalationError::invalid(format!(
                "role '{role}' auto_escalate_threshold {} is below escalate_threshold {}",
                self.auto_escalate_threshold, self.escalate_threshold
            )));
        }
        Ok(())
    }
}

/// Per-role thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThresholdConfig {
    pub roles: BTreeMap<String, RoleThresholds>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self::empty()
            .with_role(ARCHITECT, RoleThresholds::new(0.75, 0.90))
            .with_role(INTEGRATOR, RoleThresholds::new(0.80, 0.90))
    }
}

impl ThresholdConfig {
    pub fn empty() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    pub fn with_role(mut self, role: impl Into<String>, thresholds: RoleThresholds) -> Self {
        self.roles.insert(role.into(), thresholds);
        self
    }

    pub fn get(&self, role: &str) -> Option<&RoleThresholds> {
        self.roles.get(role)
    }

    pub fn decide(&self, role: &str, total_score: f64) -> EscalationResult<ThresholdOutcome> {
        self.get(role)
            .map(|t| t.decide(total_score))
            .ok_or_else(|| EscalationError::UnknownRole {
                role: role.to_string(),
                known: self.roles.keys().cloned().collect(),
            })
    }

    pub fn validate(&self) -> EscalationResult<()> {
        for (role, thresholds) in &self.roles {
            thresholds.validate(role)?;
        }
        Ok(())
    }
}
