//! Cost estimation for the selected model tier
//!
//! Prices are USD per 1000 tokens. Unknown models are charged the table's
//! default rate, which is set to the premium price so an unpriced model is
//! never under-estimated.

use crate::error::{EscalationError, EscalationResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Token count assumed when the caller gives none
pub const DEFAULT_TOKENS_ESTIMATED: u64 = 1000;

/// Processing tier a decision routes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Cheap default tier
    Standard,
    /// Higher-capability, higher-cost tier
    Premium,
}

impl ModelTier {
    pub fn for_escalation(should_escalate: bool) -> Self {
        if should_escalate {
            Self::Premium
        } else {
            Self::Standard
        }
    }
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard"),
            Self::Premium => write!(f, "premium"),
        }
    }
}

/// Which model id serves each tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelRouting {
    pub standard_model: String,
    pub premium_model: String,
    /// Token count used when the context carries no estimate
    pub default_tokens: u64,
}

impl Default for ModelRouting {
    fn default() -> Self {
        Self {
            standard_model: "standard".to_string(),
            premium_model: "premium".to_string(),
            default_tokens: DEFAULT_TOKENS_ESTIMATED,
        }
    }
}

impl ModelRouting {
    pub fn model_for(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Standard => &self.standard_model,
            ModelTier::Premium => &self.premium_model,
        }
    }

    pub fn validate(&self) -> EscalationResult<()> {
        if self.standard_model.trim().is_empty() || self.premium_model.trim().is_empty() {
            return Err(EscalationError::invalid(
                "routing model names must not be empty",
            ));
        }
        if self.default_tokens == 0 {
            return Err(EscalationError::invalid(
                "routing default_tokens must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Static price table
///
/// Like [`ModelRouting`], a partial section keeps the built-in value for any
/// field it leaves out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingTable {
    /// Rate for models missing from `rates`
    pub default_rate: f64,
    /// Model id → USD per 1000 tokens
    pub rates: BTreeMap<String, f64>,
}

impl Default for PricingTable {
    fn default() -> Self {
        let mut rates = BTreeMap::new();
        rates.insert("standard".to_string(), 0.002);
        rates.insert("premium".to_string(), 0.015);
        Self {
            default_rate: 0.015,
            rates,
        }
    }
}

impl PricingTable {
    pub fn rate_for(&self, model: &str) -> f64 {
        self.rates.get(model).copied().unwrap_or(self.default_rate)
    }

    /// Estimated USD cost for `tokens` on `model`; `None` means
    /// [`DEFAULT_TOKENS_ESTIMATED`]. Never negative.
    pub fn estimate_cost(&self, model: &str, tokens: Option<u64>) -> f64 {
        let tokens = tokens.unwrap_or(DEFAULT_TOKENS_ESTIMATED);
        let cost = self.rate_for(model) * tokens as f64 / 1000.0;
        if cost.is_finite() {
            cost.max(0.0)
        } else {
            0.0
        }
    }

    pub fn validate(&self) -> EscalationResult<()> {
        let valid = |r: f64| r.is_finite() && r >= 0.0;
        if !valid(self.default_rate) {
            return Err(EscalationError::invalid(format!(
                "pricing default_rate {} must be a non-negative number",
                self.default_rate
            )));
        }
        if let Some((model, rate)) = self.rates.iter().find(|(_, r)| !valid(**r)) {
            return Err(EscalationError::invalid(format!(
                "pricing rate {rate} for model '{model}' must be a non-negative number"
            )));
        }
        Ok(())
    }
}
