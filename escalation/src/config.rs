//! Engine configuration and file loading
//!
//! Loaded once and validated before an engine is built. Files may be TOML or
//! YAML; each top-level section that is missing keeps its built-in default.
//! A section that is present replaces the default wholesale.
//!
//! ```toml
//! [thresholds.architect]
//! escalate_threshold = 0.6
//! auto_escalate_threshold = 0.9
//!
//! [[catalog.architect]]
//! name = "security"
//! category = "security_factors"
//! weight = 0.5
//! extractor = { kind = "flags", flags = ["authentication", "encryption"] }
//!
//! [pricing]
//! default_rate = 0.015
//! rates = { standard = 0.002, premium = 0.015 }
//! ```

use crate::cost::{ModelRouting, PricingTable};
use crate::criteria::{CriteriaCatalog, Criterion};
use crate::error::{EscalationError, EscalationResult};
use crate::threshold::{RoleThresholds, ThresholdConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Environment variable naming a config file when none is given explicitly
pub const CONFIG_ENV_VAR: &str = "ESCALATION_CONFIG";

/// Everything an engine needs, fixed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ThresholdConfig,
    pub catalog: CriteriaCatalog,
    pub pricing: PricingTable,
    pub routing: ModelRouting,
}

impl EngineConfig {
    /// Override one role's thresholds
    pub fn with_thresholds(mut self, role: impl Into<String>, thresholds: RoleThresholds) -> Self {
        self.thresholds.roles.insert(role.into(), thresholds);
        self
    }

    /// Add or replace a role with its criteria and thresholds together
    pub fn with_role(
        mut self,
        role: impl Into<String>,
        criteria: Vec<Criterion>,
        thresholds: RoleThresholds,
    ) -> Self {
        let role = role.into();
        self.catalog.roles.insert(role.clone(), criteria);
        self.thresholds.roles.insert(role, thresholds);
        self
    }

    pub fn with_pricing(mut self, pricing: PricingTable) -> Self {
        self.pricing = pricing;
        self
    }

    pub fn with_routing(mut self, routing: ModelRouting) -> Self {
        self.routing = routing;
        self
    }

    /// Roles present in the catalog, sorted
    pub fn roles(&self) -> Vec<String> {
        self.catalog.role_names()
    }

    /// Reject any configuration the engine could not use consistently
    pub fn validate(&self) -> EscalationResult<()> {
        let catalog_roles: BTreeSet<&str> = self.catalog.roles.keys().map(String::as_str).collect();
        let threshold_roles: BTreeSet<&str> =
            self.thresholds.roles.keys().map(String::as_str).collect();

        if catalog_roles.is_empty() {
            return Err(EscalationError::invalid("no roles configured"));
        }
        if let Some(role) = catalog_roles.difference(&threshold_roles).next() {
            return Err(EscalationError::invalid(format!(
                "role '{role}' has criteria but no thresholds"
            )));
        }
        if let Some(role) = threshold_roles.difference(&catalog_roles).next() {
            return Err(EscalationError::invalid(format!(
                "role '{role}' has thresholds but no criteria"
            )));
        }

        self.catalog.validate()?;
        self.thresholds.validate()?;
        self.pricing.validate()?;
        self.routing.validate()?;
        Ok(())
    }

    pub fn from_toml_str(raw: &str) -> EscalationResult<Self> {
        toml::from_str(raw).map_err(|e| EscalationError::ConfigParse {
            path: PathBuf::from("<toml>"),
            message: e.to_string(),
        })
    }

    pub fn from_yaml_str(raw: &str) -> EscalationResult<Self> {
        serde_yaml::from_str(raw).map_err(|e| EscalationError::ConfigParse {
            path: PathBuf::from("<yaml>"),
            message: e.to_string(),
        })
    }

    /// Load and validate a config file, picking the format from its extension
    pub fn load(path: &Path) -> EscalationResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        let parse: fn(&str) -> EscalationResult<Self> = match ext.as_deref() {
            Some("toml") => Self::from_toml_str,
            Some("yaml") | Some("yml") => Self::from_yaml_str,
            _ => {
                return Err(EscalationError::UnsupportedConfigFormat {
                    path: path.to_path_buf(),
                })
            }
        };

        let raw = std::fs::read_to_string(path).map_err(|source| EscalationError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = parse(&raw).map_err(|e| match e {
            EscalationError::ConfigParse { message, .. } => EscalationError::ConfigParse {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        config.validate()?;

        tracing::debug!(path = %path.display(), roles = ?config.roles(), "Loaded escalation config");
        Ok(config)
    }

    /// Explicit path, else `$ESCALATION_CONFIG`, else the built-in defaults.
    ///
    /// Every branch returns a validated config.
    pub fn resolve(path: Option<&Path>) -> EscalationResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(p) if !p.trim().is_empty() => Self::load(Path::new(p.trim())),
            _ => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn to_toml_string(&self) -> EscalationResult<String> {
        toml::to_string_pretty(self).map_err(|e| EscalationError::ConfigParse {
            path: PathBuf::from("<toml>"),
            message: e.to_string(),
        })
    }
}
