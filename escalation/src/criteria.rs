//! Criteria catalog — per-role weighted criteria over the task context
//!
//! Each criterion is plain data: a category to read, a weight, and the kind of
//! extraction to apply. One routine ([`Criterion::evaluate`]) interprets all of
//! them, so a catalog can be loaded from a config file and tested on its own.
//!
//! | Extractor | Contribution |
//! |---|---|
//! | `flags` | true declared flags / declared flags |
//! | `severity` | critical 1.0, high 0.75, medium 0.5, low 0.25, absent 0 |
//! | `service_count` | min(1, distinct services / saturation) |

use crate::context::{SeverityLevel, Signal, TaskContext};
use crate::error::{EscalationError, EscalationResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

pub const ARCHITECT: &str = "architect";
pub const INTEGRATOR: &str = "integrator";

/// How a criterion turns its category into a contribution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Extractor {
    /// Fraction of the declared flags that are set to true
    Flags { flags: Vec<String> },
    /// Severity lookup table
    Severity,
    /// Distinct service count, saturating at `saturation`
    ServiceCount { saturation: usize },
}

/// A single named, weighted rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub name: String,
    pub category: String,
    /// Weight in (0, 1]
    pub weight: f64,
    pub extractor: Extractor,
}

/// Outcome of one criterion against one context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub name: String,
    pub category: String,
    pub weight: f64,
    /// Contribution in [0, 1]
    pub contribution: f64,
    /// What matched: flag names, the severity, or the services counted
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched: Vec<String>,
}

impl CriterionScore {
    pub fn met(&self) -> bool {
        self.contribution > 0.0
    }

    /// Reasoning line for a met criterion
    pub fn reason(&self) -> String {
        if self.matched.is_empty() {
            format!("Met {} criteria", self.name)
        } else {
            format!("Met {} criteria: {}", self.name, self.matched.join(", "))
        }
    }
}

/// All criterion scores for one role, in catalog order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleEvaluation {
    pub scores: Vec<CriterionScore>,
    /// Malformed or unrecognised context values that were scored as zero
    pub warnings: Vec<String>,
}

impl RoleEvaluation {
    /// Contribution of a named criterion
    pub fn contribution(&self, name: &str) -> Option<f64> {
        self.scores
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.contribution)
    }

    /// Criterion name → contribution
    pub fn contributions(&self) -> BTreeMap<String, f64> {
        self.scores
            .iter()
            .map(|s| (s.name.clone(), s.contribution))
            .collect()
    }
}

impl Criterion {
    pub fn flags(name: &str, category: &str, weight: f64, flags: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            weight,
            extractor: Extractor::Flags {
                flags: flags.iter().map(|f| f.to_string()).collect(),
            },
        }
    }

    pub fn severity(name: &str, category: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            weight,
            extractor: Extractor::Severity,
        }
    }

    pub fn service_count(name: &str, category: &str, weight: f64, saturation: usize) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            weight,
            extractor: Extractor::ServiceCount { saturation },
        }
    }

    /// Score this criterion against a context.
    ///
    /// Never fails: a missing category scores zero silently, a category of the
    /// wrong shape scores zero and pushes a warning.
    pub fn evaluate(&self, ctx: &TaskContext, warnings: &mut Vec<String>) -> CriterionScore {
        let (contribution, matched) = match (&self.extractor, ctx.get(&self.category)) {
            (_, None) => (0.0, Vec::new()),
            (Extractor::Flags { flags }, Some(Signal::Flags(values))) => {
                let matched: Vec<String> = flags
                    .iter()
                    .filter(|f| values.get(f.as_str()).copied().unwrap_or(false))
                    .cloned()
                    .collect();
                let ratio = if flags.is_empty() {
                    0.0
                } else {
                    matched.len() as f64 / flags.len() as f64
                };
                (ratio, matched)
            }
            (Extractor::Severity, Some(Signal::Severity(raw))) => match SeverityLevel::parse(raw) {
                Some(level) => (level.contribution(), vec![level.to_string()]),
                None => {
                    warnings.push(format!(
                        "{}: unrecognised severity '{}' scored as zero",
                        self.category, raw
                    ));
                    (0.0, Vec::new())
                }
            },
            (Extractor::ServiceCount { saturation }, Some(Signal::Services(services))) => {
                let distinct: BTreeSet<&str> = services
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect();
                let ratio = if *saturation == 0 {
                    0.0
                } else {
                    distinct.len() as f64 / *saturation as f64
                };
                (ratio, distinct.into_iter().map(str::to_string).collect())
            }
            (extractor, Some(signal)) => {
                warnings.push(format!(
                    "{}: expected {} but found {} value, scored as zero",
                    self.category,
                    extractor.expected_shape(),
                    signal.kind()
                ));
                (0.0, Vec::new())
            }
        };

        CriterionScore {
            name: self.name.clone(),
            category: self.category.clone(),
            weight: self.weight,
            contribution: contribution.clamp(0.0, 1.0),
            matched,
        }
    }
}

impl Extractor {
    fn expected_shape(&self) -> &'static str {
        match self {
            Self::Flags { .. } => "flags",
            Self::Severity => "severity",
            Self::ServiceCount { .. } => "services",
        }
    }
}

/// Per-role ordered criteria
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CriteriaCatalog {
    pub roles: BTreeMap<String, Vec<Criterion>>,
}

impl Default for CriteriaCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CriteriaCatalog {
    pub fn empty() -> Self {
        Self {
            roles: BTreeMap::new(),
        }
    }

    /// The architect and integrator catalogs
    pub fn builtin() -> Self {
        Self::empty()
            .with_role(ARCHITECT, architect_criteria())
            .with_role(INTEGRATOR, integrator_criteria())
    }

    /// Add or replace a role's criteria
    pub fn with_role(mut self, role: impl Into<String>, criteria: Vec<Criterion>) -> Self {
        self.roles.insert(role.into(), criteria);
        self
    }

    pub fn criteria(&self, role: &str) -> Option<&[Criterion]> {
        self.roles.get(role).map(Vec::as_slice)
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.keys().cloned().collect()
    }

    /// Evaluate every criterion of `role` against `ctx`
    pub fn evaluate(&self, role: &str, ctx: &TaskContext) -> EscalationResult<RoleEvaluation> {
        let criteria = self
            .criteria(role)
            .ok_or_else(|| EscalationError::UnknownRole {
                role: role.to_string(),
                known: self.role_names(),
            })?;
        Ok(evaluate_criteria(criteria, ctx))
    }

    /// Check weights, extractor parameters and name uniqueness for all roles
    pub fn validate(&self) -> EscalationResult<()> {
        for (role, criteria) in &self.roles {
            validate_role(role, criteria)?;
        }
        Ok(())
    }
}

pub(crate) fn evaluate_criteria(criteria: &[Criterion], ctx: &TaskContext) -> RoleEvaluation {
    let mut warnings = Vec::new();
    let scores = criteria
        .iter()
        .map(|c| c.evaluate(ctx, &mut warnings))
        .collect();
    RoleEvaluation { scores, warnings }
}

fn validate_role(role: &str, criteria: &[Criterion]) -> EscalationResult<()> {
    if role.trim().is_empty() {
        return Err(EscalationError::invalid("role name must not be empty"));
    }
    if criteria.is_empty() {
        return Err(EscalationError::invalid(format!(
            "role '{role}' has no criteria"
        )));
    }

    let mut names = HashSet::new();
    for c in criteria {
        if c.name.trim().is_empty() || c.category.trim().is_empty() {
            return Err(EscalationError::invalid(format!(
                "role '{role}' has a criterion with an empty name or category"
            )));
        }
        if !names.insert(c.name.as_str()) {
            return Err(EscalationError::invalid(format!(
                "role '{role}' defines criterion '{}' more than once",
                c.name
            )));
        }
        if !(c.weight.is_finite() && c.weight > 0.0 && c.weight <= 1.0) {
            return Err(EscalationError::invalid(format!(
                "role '{role}' criterion '{}' weight {} is outside (0, 1]",
                c.name, c.weight
            )));
        }
        match &c.extractor {
            Extractor::Flags { flags } => {
                if flags.is_empty() {
                    return Err(EscalationError::invalid(format!(
                        "role '{role}' criterion '{}' declares no flags",
                        c.name
                    )));
                }
                let distinct: HashSet<&str> = flags.iter().map(String::as_str).collect();
                if distinct.len() != flags.len() {
                    return Err(EscalationError::invalid(format!(
                        "role '{role}' criterion '{}' declares a flag twice",
                        c.name
                    )));
                }
            }
            Extractor::ServiceCount { saturation } if *saturation == 0 => {
                return Err(EscalationError::invalid(format!(
                    "role '{role}' criterion '{}' needs a saturation of at least 1",
                    c.name
                )));
            }
            Extractor::ServiceCount { .. } | Extractor::Severity => {}
        }
    }
    Ok(())
}

/// Security, performance, complexity and service-count signals
pub fn architect_criteria() -> Vec<Criterion> {
    vec![
        Criterion::flags(
            "security",
            "security_factors",
            0.30,
            &[
                "authentication",
                "authorization",
                "encryption",
                "data_privacy",
                "input_validation",
            ],
        ),
        Criterion::flags(
            "performance",
            "performance_factors",
            0.20,
            &[
                "high_throughput",
                "low_latency_required",
                "scalability",
                "caching_strategy",
                "resource_intensive",
            ],
        ),
        Criterion::flags(
            "complexity",
            "complexity_factors",
            0.25,
            &[
                "microservices_coordination",
                "event_driven_design",
                "distributed_transactions",
                "state_management",
                "api_versioning",
            ],
        ),
        Criterion::service_count("service_count", "affected_services", 0.25, 10),
    ]
}

/// Conflict, boundary, integration and risk signals
pub fn integrator_criteria() -> Vec<Criterion> {
    vec![
        Criterion::flags(
            "conflict",
            "conflict_factors",
            0.30,
            &[
                "merge_conflicts",
                "api_contract_changes",
                "schema_changes",
                "dependency_conflicts",
            ],
        ),
        Criterion::flags(
            "boundary",
            "boundary_factors",
            0.25,
            &[
                "cross_service_boundary",
                "shared_data_ownership",
                "public_api_surface",
            ],
        ),
        Criterion::flags(
            "integration",
            "integration_factors",
            0.25,
            &[
                "external_api",
                "message_queue",
                "database_migration",
                "third_party_service",
            ],
        ),
        Criterion::severity("risk", "risk_factors", 0.20),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score(role: &str, ctx: &TaskContext) -> RoleEvaluation {
        CriteriaCatalog::builtin().evaluate(role, ctx).unwrap()
    }

    #[test]
    fn test_builtin_catalog_validates() {
        CriteriaCatalog::builtin().validate().unwrap();
        assert_eq!(
            CriteriaCatalog::builtin().role_names(),
            vec![ARCHITECT.to_string(), INTEGRATOR.to_string()]
        );
    }

    #[test]
    fn test_flag_fraction() {
        let ctx = TaskContext::new().with_flags(
            "security_factors",
            [("authentication", true), ("authorization", true), ("encryption", false)],
        );
        let eval = score(ARCHITECT, &ctx);
        assert!((eval.contribution("security").unwrap() - 0.4).abs() < 1e-12);
        assert_eq!(eval.contribution("performance"), Some(0.0));
        assert!(eval.warnings.is_empty());
    }

    #[test]
    fn test_undeclared_flags_are_ignored() {
        let ctx = TaskContext::new().with_flags("complexity_factors", [("ui_update", true)]);
        let eval = score(ARCHITECT, &ctx);
        assert_eq!(eval.contribution("complexity"), Some(0.0));
        assert!(eval.warnings.is_empty());
    }

    #[test]
    fn test_service_count_saturates_and_dedupes() {
        let services: Vec<String> = (0..25).map(|i| format!("svc-{i}")).collect();
        let eval = score(
            ARCHITECT,
            &TaskContext::new().with_services("affected_services", services),
        );
        assert_eq!(eval.contribution("service_count"), Some(1.0));

        let eval = score(
            ARCHITECT,
            &TaskContext::new().with_services("affected_services", ["console", "console", " "]),
        );
        assert!((eval.contribution("service_count").unwrap() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_severity_lookup() {
        let ctx = TaskContext::new().with_severity("risk_factors", SeverityLevel::High);
        let eval = score(INTEGRATOR, &ctx);
        assert_eq!(eval.contribution("risk"), Some(0.75));
        let risk = eval.scores.iter().find(|s| s.name == "risk").unwrap();
        assert_eq!(risk.reason(), "Met risk criteria: high");
    }

    #[test]
    fn test_wrong_shape_is_zero_with_warning() {
        let ctx = TaskContext::new()
            .with_signal("risk_factors", Signal::Services(vec!["x".to_string()]))
            .with_signal("conflict_factors", Signal::Severity("high".to_string()))
            .with_signal("boundary_factors", Signal::Severity("catastrophic".to_string()));
        let eval = score(INTEGRATOR, &ctx);

        assert_eq!(eval.contribution("risk"), Some(0.0));
        assert_eq!(eval.contribution("conflict"), Some(0.0));
        assert_eq!(eval.contribution("boundary"), Some(0.0));
        assert_eq!(eval.warnings.len(), 3, "{:?}", eval.warnings);

        let ctx = TaskContext::new()
            .with_signal("risk_factors", Signal::Severity("catastrophic".to_string()));
        let eval = score(INTEGRATOR, &ctx);
        assert!(eval.warnings[0].contains("unrecognised severity"));
    }

    #[test]
    fn test_unknown_role() {
        let err = CriteriaCatalog::builtin()
            .evaluate("reviewer", &TaskContext::new())
            .unwrap_err();
        assert!(matches!(err, EscalationError::UnknownRole { .. }));
    }

    #[test]
    fn test_validation_rejects_bad_criteria() {
        let cases = vec![
            vec![Criterion::flags("a", "cat", 0.0, &["x"])],
            vec![Criterion::flags("a", "cat", 1.5, &["x"])],
            vec![Criterion::flags("a", "cat", f64::NAN, &["x"])],
            vec![Criterion::flags("a", "cat", 0.5, &[])],
            vec![Criterion::flags("a", "cat", 0.5, &["x", "x"])],
            vec![Criterion::service_count("a", "cat", 0.5, 0)],
            vec![
                Criterion::severity("a", "cat", 0.5),
                Criterion::severity("a", "other", 0.5),
            ],
            vec![Criterion::severity("", "cat", 0.5)],
            vec![],
        ];
        for criteria in cases {
            let catalog = CriteriaCatalog::empty().with_role("custom", criteria.clone());
            assert!(
                catalog.validate().is_err(),
                "expected rejection for {criteria:?}"
            );
        }
    }

    #[test]
    fn test_catalog_order_is_preserved() {
        let eval = score(INTEGRATOR, &TaskContext::new());
        let names: Vec<&str> = eval.scores.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["conflict", "boundary", "integration", "risk"]);
    }
}
