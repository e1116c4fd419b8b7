//! Keyword triggers — build a context from a free-text task description
//!
//! A convenience for callers that have a ticket title or summary but no
//! structured signals. Each rule maps a handful of keywords onto one flag of
//! the built-in catalogs; the risk severity is the highest level whose
//! keywords appear. The engine itself never calls this.
//!
//! ```text
//! "Add OAuth login and encrypt tokens at rest"
//!   → security_factors.authentication, security_factors.encryption
//! ```

use crate::context::{SeverityLevel, TaskContext};

struct KeywordRule {
    category: &'static str,
    flag: &'static str,
    keywords: &'static [&'static str],
}

const FLAG_RULES: &[KeywordRule] = &[
    // security_factors
    KeywordRule {
        category: "security_factors",
        flag: "authentication",
        keywords: &["authentication", "login", "oauth", "sso", "jwt", "password", "mfa"],
    },
    KeywordRule {
        category: "security_factors",
        flag: "authorization",
        keywords: &["authorization", "permission", "rbac", "access control", "role-based"],
    },
    KeywordRule {
        category: "security_factors",
        flag: "encryption",
        keywords: &["encrypt", "tls", "certificate", "secret", "key rotation"],
    },
    KeywordRule {
        category: "security_factors",
        flag: "data_privacy",
        keywords: &["pii", "gdpr", "privacy", "personal data"],
    },
    KeywordRule {
        category: "security_factors",
        flag: "input_validation",
        keywords: &["validation", "sanitiz", "injection", "xss", "csrf"],
    },
    // performance_factors
    KeywordRule {
        category: "performance_factors",
        flag: "high_throughput",
        keywords: &["throughput", "requests per second", "rps", "bulk"],
    },
    KeywordRule {
        category: "performance_factors",
        flag: "low_latency_required",
        keywords: &["latency", "real-time", "realtime", "p99"],
    },
    KeywordRule {
        category: "performance_factors",
        flag: "scalability",
        keywords: &["scalab", "scale out", "horizontal scaling", "autoscal"],
    },
    KeywordRule {
        category: "performance_factors",
        flag: "caching_strategy",
        keywords: &["cache", "caching", "memoiz"],
    },
    KeywordRule {
        category: "performance_factors",
        flag: "resource_intensive",
        keywords: &["memory usage", "cpu-bound", "cpu bound", "resource intensive"],
    },
    // complexity_factors
    KeywordRule {
        category: "complexity_factors",
        flag: "microservices_coordination",
        keywords: &["microservice", "service mesh", "cross-service", "orchestrat"],
    },
    KeywordRule {
        category: "complexity_factors",
        flag: "event_driven_design",
        keywords: &["event-driven", "event driven", "pub/sub", "pubsub", "event bus"],
    },
    KeywordRule {
        category: "complexity_factors",
        flag: "distributed_transactions",
        keywords: &["distributed transaction", "saga", "two-phase commit", "2pc"],
    },
    KeywordRule {
        category: "complexity_factors",
        flag: "state_management",
        keywords: &["state machine", "state management", "session state"],
    },
    KeywordRule {
        category: "complexity_factors",
        flag: "api_versioning",
        keywords: &["api version", "versioned api", "v2 api", "deprecat"],
    },
    // conflict_factors
    KeywordRule {
        category: "conflict_factors",
        flag: "merge_conflicts",
        keywords: &["merge conflict", "rebase", "conflicting change"],
    },
    KeywordRule {
        category: "conflict_factors",
        flag: "api_contract_changes",
        keywords: &["breaking change", "contract change", "api contract"],
    },
    KeywordRule {
        category: "conflict_factors",
        flag: "schema_changes",
        keywords: &["schema change", "alter table", "new column", "drop column"],
    },
    KeywordRule {
        category: "conflict_factors",
        flag: "dependency_conflicts",
        keywords: &["dependency conflict", "version conflict", "dependency upgrade"],
    },
    // boundary_factors
    KeywordRule {
        category: "boundary_factors",
        flag: "cross_service_boundary",
        keywords: &["cross-service", "service boundary", "between services"],
    },
    KeywordRule {
        category: "boundary_factors",
        flag: "shared_data_ownership",
        keywords: &["shared database", "shared table", "shared data"],
    },
    KeywordRule {
        category: "boundary_factors",
        flag: "public_api_surface",
        keywords: &["public api", "sdk", "external consumers"],
    },
    // integration_factors
    KeywordRule {
        category: "integration_factors",
        flag: "external_api",
        keywords: &["external api", "webhook", "rest client", "graphql"],
    },
    KeywordRule {
        category: "integration_factors",
        flag: "message_queue",
        keywords: &["queue", "kafka", "rabbitmq", "nats", "sqs"],
    },
    KeywordRule {
        category: "integration_factors",
        flag: "database_migration",
        keywords: &["migration", "migrate", "alembic", "backfill"],
    },
    KeywordRule {
        category: "integration_factors",
        flag: "third_party_service",
        keywords: &["third-party", "third party", "vendor", "stripe", "twilio"],
    },
];

/// Checked from most to least severe; the first hit wins
const SEVERITY_KEYWORDS: &[(SeverityLevel, &[&str])] = &[
    (
        SeverityLevel::Critical,
        &["outage", "data loss", "security breach", "production down", "sev1"],
    ),
    (
        SeverityLevel::High,
        &["production", "customer-facing", "hotfix", "urgent"],
    ),
    (SeverityLevel::Medium, &["staging", "regression", "rollback"]),
    (SeverityLevel::Low, &["cosmetic", "typo", "docs", "readme"]),
];

/// Category written for inferred severities
pub const RISK_CATEGORY: &str = "risk_factors";
/// Category written for caller-supplied services
pub const SERVICES_CATEGORY: &str = "affected_services";

/// Build a context from a description and the services it touches.
///
/// Only matched flags are written (as `true`); unmatched text adds nothing.
pub fn infer_context(description: &str, affected_services: &[String]) -> TaskContext {
    let desc = description.to_lowercase();
    let mut ctx = TaskContext::new();

    for rule in FLAG_RULES {
        if rule.keywords.iter().any(|k| desc.contains(k)) {
            ctx.set_flag(rule.category, rule.flag, true);
        }
    }

    if let Some(level) = infer_severity(&desc) {
        ctx = ctx.with_severity(RISK_CATEGORY, level);
    }

    if !affected_services.is_empty() {
        ctx = ctx.with_services(SERVICES_CATEGORY, affected_services.iter().cloned());
    }

    ctx
}

/// Highest severity whose keywords appear in `description`
pub fn infer_severity(description: &str) -> Option<SeverityLevel> {
    let desc = description.to_lowercase();
    SEVERITY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| desc.contains(k)))
        .map(|(level, _)| *level)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Signal;
    use crate::criteria::{CriteriaCatalog, Extractor};

    fn flags_of<'a>(ctx: &'a TaskContext, category: &str) -> Vec<&'a str> {
        match ctx.get(category) {
            Some(Signal::Flags(f)) => f
                .iter()
                .filter(|(_, v)| **v)
                .map(|(k, _)| k.as_str())
                .collect(),
            _ => vec![],
        }
    }

    #[test]
    fn test_security_keywords() {
        let ctx = infer_context("Add OAuth login and encrypt tokens at rest", &[]);
        assert_eq!(
            flags_of(&ctx, "security_factors"),
            vec!["authentication", "encryption"]
        );
        assert!(ctx.get(SERVICES_CATEGORY).is_none());
    }

    #[test]
    fn test_plain_ui_task_infers_nothing() {
        let ctx = infer_context("Change button colour on the settings page", &[]);
        assert!(ctx.is_empty(), "{ctx:?}");
    }

    #[test]
    fn test_severity_prefers_highest() {
        assert_eq!(
            infer_severity("Production outage after hotfix"),
            Some(SeverityLevel::Critical)
        );
        assert_eq!(infer_severity("Urgent production fix"), Some(SeverityLevel::High));
        assert_eq!(infer_severity("Fix typo in README"), Some(SeverityLevel::Low));
        assert_eq!(infer_severity("Refactor parser"), None);
    }

    #[test]
    fn test_services_are_attached() {
        let services = vec!["orchestrator".to_string(), "console".to_string()];
        let ctx = infer_context("Kafka consumer for schema change events", &services);
        assert_eq!(
            ctx.get(SERVICES_CATEGORY),
            Some(&Signal::Services(services.clone()))
        );
        assert_eq!(flags_of(&ctx, "integration_factors"), vec!["message_queue"]);
        assert_eq!(flags_of(&ctx, "conflict_factors"), vec!["schema_changes"]);
    }

    #[test]
    fn test_every_rule_targets_a_builtin_flag() {
        let catalog = CriteriaCatalog::builtin();
        let declared: Vec<(String, String)> = catalog
            .roles
            .values()
            .flatten()
            .filter_map(|c| match &c.extractor {
                Extractor::Flags { flags } => Some(
                    flags
                        .iter()
                        .map(|f| (c.category.clone(), f.clone()))
                        .collect::<Vec<_>>(),
                ),
                _ => None,
            })
            .flatten()
            .collect();

        for rule in FLAG_RULES {
            assert!(
                declared.contains(&(rule.category.to_string(), rule.flag.to_string())),
                "{}.{} is not a catalog flag",
                rule.category,
                rule.flag
            );
        }
    }
}
