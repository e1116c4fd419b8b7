//! Task context — the signal bundle a decision is scored from
//!
//! A context maps category names (`security_factors`, `affected_services`,
//! `risk_factors`, ...) to one of three signal shapes. Anything that does not
//! fit one of those shapes is kept as [`Signal::Malformed`] so a bad document
//! degrades to zero contribution instead of failing to parse.
//!
//! ```json
//! {
//!   "affected_services": ["orchestrator", "console"],
//!   "security_factors": { "authentication": true, "authorization": false },
//!   "risk_factors": "high",
//!   "tokens_estimated": 4000
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Categorical severity attached to a context category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl SeverityLevel {
    /// Fixed contribution of this severity (absent severity contributes 0)
    pub fn contribution(&self) -> f64 {
        match self {
            Self::Low => 0.25,
            Self::Medium => 0.5,
            Self::High => 0.75,
            Self::Critical => 1.0,
        }
    }

    /// Parse a severity string, ignoring case and surrounding whitespace.
    ///
    /// Returns `None` for anything outside the four known levels.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            "critical" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
            Self::Critical => write!(f, "critical"),
        }
    }
}

/// One category's worth of signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    /// Named boolean flags, e.g. `{"authentication": true}`
    Flags(BTreeMap<String, bool>),
    /// Service identifiers, e.g. `["orchestrator", "console"]`
    Services(Vec<String>),
    /// Severity string; unknown strings are kept verbatim and score zero
    Severity(String),
    /// Any other JSON shape
    Malformed(serde_json::Value),
}

impl Signal {
    /// Short name of the signal shape, used in warnings
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Flags(_) => "flags",
            Self::Services(_) => "services",
            Self::Severity(_) => "severity",
            Self::Malformed(_) => "malformed",
        }
    }
}

/// Caller-supplied token estimate
///
/// Anything other than a non-negative integer is kept as `Malformed` so the
/// rest of the context still parses; the engine then uses its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenEstimate {
    Count(u64),
    Malformed(serde_json::Value),
}

/// Structured signal bundle describing a task
///
/// Categories are kept in a `BTreeMap` so serialization order is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    /// Caller's estimate of task size in tokens; the engine falls back to its
    /// configured default when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tokens_estimated: Option<TokenEstimate>,
    #[serde(flatten)]
    pub signals: BTreeMap<String, Signal>,
}

impl TaskContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a boolean-flag category, replacing any previous value
    pub fn with_flags<I, S>(mut self, category: impl Into<String>, flags: I) -> Self
    where
        I: IntoIterator<Item = (S, bool)>,
        S: Into<String>,
    {
        let flags = flags.into_iter().map(|(k, v)| (k.into(), v)).collect();
        self.signals.insert(category.into(), Signal::Flags(flags));
        self
    }

    /// Set a single flag, creating the category if needed.
    ///
    /// A category currently holding a non-flag signal is replaced.
    pub fn set_flag(&mut self, category: &str, flag: &str, value: bool) {
        match self.signals.get_mut(category) {
            Some(Signal::Flags(flags)) => {
                flags.insert(flag.to_string(), value);
            }
            _ => {
                let mut flags = BTreeMap::new();
                flags.insert(flag.to_string(), value);
                self.signals
                    .insert(category.to_string(), Signal::Flags(flags));
            }
        }
    }

    /// Set a service-list category
    pub fn with_services<I, S>(mut self, category: impl Into<String>, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let services = services.into_iter().map(Into::into).collect();
        self.signals
            .insert(category.into(), Signal::Services(services));
        self
    }

    /// Set a severity category
    pub fn with_severity(mut self, category: impl Into<String>, level: SeverityLevel) -> Self {
        self.signals
            .insert(category.into(), Signal::Severity(level.to_string()));
        self
    }

    /// Set an arbitrary signal
    pub fn with_signal(mut self, category: impl Into<String>, signal: Signal) -> Self {
        self.signals.insert(category.into(), signal);
        self
    }

    pub fn with_tokens(mut self, tokens: u64) -> Self {
        self.tokens_estimated = Some(TokenEstimate::Count(tokens));
        self
    }

    /// The token estimate, if the caller gave a usable one
    pub fn tokens(&self) -> Option<u64> {
        match self.tokens_estimated {
            Some(TokenEstimate::Count(n)) => Some(n),
            _ => None,
        }
    }

    /// The raw token estimate when it was not a non-negative integer
    pub fn malformed_tokens(&self) -> Option<&serde_json::Value> {
        match &self.tokens_estimated {
            Some(TokenEstimate::Malformed(raw)) => Some(raw),
            _ => None,
        }
    }

    pub fn get(&self, category: &str) -> Option<&Signal> {
        self.signals.get(category)
    }

    /// True when no category carries any signal
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
