//! Escalation engine error types
//!
//! Configuration problems are fatal and surface while the engine is being
//! built. Role lookups and audit writes fail per call and the caller decides
//! how to recover (usually by falling back to manual review).

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for engine operations
pub type EscalationResult<T> = Result<T, EscalationError>;

/// Errors that can occur while building or querying the engine
#[derive(Error, Debug)]
pub enum EscalationError {
    /// Role is not present in the configured catalog/threshold maps
    #[error("Unknown role '{role}' (configured roles: {})", known.join(", "))]
    UnknownRole { role: String, known: Vec<String> },

    /// Catalog, thresholds, pricing or routing failed validation
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    /// Configuration file could not be read
    #[error("Failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed
    #[error("Failed to parse config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },

    /// Configuration file extension is not one we know how to parse
    #[error("Unsupported config format for {path} (expected .toml, .yaml or .yml)")]
    UnsupportedConfigFormat { path: PathBuf },

    /// An audit sink rejected a decision
    #[error("Audit sink error: {message}")]
    Audit { message: String },
}

impl EscalationError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
        }
    }

    /// Whether the caller can carry on after this error.
    ///
    /// Configuration errors must abort startup; everything else only affects
    /// the current call.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::UnknownRole { .. } | Self::Audit { .. } => true,
            Self::InvalidConfiguration { .. }
            | Self::ConfigRead { .. }
            | Self::ConfigParse { .. }
            | Self::UnsupportedConfigFormat { .. } => false,
        }
    }

    /// Machine-readable error code for logs and CLI output
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownRole { .. } => "UNKNOWN_ROLE",
            Self::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            Self::ConfigRead { .. } => "CONFIG_READ",
            Self::ConfigParse { .. } => "CONFIG_PARSE",
            Self::UnsupportedConfigFormat { .. } => "UNSUPPORTED_CONFIG_FORMAT",
            Self::Audit { .. } => "AUDIT",
        }
    }
}
