//! Command-line front end for the escalation decision engine
//!
//! # Usage
//!
//! ```bash
//! # Decide for a context document
//! escalation-cli decide --role architect --task-id ARCH-001 --context ctx.json --pretty
//!
//! # Context from stdin, with an audit trail
//! cat ctx.json | escalation-cli decide --role integrator --task-id INT-7 --context - --audit-log decisions.jsonl
//!
//! # Guess a context from a ticket title
//! escalation-cli infer --description "Add OAuth login" --service auth --service gateway
//!
//! # Custom configuration
//! ESCALATION_CONFIG=./escalation.toml escalation-cli validate-config
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use escalation_engine::{
    infer_context, EngineConfig, EscalationDecision, EscalationEngine, JsonLinesAuditSink,
    TaskContext,
};
use serde::Serialize;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Engine config file, TOML or YAML (overrides ESCALATION_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Score a task context and print the decision
    Decide {
        /// Reviewing role, e.g. architect or integrator
        #[arg(long)]
        role: String,

        /// Task identifier echoed into the decision
        #[arg(long)]
        task_id: String,

        /// JSON context document, or `-` for stdin
        #[arg(long)]
        context: String,

        /// Append the decision as a JSON line to this file
        #[arg(long)]
        audit_log: Option<PathBuf>,

        /// Pretty-print the decision
        #[arg(long, default_value_t = false)]
        pretty: bool,
    },

    /// Infer a context from a free-text task description
    Infer {
        #[arg(long)]
        description: String,

        /// Affected service (repeatable)
        #[arg(long = "service")]
        services: Vec<String>,
    },

    /// Load and validate the configuration, then list its roles
    ValidateConfig,

    /// Print the configured criteria
    Catalog {
        /// Only this role
        #[arg(long)]
        role: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let output = run(cli)?;
    println!("{output}");
    Ok(())
}

fn run(cli: Cli) -> Result<String> {
    match cli.command {
        Command::Decide {
            role,
            task_id,
            context,
            audit_log,
            pretty,
        } => {
            let engine = load_engine(cli.config.as_deref())?;
            let ctx = read_context(&context)?;
            let decision = decide(&engine, &role, &task_id, &ctx, audit_log.as_deref())?;
            info!("{}", decision.summary());
            to_json(&decision, pretty)
        }
        Command::Infer {
            description,
            services,
        } => to_json(&infer_context(&description, &services), true),
        Command::ValidateConfig => {
            let config = resolve_config(cli.config.as_deref())?;
            Ok(format!("configuration OK; roles: {}", config.roles().join(", ")))
        }
        Command::Catalog { role } => {
            let config = resolve_config(cli.config.as_deref())?;
            match role {
                Some(role) => {
                    let criteria = config.catalog.criteria(&role).with_context(|| {
                        format!(
                            "unknown role '{role}' (configured: {})",
                            config.roles().join(", ")
                        )
                    })?;
                    to_json(&criteria, true)
                }
                None => to_json(&config.catalog, true),
            }
        }
    }
}

fn resolve_config(path: Option<&Path>) -> Result<EngineConfig> {
    EngineConfig::resolve(path).context("failed to load escalation config")
}

fn load_engine(path: Option<&Path>) -> Result<EscalationEngine> {
    EscalationEngine::resolve(path).context("failed to load escalation config")
}

fn read_context(source: &str) -> Result<TaskContext> {
    let raw = if source == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read context from stdin")?;
        buf
    } else {
        std::fs::read_to_string(source)
            .with_context(|| format!("failed to read context file {source}"))?
    };
    parse_context(&raw)
}

fn parse_context(raw: &str) -> Result<TaskContext> {
    serde_json::from_str(raw).context("failed to parse context JSON")
}

fn decide(
    engine: &EscalationEngine,
    role: &str,
    task_id: &str,
    ctx: &TaskContext,
    audit_log: Option<&Path>,
) -> Result<EscalationDecision> {
    let decision = match audit_log {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open audit log {}", path.display()))?;
            let sink = JsonLinesAuditSink::new(file);
            engine.decide_and_record(role, task_id, ctx, &sink)
        }
        None => engine.make_escalation_decision(role, task_id, ctx),
    };
    decision.with_context(|| format!("escalation decision failed for task {task_id}"))
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<String> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    json.context("failed to serialize output")
}
