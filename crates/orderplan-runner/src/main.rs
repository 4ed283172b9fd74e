//! # Orderplan Runner
//!
//! Replays a plan document against simulated contexts and reports where
//! the outcomes diverge.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;
use clap::Parser;
use orderplan_core::{Plan, PRESET_NAMES};
use orderplan_engine::replay;
use orderplan_planner::{check_plan, scenario, SCENARIO_NAMES};
use orderplan_registry::FunctionRegistry;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod report;

use cli::{Cli, Commands, Format};
use config::RunnerConfig;

/// Log to stderr so reports on stdout stay machine-readable.
fn init_logging(level: Option<&str>) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level.unwrap_or("info"))
            .map_err(|e| anyhow::anyhow!("invalid log level: {e}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

fn load_plan(path: &Path) -> anyhow::Result<Plan> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading plan {}", path.display()))?;
    Plan::from_json(&raw).with_context(|| format!("parsing plan {}", path.display()))
}

async fn run_replay(
    registry: Arc<FunctionRegistry>,
    plan_path: &Path,
    contexts: &[String],
    continue_on_error: bool,
    config_path: Option<&Path>,
    format: Format,
) -> anyhow::Result<String> {
    let plan = load_plan(plan_path)?;
    let config = match config_path {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    }
    .merge_cli(contexts, continue_on_error);

    let check = check_plan(&plan, &registry);
    if !check.is_clean() {
        warn!("Plan has {} pre-flight issue(s)", check.issues.len());
    }

    let contexts = config.build_contexts()?;
    let report = replay(registry, plan, contexts, config.executor).await?;

    let output = match format {
        Format::Text => report::render_text(&report, &check),
        Format::Json => serde_json::to_string_pretty(&serde_json::json!({
            "check": check,
            "report": report,
            "divergence": report.divergence(),
            "generalizes": report.generalizes(),
        }))?,
    };
    Ok(output)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level.as_deref())?;

    let registry = Arc::new(FunctionRegistry::with_builtins()?);
    info!("Registry ready with {} operations", registry.len());

    let output = match cli.command {
        Commands::Replay {
            plan,
            contexts,
            continue_on_error,
            config,
            format,
        } => {
            run_replay(
                registry,
                &plan,
                &contexts,
                continue_on_error,
                config.as_deref(),
                format,
            )
            .await?
        }
        Commands::Describe { tools: true } => serde_json::to_string_pretty(&registry.tools_json())?,
        Commands::Describe { tools: false } => registry.functions_description(),
        Commands::Presets => PRESET_NAMES.join("\n"),
        Commands::Scenarios { name: None } => SCENARIO_NAMES.join("\n"),
        Commands::Scenarios { name: Some(name) } => scenario(&name).trim_end().to_string(),
    };

    println!("{output}");
    Ok(())
}
