//! Command-line definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Contexts a plan is replayed against when none are named.
pub const DEFAULT_CONTEXTS: [&str; 3] = ["default", "low_inventory", "high_capacity"];

/// Orderplan - replay fulfillment plans against simulated contexts
#[derive(Debug, Parser)]
#[command(name = "orderplan", version)]
#[command(about = "Replay fulfillment plans against simulated business contexts")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error, off); RUST_LOG wins if set
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Execute a plan against one or more contexts
    Replay {
        /// Plan document (JSON)
        #[arg(long)]
        plan: PathBuf,

        /// Context preset to replay against (repeatable)
        #[arg(long = "context", value_name = "NAME")]
        contexts: Vec<String>,

        /// Keep executing after a failed step
        #[arg(long)]
        continue_on_error: bool,

        /// Runner configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// List the registered operations
    Describe {
        /// Print the function-calling tool definitions instead
        #[arg(long)]
        tools: bool,
    },
    /// List the built-in context presets
    Presets,
    /// List the planning scenarios, or print one scenario's goal
    Scenarios {
        /// Scenario to print; unknown names fall back to basic
        name: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_replay() {
        let cli = Cli::parse_from([
            "orderplan",
            "replay",
            "--plan",
            "plan.json",
            "--context",
            "default",
            "--context",
            "high_demand",
            "--format",
            "json",
        ]);

        match cli.command {
            Commands::Replay {
                plan,
                contexts,
                continue_on_error,
                format,
                config,
            } => {
                assert_eq!(plan, PathBuf::from("plan.json"));
                assert_eq!(contexts, vec!["default", "high_demand"]);
                assert!(!continue_on_error);
                assert_eq!(format, Format::Json);
                assert!(config.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_log_level() {
        let cli = Cli::parse_from(["orderplan", "describe", "--tools", "--log-level", "debug"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::Describe { tools: true }));
    }

    #[test]
    fn test_parse_scenarios() {
        let cli = Cli::parse_from(["orderplan", "scenarios", "low_inventory"]);
        match cli.command {
            Commands::Scenarios { name } => assert_eq!(name.as_deref(), Some("low_inventory")),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(["orderplan", "scenarios"]);
        assert!(matches!(cli.command, Commands::Scenarios { name: None }));
    }

    #[test]
    fn test_plan_is_required() {
        assert!(Cli::try_parse_from(["orderplan", "replay"]).is_err());
    }
}
