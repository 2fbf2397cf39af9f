//! CLI argument parsing using clap derive API
//!
//! Purely declarative; no I/O happens here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// StreamAlert -- classify log batches and evaluate detection rules.
///
/// Use `streamalert <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "streamalert", version, about, long_about = None)]
pub struct Cli {
    /// Path to the streamalert.toml configuration file.
    #[arg(short, long, default_value = "streamalert.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one invocation over an event batch file.
    Process(ProcessArgs),

    /// Manage detection rules.
    Rules(RulesArgs),
}

impl Commands {
    /// Whether the command needs the configuration file.
    ///
    /// `rules validate` works on a directory alone.
    pub fn needs_config(&self) -> bool {
        !matches!(
            self,
            Commands::Rules(RulesArgs {
                action: RulesAction::Validate { .. }
            })
        )
    }
}

// ---- process ----

/// Run the rule processor once over a batch of records.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// JSON file holding the event (`{"Records": [...]}`).
    #[arg(short, long)]
    pub event: PathBuf,

    /// Invoked function ARN (`arn:aws:lambda:<region>:<account>:function:<name>:<alias>`).
    #[arg(long)]
    pub context: String,

    /// Return alerts in the report instead of delivering them.
    #[arg(long)]
    pub return_alerts: bool,
}

// ---- rules ----

/// Manage detection rules.
#[derive(Args, Debug)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub action: RulesAction,
}

#[derive(Subcommand, Debug)]
pub enum RulesAction {
    /// List rules loaded from `general.rule_dir`.
    List {
        /// Filter by status (enabled, disabled, test).
        #[arg(long)]
        status: Option<String>,
    },
    /// Validate every rule file in a directory.
    Validate {
        /// Directory containing YAML rule files.
        #[arg(default_value = "rules")]
        path: PathBuf,
    },
}
