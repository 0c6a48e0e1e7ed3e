//! CLI argument parsing.
//!
//! The CLI is thin: it loads inputs, resolves config and credentials, and
//! hands off to the library. No analysis policy lives here.
use crate::provider::ProviderKind;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "flowscope",
    version,
    about = "LM-driven analysis of business automation definitions",
    after_help = "Commands:\n  analyze --input <records.json>  Analyze every record and write the result\n  plan --input <records.json>     Show the strategy and chunk plan (no network)\n  config                          Print the default config\n\nExamples:\n  flowscope config > flowscope.json\n  flowscope plan --input flows.json\n  FLOWSCOPE_API_KEY=... flowscope analyze --input flows.json --out analysis.json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Debug-level logging (overridden by FLOWSCOPE_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Analyze(AnalyzeArgs),
    Plan(PlanArgs),
    Config(ConfigArgs),
}

#[derive(Parser, Debug)]
#[command(about = "Analyze a record set with a completion provider")]
pub struct AnalyzeArgs {
    /// Record set JSON: a bare array or {"alias", "records"}
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    /// Config JSON (defaults apply when omitted)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the configured provider
    #[arg(long, value_enum)]
    pub provider: Option<ProviderKind>,

    /// Override the configured model id
    #[arg(long)]
    pub model: Option<String>,

    /// Provider credential (falls back to FLOWSCOPE_API_KEY)
    #[arg(long, value_name = "KEY")]
    pub api_key: Option<String>,

    /// Write the result JSON here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,

    /// Print the full result JSON instead of a text summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Show the strategy decision and chunk plan without calling a provider")]
pub struct PlanArgs {
    #[arg(long, value_name = "PATH")]
    pub input: PathBuf,

    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Parser, Debug)]
#[command(about = "Print the default config")]
pub struct ConfigArgs {
    /// Write the config here instead of stdout
    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}
