use anyhow::{Context, Result};
use clap::Parser;
use flowscope::analysis::AnalysisResult;
use flowscope::chunking::{plan_chunks, ChunkSummary};
use flowscope::cli::{AnalyzeArgs, Command, ConfigArgs, PlanArgs, RootArgs};
use flowscope::config::{
    config_stub, default_config, load_config, resolve_credential, validate_config, write_config,
    AnalysisConfig,
};
use flowscope::orchestrate::{run_analysis, RunContext};
use flowscope::provider::build_client;
use flowscope::records::RecordSet;
use flowscope::sizing::{select_strategy, AnalysisStrategy, StrategyDecision};
use flowscope::util::{display_path, write_text_atomic};
use serde::Serialize;
use std::path::Path;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "FLOWSCOPE_LOG";

fn main() -> Result<()> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);
    match args.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Plan(args) => run_plan(args),
        Command::Config(args) => run_config(args),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn load_or_default(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(default_config()),
    }
}

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = load_or_default(args.config.as_deref())?;
    if let Some(provider) = args.provider {
        if provider != config.provider {
            // A configured model belongs to the configured provider.
            config.model = None;
        }
        config.provider = provider;
    }
    if let Some(model) = args.model {
        config.model = Some(model);
    }
    validate_config(&config).context("validate effective config")?;

    let set = RecordSet::load(&args.input)?;
    let credential = resolve_credential(args.api_key.as_deref())?;
    let client = build_client(&config, &credential);
    let ctx = RunContext::new(&client, &config);
    let result = run_analysis(&ctx, &set)?;

    let json = serde_json::to_string_pretty(&result).context("serialize analysis result")?;
    if let Some(out) = args.out.as_deref() {
        write_text_atomic(out, &json)?;
        let cwd = std::env::current_dir().ok();
        eprintln!("wrote {}", display_path(out, cwd.as_deref()));
    }
    if args.json {
        println!("{json}");
    } else {
        print_summary(&result);
    }
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    let stats = &result.stats;
    println!(
        "strategy: {} ({} call(s), {} failed)",
        stats.strategy, stats.chunk_count, stats.failed_chunks
    );
    println!(
        "entries: {} ({} synthesized, {} unavailable)",
        result.entries.len(),
        stats.synthesized_entries,
        stats.unavailable_entries
    );
    if stats.narrative_fallback {
        println!("narrative: fallback text");
    }
    println!();
    println!("{}", result.organization_overview);
    for entry in &result.entries {
        println!("- {} [{:?}]", entry.record_name, entry.origin);
    }
}

#[derive(Serialize)]
struct PlanReport {
    decision: StrategyDecision,
    chunks: Vec<ChunkSummary>,
}

fn run_plan(args: PlanArgs) -> Result<()> {
    let config = load_or_default(args.config.as_deref())?;
    let set = RecordSet::load(&args.input)?;
    set.validate().context("validate record set")?;

    let decision = select_strategy(&set, &config);
    let chunks: Vec<ChunkSummary> = match decision.strategy {
        AnalysisStrategy::SingleShot => Vec::new(),
        AnalysisStrategy::Chunked => plan_chunks(&set.records, config.max_chunk_cost)
            .iter()
            .map(|chunk| chunk.summary())
            .collect(),
    };

    if args.json {
        let report = PlanReport { decision, chunks };
        let text = serde_json::to_string_pretty(&report).context("serialize plan")?;
        println!("{text}");
        return Ok(());
    }

    println!(
        "strategy: {} ({} records, estimated cost {})",
        decision.strategy, decision.count, decision.total_cost
    );
    if chunks.is_empty() {
        println!("one call covering all records");
    }
    for (index, chunk) in chunks.iter().enumerate() {
        println!(
            "chunk {}/{}: cost {} [{}]",
            index + 1,
            chunks.len(),
            chunk.cost,
            chunk.names.join(", ")
        );
    }
    Ok(())
}

fn run_config(args: ConfigArgs) -> Result<()> {
    match args.out.as_deref() {
        Some(path) => {
            write_config(path, &default_config())?;
            eprintln!("wrote {}", path.display());
        }
        None => println!("{}", config_stub()?),
    }
    Ok(())
}
