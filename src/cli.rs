//! Command-line interface for the AIMO engine (`spec.md` §6, §6.1).

use aimo_config::config::CliArgs;
use aimo_config::Config;
use aimo_core::exit_codes::ExitCode;
use aimo_core::AimoError;
use aimo_orchestrator::stages::report;
use aimo_orchestrator::{run_pipeline, EngineContext, KpiBlock};
use aimo_persistence::PersistenceGateway;
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};

/// `aimo` — ingest security-proxy/firewall logs, classify shadow-AI risk
/// candidates, and emit an AIMO Standard Evidence Bundle.
#[derive(Parser)]
#[command(name = "aimo")]
#[command(about = "Audit-grade shadow-AI discovery engine emitting AIMO Standard evidence bundles")]
#[command(long_about = r#"
aimo ingests CSV/JSON/JSONL security-proxy or firewall logs, canonicalizes
each event, extracts A/B/C risk candidates, classifies them with the rule
engine and an LLM fallback, and emits a validator-passing Evidence Bundle.

EXAMPLES:
  # Run the full pipeline against a Palo Alto export
  aimo traffic.csv --vendor paloalto --db-path run.db --output-dir out/

  # Ingest and detect candidates without classifying or emitting a bundle
  aimo traffic.csv --db-path run.db --dry-run

  # Check on a previous run without resuming it
  aimo status 4f2a9c1e8b7d0a3f --db-path run.db --json

CONFIGURATION:
  Layered: built-in defaults < .aimo/config.toml (discovered upward from the
  current directory, or given explicitly with --config) < environment
  variables < CLI flags.
"#)]
#[command(version)]
pub struct Cli {
    /// Input log file to ingest (CSV, JSON array-of-objects, or JSONL)
    pub input_file: Option<Utf8PathBuf>,

    /// Vendor mapping to apply (default "paloalto")
    #[arg(long)]
    pub vendor: Option<String>,

    /// Path to the embedded analytical database file
    #[arg(long)]
    pub db_path: Option<Utf8PathBuf>,

    /// Directory the Evidence Bundle is written into
    #[arg(long)]
    pub output_dir: Option<Utf8PathBuf>,

    /// AIMO Standard version to resolve
    #[arg(long)]
    pub standard_version: Option<String>,

    /// Skip the Standard pinning check (requires AIMO_ALLOW_SKIP_PINNING=1)
    #[arg(long)]
    pub skip_pin_check: bool,

    /// Explicit config file path, overriding discovery
    #[arg(long)]
    pub config: Option<Utf8PathBuf>,

    /// Debug-level structured logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Run ingest/normalize/detect only; print the KPI block and stop
    /// before classification and bundle emission
    #[arg(long)]
    pub dry_run: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print a persisted run's stage, status, and KPI block without
    /// resuming it
    Status {
        /// Run ID to look up
        run_id: String,

        /// Output as JSON instead of a human-readable summary
        #[arg(long)]
        json: bool,
    },
}

/// Entry point called by `main.rs`. Handles all output, including errors;
/// `main.rs` only maps the returned `ExitCode` to `std::process::exit`.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    execute(cli).map_err(handle_error)
}

fn execute(cli: Cli) -> Result<()> {
    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        vendor: cli.vendor.clone(),
        db_path: cli.db_path.clone(),
        output_dir: cli.output_dir.clone(),
        standard_version: cli.standard_version.clone(),
        skip_pin_check: cli.skip_pin_check,
        verbose: cli.verbose,
        dry_run: cli.dry_run,
    };

    let config = Config::discover(&cli_args).context("loading configuration")?;

    match &cli.command {
        Some(Commands::Status { run_id, json }) => execute_status_command(&config, run_id, *json),
        None => execute_run_command(&cli, config),
    }
}

fn execute_run_command(cli: &Cli, config: Config) -> Result<()> {
    let input_file = cli
        .input_file
        .clone()
        .context("an <input_file> is required unless using the `status` subcommand")?;

    let ctx = EngineContext::build(config).context("building engine context")?;
    let rt = tokio::runtime::Runtime::new().context("creating async runtime")?;
    let report = rt.block_on(run_pipeline(&ctx, &input_file))?;

    tracing::info!(run_id = %report.run_id, dry_run = report.dry_run, "run complete");
    print_kpi(&report.run_id, report.dry_run, &report.kpi);
    Ok(())
}

fn execute_status_command(config: &Config, run_id: &str, json: bool) -> Result<()> {
    let db_path = config.paths.db_path.clone().context("--db-path (or [paths] db_path) is required")?;
    let temp_dir = db_path.parent().map(|p| p.join(".aimo-tmp")).unwrap_or_else(|| Utf8PathBuf::from(".aimo-tmp"));
    std::fs::create_dir_all(&temp_dir).with_context(|| format!("creating persistence temp dir {temp_dir}"))?;
    let gateway = PersistenceGateway::open(&db_path, &temp_dir, config.persistence.queue_capacity).context("opening persistence gateway")?;

    let run = gateway
        .get_run(run_id)
        .context("reading run")?
        .with_context(|| format!("no run found with id '{run_id}'"))?;
    let input_rows = report::sum_input_rows(&gateway, run_id).context("summing persisted input rows")?;
    let kpi = report::build_kpi(&gateway, run_id, input_rows).context("building KPI block")?;

    if json {
        let payload = serde_json::json!({ "run": run, "kpi": kpi });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("run {} — {:?} (last completed stage {})", run.run_id, run.status, run.last_completed_stage);
        print_kpi(&run.run_id, false, &kpi);
    }
    Ok(())
}

fn print_kpi(run_id: &str, dry_run: bool, kpi: &KpiBlock) {
    println!("run_id: {run_id}{}", if dry_run { " (dry-run, resumable)" } else { "" });
    println!("  input_rows:          {}", kpi.input_rows);
    println!("  unique_signatures:   {}", kpi.unique_signatures);
    println!("  candidates (A/B/C):  {}/{}/{}", kpi.a_count, kpi.b_count, kpi.c_count);
    println!("  cache_hits:          {}", kpi.cache_hits);
    println!("  rule_matched:        {}", kpi.rule_matched);
    println!("  llm_analyzed:        {}", kpi.llm_analyzed);
    println!("  llm_skipped_budget:  {}", kpi.llm_skipped_budget);
    println!("  needs_review:        {}", kpi.needs_review);
    println!("  failed_permanent:    {}", kpi.failed_permanent);
    if let Some(path) = &kpi.bundle_path {
        let verdict = if kpi.bundle_validation_passed == Some(true) { "passed" } else { "FAILED" };
        println!("  bundle:              {path} (validation {verdict})");
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

fn handle_error(err: anyhow::Error) -> ExitCode {
    if let Some(aimo_err) = err.downcast_ref::<AimoError>() {
        eprintln!("error: {}", aimo_err.user_message());
        aimo_err.to_exit_code()
    } else {
        eprintln!("error: {err:#}");
        ExitCode::GENERIC_FAILURE
    }
}
