//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use pagepatch_core::{
    Catalog, DocumentOutcome, DocumentReport, FsStore, PatchPipeline, ProgressReporter,
    RunOptions, RunReport,
};
use pagepatch_shared::{
    CONFIG_FILE_NAME, DateStagger, PatchConfig, init_config, load_config, resolve_config_path,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// pagepatch: keep static page templates in sync with structured content.
#[derive(Parser)]
#[command(
    name = "pagepatch",
    version,
    about = "Apply idempotent content patches to static JSX marketing pages.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Path to pagepatch.toml (defaults to ./pagepatch.toml, then ~/.pagepatch/pagepatch.toml).
    #[arg(long, global = true, env = "PAGEPATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Defaults to `run` when omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Patch every catalog document.
    Run(RunArgs),

    /// Print the publication date assigned to each catalog position.
    Dates,

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args, Debug, Default, Clone)]
pub(crate) struct RunArgs {
    /// Compute outcomes without writing anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Documents processed in parallel (overrides settings.concurrency).
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Ignore and do not update the applied-stage ledger.
    #[arg(long)]
    pub no_state: bool,

    /// Treat configuration warnings (e.g. unregistered content keys) as errors.
    #[arg(long)]
    pub strict: bool,

    /// Print the run report as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Write a default config file.
    Init {
        /// Write to ~/.pagepatch/pagepatch.toml instead of the current directory.
        #[arg(long)]
        user: bool,
    },
    /// Show resolved configuration.
    Show,
    /// Check the configuration without touching any document.
    Validate,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "pagepatch=info",
        1 => "pagepatch=debug",
        _ => "pagepatch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();
    match cli.command {
        None => cmd_run(config_path, &RunArgs::default()).await,
        Some(Command::Run(args)) => cmd_run(config_path, &args).await,
        Some(Command::Dates) => cmd_dates(config_path),
        Some(Command::Config { action }) => match action {
            ConfigAction::Init { user } => cmd_config_init(config_path, user),
            ConfigAction::Show => cmd_config_show(config_path),
            ConfigAction::Validate => cmd_config_validate(config_path),
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(config_path: Option<&Path>, args: &RunArgs) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = PatchPipeline::from_config(&config, Arc::new(FsStore))?;

    if args.strict && !pipeline.warnings().is_empty() {
        return Err(eyre!(
            "{} configuration warning(s) with --strict: {}",
            pipeline.warnings().len(),
            pipeline.warnings().join("; ")
        ));
    }

    if pipeline.catalog().is_empty() {
        warn!("no documents configured; add [[documents]] entries to {CONFIG_FILE_NAME}");
    }

    let opts = RunOptions {
        dry_run: args.dry_run,
        track_state: config.settings.track_state && !args.no_state,
    };
    let concurrency = args
        .concurrency
        .unwrap_or(config.settings.concurrency as usize);
    if concurrency == 0 {
        return Err(eyre!("--concurrency must be at least 1"));
    }

    info!(
        documents = pipeline.catalog().len(),
        concurrency,
        dry_run = opts.dry_run,
        track_state = opts.track_state,
        "running patch pipeline"
    );

    let reporter = CliProgress::new(pipeline.catalog().len(), !args.json);
    let report = if concurrency > 1 {
        Arc::new(pipeline)
            .run_concurrent(concurrency, opts, &reporter)
            .await?
    } else {
        pipeline.run(opts, &reporter)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report_json(&report))?);
    } else {
        for doc in &report.documents {
            println!("{}", document_line(doc));
        }
        println!();
        println!("{}", summary_line(&report));
        if let Some(e) = &report.state_error {
            println!("State not saved: {e}");
        }
    }

    if report.failed > 0 {
        return Err(eyre!("{} document(s) could not be written", report.failed));
    }
    if let Some(e) = report.state_error {
        return Err(eyre!("ledger not saved: {e}"));
    }
    Ok(())
}

/// `  patched             About  footer-import, footer-element`
fn document_line(doc: &DocumentReport) -> String {
    let mut line = format!("  {:<18}  {}", doc.outcome.label(), doc.key);

    let applied = doc.applied_stages();
    if !applied.is_empty() {
        line.push_str(&format!("  {}", applied.join(", ")));
    }

    match &doc.outcome {
        DocumentOutcome::SkippedMissing { reason } | DocumentOutcome::Failed { reason } => {
            line.push_str(&format!("  ({reason})"));
        }
        _ => {}
    }

    for stage in doc.warnings() {
        line.push_str(&format!("  [{}: {}]", stage.id, stage.outcome));
    }
    if doc.drifted {
        line.push_str("  [edited since last run]");
    }
    line
}

fn summary_line(report: &RunReport) -> String {
    format!(
        "{}Patched {}, unchanged {}, skipped {}, failed {} in {:.1}s",
        if report.dry_run { "(dry run) " } else { "" },
        report.patched,
        report.unchanged,
        report.skipped,
        report.failed,
        report.elapsed.as_secs_f64()
    )
}

fn report_json(report: &RunReport) -> serde_json::Value {
    let documents: Vec<serde_json::Value> = report
        .documents
        .iter()
        .map(|doc| {
            let reason = match &doc.outcome {
                DocumentOutcome::SkippedMissing { reason } | DocumentOutcome::Failed { reason } => {
                    Some(reason.clone())
                }
                _ => None,
            };
            let stages: Vec<serde_json::Value> = doc
                .stages
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id,
                        "kind": s.kind.name(),
                        "outcome": s.outcome.label(),
                        "detail": s.outcome.to_string(),
                    })
                })
                .collect();
            serde_json::json!({
                "index": doc.index,
                "key": doc.key,
                "path": doc.path.display().to_string(),
                "outcome": doc.outcome.label(),
                "reason": reason,
                "drifted": doc.drifted,
                "stages": stages,
            })
        })
        .collect();

    serde_json::json!({
        "dry_run": report.dry_run,
        "patched": report.patched,
        "unchanged": report.unchanged,
        "skipped": report.skipped,
        "failed": report.failed,
        "elapsed_ms": report.elapsed.as_millis() as u64,
        "state_error": report.state_error,
        "documents": documents,
    })
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar on stderr.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total: usize, visible: bool) -> Self {
        if !visible {
            return Self {
                bar: ProgressBar::hidden(),
            };
        }

        let bar = ProgressBar::new(total as u64);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn document_done(&self, report: &DocumentReport, current: usize, _total: usize) {
        self.bar.set_position(current as u64);
        self.bar.set_message(report.key.clone());
    }

    fn done(&self, _report: &RunReport) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// dates
// ---------------------------------------------------------------------------

fn cmd_dates(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let stagger = DateStagger::from_config(&config.dates)?;
    let catalog = Catalog::from_config(&config)?;

    println!(
        "Start {} every {} day(s)",
        stagger.start(),
        stagger.interval_days()
    );
    for entry in catalog.list() {
        let date = stagger.render(&stagger.assign(entry.index)?);
        println!(
            "  {:>3}  {}  {}  {}",
            entry.index, date.iso, date.display, entry.key
        );
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

fn cmd_config_init(config_path: Option<&Path>, user: bool) -> Result<()> {
    let target = if user {
        None
    } else {
        Some(
            config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME)),
        )
    };
    let path = init_config(target.as_deref())?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show(config_path: Option<&Path>) -> Result<()> {
    let resolved = resolve_config_path(config_path)?;
    let config: PatchConfig = load_config(config_path)?;

    match resolved {
        Some(path) => println!("# {}", path.display()),
        None => println!("# built-in defaults"),
    }
    println!("# base_dir = {}", config.base_dir().display());
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

fn cmd_config_validate(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let pipeline = PatchPipeline::from_config(&config, Arc::new(FsStore))?;

    for warning in pipeline.warnings() {
        println!("warning: {warning}");
    }

    println!(
        "Configuration OK: {} document(s), {} content key(s), {} stage(s), {} warning(s)",
        pipeline.catalog().len(),
        pipeline.registry().len(),
        pipeline.stages().len(),
        pipeline.warnings().len()
    );
    Ok(())
}
