use analytics::{
    LedgerSnapshot, QualityEngine, QualityParams, ReconciliationEngine, ReconciliationParams,
};
use anyhow::{Context, bail};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use configuration::{Config, Overrides, init_tracing, load_config};
use core_types::ObservationFilter;
use database::{AccessMode, DbRepository, connect, resolve_database_url, run_migrations};
use reporting::KpiSummary;
use serde::Serialize;
use std::path::PathBuf;
use tracing::Instrument;
use uuid::Uuid;

/// The main entry point for the price reconciliation tool.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref()).context("Failed to load configuration")?;
    config
        .apply_overrides(&cli.overrides)
        .context("Invalid command-line override")?;

    // Held for the whole run so the file writer drains before exit.
    let _log_guard = init_tracing(&config.logging).context("Failed to initialise logging")?;

    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id, command = cli.command.name());

    async move {
        tracing::info!("Starting.");
        let result = match cli.command {
            Commands::Quality(scope) => handle_quality(&config, scope).await,
            Commands::Reconcile(scope) => handle_reconcile(&config, scope).await,
            Commands::Diagnose(args) => handle_diagnose(&config, args).await,
            Commands::Kpi(args) => handle_kpi(&config, args),
            Commands::Migrate => handle_migrate(&config).await,
        };
        if let Err(e) = &result {
            tracing::error!(error = %format!("{e:#}"), "Command failed.");
        }
        result
    }
    .instrument(span)
    .await
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// Quality diagnostics and cross-source reconciliation for daily price feeds.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML config file (default: ./config.toml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit the ledger for duplicates, calendar gaps and ingestion latency.
    Quality(ScopeArgs),
    /// Compare price levels and returns across sources.
    Reconcile(ScopeArgs),
    /// Diagnose scale bias between two sources.
    Diagnose(DiagnoseArgs),
    /// Aggregate the headline KPIs from the last quality and reconciliation reports.
    Kpi(KpiArgs),
    /// Apply the ledger schema migrations.
    Migrate,
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Quality(_) => "quality",
            Commands::Reconcile(_) => "reconcile",
            Commands::Diagnose(_) => "diagnose",
            Commands::Kpi(_) => "kpi",
            Commands::Migrate => "migrate",
        }
    }
}

#[derive(Args)]
struct ScopeArgs {
    /// Restrict to one symbol (e.g., "AAPL").
    #[arg(long)]
    symbol: Option<String>,

    /// Restrict to one source (e.g., "STOOQ").
    #[arg(long)]
    source: Option<String>,

    /// First event date to include (format: YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last event date to include (format: YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,

    /// Print the report as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl ScopeArgs {
    fn filter(&self) -> anyhow::Result<ObservationFilter> {
        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                bail!("--from {from} is after --to {to}");
            }
        }
        let mut filter = ObservationFilter::new().between(
            self.from.map(start_of_day),
            self.to.map(end_of_day),
        );
        if let Some(symbol) = &self.symbol {
            filter = filter.symbol(symbol);
        }
        if let Some(source) = &self.source {
            filter = filter.source(source);
        }
        Ok(filter)
    }
}

#[derive(Args)]
struct DiagnoseArgs {
    /// The source whose prices are scaled by k (falls back to [diagnostics]).
    #[arg(long)]
    source_a: Option<String>,

    /// The reference source (falls back to [diagnostics]).
    #[arg(long)]
    source_b: Option<String>,

    #[command(flatten)]
    scope: ScopeArgs,
}

impl DiagnoseArgs {
    /// The read scope. A single-source scope could never hold a pair.
    fn filter(&self) -> anyhow::Result<ObservationFilter> {
        if let Some(source) = &self.scope.source {
            bail!("--source {source} does not apply to diagnose; use --source-a/--source-b");
        }
        self.scope.filter()
    }
}

#[derive(Args)]
struct KpiArgs {
    /// Print the summary as JSON instead of a table.
    #[arg(long)]
    json: bool,
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

fn end_of_day(date: NaiveDate) -> DateTime<Utc> {
    start_of_day(date) + chrono::Duration::days(1) - chrono::Duration::nanoseconds(1)
}

// ==============================================================================
// Command Logic
// ==============================================================================

/// Fetches one consistent snapshot through a read-only pool.
async fn load_snapshot(config: &Config, filter: &ObservationFilter) -> anyhow::Result<LedgerSnapshot> {
    let pool = connect(
        &config.database.url,
        config.database.max_connections,
        AccessMode::ReadOnly,
    )
    .await
    .context("Failed to connect to the ledger")?;

    let rows = DbRepository::new(pool)
        .fetch_raw_observations(filter)
        .await
        .context("Failed to read the ledger")?;

    Ok(LedgerSnapshot::from_raw(&rows, filter))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn handle_quality(config: &Config, scope: ScopeArgs) -> anyhow::Result<()> {
    let snapshot = load_snapshot(config, &scope.filter()?).await?;

    let engine = QualityEngine::new(QualityParams {
        expected_frequency: config.quality.expected_frequency.clone(),
        max_latency_hours: config.quality.max_latency_hours,
        max_gap_days: config.quality.max_gap_days,
    })?;
    let report = engine.calculate(&snapshot);

    let path = reporting::write_quality_report(
        &report,
        &config.report.output_dir,
        config.report.max_detail_rows,
    )
    .context("Failed to write the quality report")?;

    if scope.json {
        print_json(&report)?;
    } else {
        println!("{}", reporting::quality_table(&report));
        println!("Report written to {}", path.display());
    }
    Ok(())
}

fn reconciliation_engine(config: &Config) -> anyhow::Result<ReconciliationEngine> {
    Ok(ReconciliationEngine::new(ReconciliationParams {
        price_delta_pct_threshold: config.reconciliation.price_delta_pct_threshold,
        return_delta_pct_threshold: config.reconciliation.return_delta_pct_threshold,
    })?)
}

async fn handle_reconcile(config: &Config, scope: ScopeArgs) -> anyhow::Result<()> {
    let snapshot = load_snapshot(config, &scope.filter()?).await?;
    let report = reconciliation_engine(config)?.calculate(&snapshot);

    let path = reporting::write_reconciliation_report(
        &report,
        &config.report.output_dir,
        config.report.max_detail_rows,
    )
    .context("Failed to write the reconciliation report")?;

    if scope.json {
        print_json(&report)?;
    } else {
        println!("{}", reporting::reconciliation_table(&report));
        println!("Report written to {}", path.display());
    }
    Ok(())
}

async fn handle_diagnose(config: &Config, mut args: DiagnoseArgs) -> anyhow::Result<()> {
    let fallback = config.diagnostics.as_ref();
    let source_a = args
        .source_a
        .take()
        .or_else(|| fallback.map(|d| d.source_a.clone()))
        .context("No source pair: pass --source-a/--source-b or set [diagnostics]")?;
    let source_b = args
        .source_b
        .take()
        .or_else(|| fallback.map(|d| d.source_b.clone()))
        .context("No source pair: pass --source-a/--source-b or set [diagnostics]")?;

    if args.scope.symbol.is_none() {
        args.scope.symbol = fallback.and_then(|d| d.symbol.clone());
    }

    let snapshot = load_snapshot(config, &args.filter()?).await?;
    let diagnosis = reconciliation_engine(config)?.diagnose_bias(
        &snapshot,
        &source_a,
        &source_b,
        args.scope.symbol.as_deref(),
    )?;

    if args.scope.json {
        print_json(&diagnosis)?;
    } else {
        println!(
            "{} vs {} ({}), {} paired observations",
            diagnosis.source_a,
            diagnosis.source_b,
            diagnosis.symbol.as_deref().unwrap_or("all symbols"),
            diagnosis.pairs
        );
        println!("{}", reporting::bias_table(&diagnosis));
    }
    Ok(())
}

fn handle_kpi(config: &Config, args: KpiArgs) -> anyhow::Result<()> {
    let output_dir = &config.report.output_dir;
    let summary = KpiSummary::from_output_dir(output_dir).context("Failed to read report summaries")?;
    let path = reporting::write_kpi_summary(&summary, output_dir)
        .context("Failed to write the KPI summary")?;

    if args.json {
        print_json(&summary)?;
    } else {
        println!("{}", reporting::kpi_table(&summary));
        println!("KPI summary written to {}", path.display());
    }
    Ok(())
}

async fn handle_migrate(config: &Config) -> anyhow::Result<()> {
    if let Some(dir) = database_dir(&resolve_database_url(&config.database.url)) {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }

    let pool = connect(
        &config.database.url,
        config.database.max_connections,
        AccessMode::ReadWrite,
    )
    .await
    .context("Failed to connect to the ledger")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let counts = DbRepository::new(pool).get_series_counts().await?;
    tracing::info!(series = counts.len(), "Ledger schema is up to date.");
    println!("Ledger schema is up to date ({} series).", counts.len());
    Ok(())
}

/// The parent directory of a file-backed `sqlite://` URL.
fn database_dir(url: &str) -> Option<PathBuf> {
    let path = url.strip_prefix("sqlite://")?.split('?').next()?;
    if path.is_empty() || path.starts_with(':') {
        return None;
    }
    PathBuf::from(path)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(PathBuf::from)
}
