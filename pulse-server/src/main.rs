use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, ValueEnum};
use serde::Serialize;

use pulse_index::{AlertSeverity, Granularity, IndexConfig, Snapshot};
use pulse_pipeline::metric_loader::{distinct_periods, load_metrics_file};
use pulse_pipeline::{MemorySnapshotStore, SnapshotPipeline, SnapshotRequest};

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, ValueEnum)]
enum GranularityArg {
    Week,
    Month,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Week => Granularity::Week,
            GranularityArg::Month => Granularity::Month,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pulse-server", version, about = "Retail KPI index snapshots")]
struct Cli {
    /// Metrics CSV (store_id, period_start, period_end, key, value, history).
    metrics: PathBuf,
    /// TOML file overriding weight tables and alert thresholds.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = GranularityArg::Week)]
    granularity: GranularityArg,
    /// Comma-separated store IDs to score (default: every store in the CSV).
    #[arg(long, value_delimiter = ',')]
    stores: Option<Vec<String>>,
    /// JSON snapshot file. Earlier snapshots are read from it and the new
    /// ones written back.
    #[arg(long)]
    snapshots: Option<PathBuf>,
    /// Output as JSON instead of formatted text.
    #[arg(long)]
    json: bool,
}

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct RunJson<'a> {
    generated_at: String,
    granularity: Granularity,
    store_filter: Vec<String>,
    pipeline_ms: u128,
    snapshots: &'a [Snapshot],
    summary: SummaryJson,
}

#[derive(Serialize)]
struct SummaryJson {
    stores_scored: usize,
    snapshots_computed: usize,
    records_processed: usize,
    warnings: usize,
    criticals: usize,
    lowest_overall: Option<LowestJson>,
}

#[derive(Serialize)]
struct LowestJson {
    store_id: String,
    period_start: String,
    overall_index: f64,
}

fn build_summary(snapshots: &[Snapshot], total_records: usize) -> SummaryJson {
    let mut stores: Vec<&str> = snapshots.iter().map(|s| s.store_id.as_str()).collect();
    stores.sort();
    stores.dedup();

    let count = |severity: AlertSeverity| {
        snapshots
            .iter()
            .flat_map(|s| s.alerts.iter())
            .filter(|a| a.severity == severity)
            .count()
    };

    let lowest = snapshots
        .iter()
        .min_by(|a, b| a.overall_index.total_cmp(&b.overall_index))
        .map(|s| LowestJson {
            store_id: s.store_id.clone(),
            period_start: s.period_start.to_string(),
            overall_index: s.overall_index,
        });

    SummaryJson {
        stores_scored: stores.len(),
        snapshots_computed: snapshots.len(),
        records_processed: total_records,
        warnings: count(AlertSeverity::Warning),
        criticals: count(AlertSeverity::Critical),
        lowest_overall: lowest,
    }
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

fn format_delta(delta: f64) -> String {
    if delta == 0.0 {
        "  \u{00b7}".to_string()
    } else {
        format!("{:+3.0}", delta)
    }
}

/// Ten-cell bar for a 0-100 index.
fn index_bar(index: f64) -> String {
    let filled = (index / 10.0).round().clamp(0.0, 10.0) as usize;
    format!("{}{}", "\u{2588}".repeat(filled), "\u{2591}".repeat(10 - filled))
}

fn print_human(
    snapshots: &[Snapshot],
    summary: &SummaryJson,
    config: &IndexConfig,
    load_ms: u128,
    pipeline_ms: u128,
) {
    let rule = "\u{2550}".repeat(62);
    println!();
    println!("  \u{2554}{}\u{2557}", rule);
    println!("  \u{2551}{:^62}\u{2551}", "STORE PULSE \u{00b7} KPI Index Digest");
    println!("  \u{255a}{}\u{255d}", rule);
    println!();
    println!(
        "  {} stores scored  \u{00b7}  {} snapshots  \u{00b7}  {} records processed",
        summary.stores_scored, summary.snapshots_computed, summary.records_processed
    );
    println!(
        "  {} critical  \u{00b7}  {} warning alerts",
        summary.criticals, summary.warnings
    );
    println!();

    if snapshots.is_empty() {
        println!("  No periods to score.");
    }

    for snapshot in snapshots {
        println!("  {:\u{2500}<64}", "");
        println!(
            "  {}  {} {} .. {}",
            snapshot.store_id, snapshot.granularity, snapshot.period_start, snapshot.period_end
        );
        println!();
        println!(
            "     {:24} {:>3}  {}  {}",
            "Overall",
            snapshot.overall_index,
            index_bar(snapshot.overall_index),
            format_delta(snapshot.overall_delta)
        );
        for category in &snapshot.category_indices {
            let delta = snapshot
                .deltas
                .get(&category.category)
                .copied()
                .unwrap_or(0.0);
            println!(
                "     {:24} {:>3}  {}  {}   ({} of {} metrics)",
                category.category.to_string(),
                category.index,
                index_bar(category.index),
                format_delta(delta),
                category.components.len(),
                config.categories.table(category.category).components.len()
            );
        }
        if !snapshot.alerts.is_empty() {
            println!();
            for alert in &snapshot.alerts {
                let icon = match alert.severity {
                    AlertSeverity::Critical => "!!",
                    AlertSeverity::Warning => "! ",
                };
                println!("     {} {}", icon, alert.message);
            }
        }
        println!();
    }
    if !snapshots.is_empty() {
        println!("  {:\u{2500}<64}", "");
    }

    println!();
    println!(
        "  \u{23f1}  CSV loaded in {}ms \u{00b7} Pipeline ran in {}ms \u{00b7} Total {}ms",
        load_ms,
        pipeline_ms,
        load_ms + pipeline_ms
    );
    println!();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    let granularity = Granularity::from(cli.granularity);

    let config = match &cli.config {
        Some(path) => IndexConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => IndexConfig::default(),
    };

    // Load metric data from CSV
    let load_start = Instant::now();
    let records = load_metrics_file(&cli.metrics)
        .with_context(|| format!("loading metrics {}", cli.metrics.display()))?;
    let load_ms = load_start.elapsed().as_millis();
    let total_records = records.len();

    let store_filter = cli.stores.clone().unwrap_or_default();
    let requested_at = Utc::now();
    let requests: Vec<SnapshotRequest> = distinct_periods(&records)
        .into_iter()
        .filter(|(store_id, _)| store_filter.is_empty() || store_filter.contains(store_id))
        .enumerate()
        .map(|(i, (store_id, period))| {
            SnapshotRequest::new(
                format!("cli-{:04}", i + 1),
                store_id,
                period,
                granularity,
                requested_at,
            )
        })
        .collect();

    if requests.is_empty() && !store_filter.is_empty() {
        bail!(
            "none of the requested stores ({}) appear in {}",
            store_filter.join(", "),
            cli.metrics.display()
        );
    }

    let store = Arc::new(match &cli.snapshots {
        Some(path) => MemorySnapshotStore::load_json(path)
            .with_context(|| format!("loading snapshots {}", path.display()))?,
        None => MemorySnapshotStore::new(),
    });

    let pipeline = Arc::new(SnapshotPipeline::with_records(
        records,
        config,
        Arc::clone(&store),
    ));

    let pipeline_start = Instant::now();
    let snapshots = pipeline
        .execute_all(requests)
        .await
        .context("computing snapshots")?;
    let pipeline_ms = pipeline_start.elapsed().as_millis();

    if let Some(path) = &cli.snapshots {
        store
            .save_json(path)
            .with_context(|| format!("saving snapshots {}", path.display()))?;
        log::info!("saved {} snapshots to {}", store.len(), path.display());
    }

    let summary = build_summary(&snapshots, total_records);
    if cli.json {
        let output = RunJson {
            generated_at: requested_at.to_rfc3339(),
            granularity,
            store_filter,
            pipeline_ms,
            snapshots: &snapshots,
            summary,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_human(
            &snapshots,
            &summary,
            pipeline.engine().config(),
            load_ms,
            pipeline_ms,
        );
    }
    Ok(())
}
