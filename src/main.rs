//! rf-sentinel - RF spectrum anomaly detection
//!
//! # Usage
//!
//! ```bash
//! # Collect a baseline from the synthetic front-end
//! rf-sentinel collect-baseline --synthetic --output ./data/baseline.json
//!
//! # Scan against it until Ctrl+C
//! rf-sentinel listen --synthetic
//!
//! # Replay recorded captures for three sweeps
//! rf-sentinel listen --iq-dir ./captures --scans 3
//!
//! # Show the latest detections
//! rf-sentinel inspect --limit 5
//! ```
//!
//! # Environment Variables
//!
//! - `RF_SENTINEL_CONFIG`: Path to sentinel.toml (default: ./sentinel.toml, then built-ins)
//! - `RUST_LOG`: Logging level (default: info)
//! - `RESET_DB`: Set to "true", "1" or "yes" to wipe the data directory on startup

use anyhow::{bail, Context, Result};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rf_sentinel::acquisition::{FrontEnd, IqFileFrontEnd, SyntheticFrontEnd};
use rf_sentinel::baseline::{BaselineCollector, BaselineStore};
use rf_sentinel::config::{ScanTarget, SentinelConfig};
use rf_sentinel::pipeline::{ScanLoop, ScanOrchestrator};
use rf_sentinel::processing::FeatureExtractor;
use rf_sentinel::storage::{decode_blobs, ProcessLock, SledDetectionStore};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "rf-sentinel")]
#[command(about = "RF spectrum anomaly detection against a site baseline")]
#[command(version)]
struct CliArgs {
    /// Load this config file instead of searching (errors are fatal)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Wipe the data directory (detection store, lock file) on startup.
    /// Accepts true/1/yes from the environment.
    #[arg(long, global = true, env = "RESET_DB", value_parser = BoolishValueParser::new())]
    reset_db: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan the target list against the baseline until Ctrl+C (default)
    Listen {
        /// Baseline file (default: [baseline].path from config)
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Stop after this many sweeps
        #[arg(long, value_name = "N")]
        scans: Option<u64>,

        #[command(flatten)]
        front_end: FrontEndArgs,
    },

    /// Measure every target once and write a baseline file
    CollectBaseline {
        /// Output file (default: [baseline].path from config)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Write the partial baseline every N entries
        #[arg(long, value_name = "N")]
        checkpoint_every: Option<usize>,

        #[command(flatten)]
        front_end: FrontEndArgs,
    },

    /// Print the most recent detections from the store
    Inspect {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

#[derive(Args, Debug, Clone, Default)]
struct FrontEndArgs {
    /// Use the seeded synthetic front-end
    #[arg(long, conflicts_with = "iq_dir")]
    synthetic: bool,

    /// Replay <frequency_hz>.cf32 captures from this directory
    #[arg(long, value_name = "DIR")]
    iq_dir: Option<PathBuf>,

    /// Seed for the synthetic front-end
    #[arg(long, default_value_t = 1)]
    seed: u64,
}

impl FrontEndArgs {
    fn build(&self, targets: &[ScanTarget]) -> Result<Box<dyn FrontEnd>> {
        if let Some(dir) = &self.iq_dir {
            if !dir.is_dir() {
                bail!("--iq-dir {} is not a directory", dir.display());
            }
            info!(dir = %dir.display(), "Front-end: capture replay");
            return Ok(Box::new(IqFileFrontEnd::new(dir)));
        }
        if self.synthetic {
            info!(seed = self.seed, emitters = targets.len(), "Front-end: synthetic");
            return Ok(Box::new(SyntheticFrontEnd::from_targets(self.seed, targets)));
        }
        bail!("no front-end selected: pass --synthetic or --iq-dir DIR")
    }
}

// ============================================================================
// Startup helpers
// ============================================================================

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(explicit: Option<&Path>) -> Result<SentinelConfig> {
    match explicit {
        Some(path) => SentinelConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(SentinelConfig::load()),
    }
}

fn reset_data_directory(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        info!(path = %data_dir.display(), "Data directory does not exist, nothing to reset");
        return Ok(());
    }
    warn!(path = %data_dir.display(), "RESET_DB requested, removing data directory");
    std::fs::remove_dir_all(data_dir)
        .with_context(|| format!("Failed to remove data directory {}", data_dir.display()))
}

/// Token cancelled on the first Ctrl+C.
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received Ctrl+C, finishing current step");
        trigger.cancel();
    });
    token
}

// ============================================================================
// Subcommands
// ============================================================================

async fn run_listen(
    mut config: SentinelConfig,
    baseline: Option<PathBuf>,
    scans: Option<u64>,
    front_end: &FrontEndArgs,
) -> Result<()> {
    if let Some(path) = baseline {
        config.baseline.path = path;
    }
    let store = BaselineStore::from_config(&config).context("Failed to load baseline")?;

    let _lock = ProcessLock::acquire(&config.storage.data_dir)?;
    let detections = Arc::new(
        SledDetectionStore::open(config.detections_db_path()).context("Failed to open detection store")?,
    );
    let last_sequence = detections.last_sequence()?.unwrap_or(0);

    let targets = if config.scan.frequencies.is_empty() {
        store.scan_targets()
    } else {
        config.scan.frequencies.clone()
    };
    let front_end = front_end.build(&targets)?;

    let orchestrator = ScanOrchestrator::new(&config, store, front_end, detections)?
        .resume_sequence_after(last_sequence);

    info!(
        device = %config.device.label,
        sample_rate_hz = config.device.sample_rate_hz,
        sample_count = config.device.sample_count,
        interval_secs = config.scan.interval_secs,
        resume_after = last_sequence,
        "Listening"
    );

    let stats = ScanLoop::new(
        orchestrator,
        shutdown_token(),
        Duration::from_secs(config.scan.interval_secs),
    )
    .with_max_scans(scans)
    .run()
    .await?;

    info!(
        scans = stats.scans,
        detected = stats.detected,
        dropped = stats.dropped,
        "rf-sentinel shutdown complete"
    );
    Ok(())
}

async fn run_collect(
    config: SentinelConfig,
    output: Option<PathBuf>,
    checkpoint_every: Option<usize>,
    front_end: &FrontEndArgs,
) -> Result<()> {
    let targets = if config.scan.frequencies.is_empty() {
        BaselineCollector::default_targets()
    } else {
        config.scan.frequencies.clone()
    };
    let mut collector = BaselineCollector::new(
        front_end.build(&targets)?,
        FeatureExtractor::from_config(&config),
        config.device.clone(),
        output.unwrap_or_else(|| config.baseline.path.clone()),
        checkpoint_every.unwrap_or(config.baseline.checkpoint_every),
    );

    let cancel = shutdown_token();
    let report = tokio::task::spawn_blocking(move || collector.collect(&targets, &cancel))
        .await
        .context("Baseline collection worker failed")??;

    if report.collected == 0 {
        bail!("no baseline entries collected ({} targets skipped)", report.skipped);
    }
    info!(
        path = %report.path.display(),
        collected = report.collected,
        skipped = report.skipped,
        interrupted = report.interrupted,
        "Baseline written"
    );
    Ok(())
}

fn run_inspect(config: &SentinelConfig, limit: usize) -> Result<()> {
    let path = config.detections_db_path();
    let store = SledDetectionStore::open(&path)
        .with_context(|| format!("Failed to open {} (is a listener running?)", path.display()))?;

    let records = store.recent(limit)?;
    println!("{} detections stored, showing {}", store.len(), records.len());
    for record in &records {
        println!(
            "#{:<6} scan {:<5} {} {:>14.4} MHz {:<16} conf {:>5.1} sqi {:>5.1} dev {:>7.2} peaks {}",
            record.detection_sequence,
            record.scan_number,
            record.timestamp.format("%Y-%m-%d %H:%M:%S"),
            record.frequency_hz / 1e6,
            record.label,
            record.confidence_score,
            record.signal_quality_index,
            record.baseline_deviation,
            record.num_peaks,
        );
        match decode_blobs(record) {
            Ok(blobs) => println!(
                "        spectrum {} bins, raw {} samples, waterfall {} rows, peaks {:?}",
                blobs.power_spectrum.len(),
                blobs.raw_samples.len(),
                blobs.waterfall.len(),
                blobs.peak_frequencies,
            ),
            Err(e) => println!("        blobs unreadable: {e}"),
        }
    }
    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_tracing(args.json_logs);

    let config = load_config(args.config.as_deref())?;

    // Reset before any storage is opened
    if args.reset_db {
        reset_data_directory(&config.storage.data_dir)?;
    }

    match args.command {
        None => run_listen(config, None, None, &FrontEndArgs::default()).await,
        Some(Command::Listen {
            baseline,
            scans,
            front_end,
        }) => run_listen(config, baseline, scans, &front_end).await,
        Some(Command::CollectBaseline {
            output,
            checkpoint_every,
            front_end,
        }) => run_collect(config, output, checkpoint_every, &front_end).await,
        Some(Command::Inspect { limit }) => run_inspect(&config, limit),
    }
}
