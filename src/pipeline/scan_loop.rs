//! Async scan loop: sweep, sleep, repeat until cancelled.
//!
//! Sweeps are blocking (front-end I/O, FFT, sled writes), so each one runs on
//! the blocking pool with the orchestrator moved in and handed back. The
//! inter-scan sleep is the only await point that races the cancellation
//! token.

use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use super::orchestrator::{ScanError, ScanOrchestrator};
use super::state::RunStats;

pub struct ScanLoop {
    orchestrator: ScanOrchestrator,
    cancel: CancellationToken,
    interval: Duration,
    max_scans: Option<u64>,
}

impl ScanLoop {
    pub fn new(orchestrator: ScanOrchestrator, cancel: CancellationToken, interval: Duration) -> Self {
        Self {
            orchestrator,
            cancel,
            interval,
            max_scans: None,
        }
    }

    /// Stop after `scans` sweeps even without cancellation.
    #[must_use]
    pub fn with_max_scans(mut self, scans: Option<u64>) -> Self {
        self.max_scans = scans;
        self
    }

    /// Run until cancelled, the scan bound is reached, or the front-end is
    /// lost. The sink is flushed on every exit path that still owns the
    /// orchestrator.
    pub async fn run(self) -> Result<RunStats, ScanError> {
        let Self {
            mut orchestrator,
            cancel,
            interval,
            max_scans,
        } = self;

        info!(
            targets = orchestrator.targets().len(),
            interval_secs = interval.as_secs_f64(),
            max_scans = ?max_scans,
            "Scan loop started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let token = cancel.clone();
            let (returned, result) = tokio::task::spawn_blocking(move || {
                let result = orchestrator.run_scan(&token);
                (orchestrator, result)
            })
            .await
            .map_err(|e| ScanError::Worker(e.to_string()))?;
            orchestrator = returned;

            let summary = match result {
                Ok(summary) => summary,
                Err(e) => {
                    error!(error = %e, "Scan loop stopping");
                    orchestrator.shutdown()?;
                    return Err(e);
                }
            };

            if summary.cancelled || max_scans.is_some_and(|max| orchestrator.scan_number() >= max) {
                break;
            }

            tokio::select! {
                () = cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                () = tokio::time::sleep(interval) => {}
            }
        }

        orchestrator.shutdown()?;
        let stats = orchestrator.stats().clone();
        info!(
            scans = stats.scans,
            matched = stats.matched,
            detected = stats.detected,
            skipped = stats.skipped,
            dropped = stats.dropped,
            "Scan loop finished"
        );
        Ok(stats)
    }
}
