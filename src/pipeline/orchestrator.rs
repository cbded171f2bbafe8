//! Scan Orchestrator - one sweep over the target list
//!
//! ```text
//! for each target:
//!   1. Acquire      configure + read on the front-end (failure: skip step)
//!   2. Extract      SpectralFeatures from the block
//!   3. Waterfall    push the spectrum into the per-frequency history
//!   4. Match        first-match-wins against same-label baseline entries
//!   5. Score        (unmatched only) quality, confidence, drift, duration
//!   6. Persist      (unmatched only) assemble record, store with retry
//! ```
//!
//! The orchestrator owns every piece of mutable scan state: the waterfall
//! map, the signal tracker and both counters. It is a plain blocking value;
//! the async scan loop moves it onto a blocking thread for each sweep.

use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::{RunStats, ScanPhase, ScanSummary, StepOutcome};
use super::tracker::SignalTracker;
use crate::acquisition::{DeviceError, FrontEnd, Tuning};
use crate::baseline::{matcher, BaselineStore, MatchVerdict};
use crate::config::{DeviceConfig, ScanTarget, SentinelConfig};
use crate::processing::{downsample, FeatureExtractor, WaterfallBuffer};
use crate::scoring::{QualityReport, ScoringSettings};
use crate::storage::codec::{encode_complex, encode_f32, encode_f32_slice, encode_waterfall};
use crate::storage::{persist_with_retry, DetectionSink, PersistenceError, RetryPolicy};
use crate::types::{DetectionBlobs, DetectionRecord, DeviceIdentity, ScanSample, SpectralFeatures};

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("nothing to scan: no configured frequencies and an empty baseline")]
    NoTargets,

    #[error("front-end failure: {0}")]
    Device(#[from] DeviceError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("scan worker failed: {0}")]
    Worker(String),
}

pub struct ScanOrchestrator {
    device: DeviceConfig,
    identity: DeviceIdentity,
    targets: Vec<ScanTarget>,
    baseline: BaselineStore,
    front_end: Box<dyn FrontEnd>,
    sink: Arc<dyn DetectionSink>,
    extractor: FeatureExtractor,
    waterfall: WaterfallBuffer,
    tracker: SignalTracker,
    scoring: ScoringSettings,
    retry: RetryPolicy,
    spectrum_width: usize,
    raw_snippet_len: usize,
    scan_number: u64,
    detection_sequence: u64,
    phase: ScanPhase,
    stats: RunStats,
}

impl ScanOrchestrator {
    /// Build from config. The sweep plan is `scan.frequencies`, or every
    /// distinct baseline (frequency, label) when that list is empty.
    pub fn new(
        config: &SentinelConfig,
        baseline: BaselineStore,
        front_end: Box<dyn FrontEnd>,
        sink: Arc<dyn DetectionSink>,
    ) -> Result<Self, ScanError> {
        let targets = if config.scan.frequencies.is_empty() {
            baseline.scan_targets()
        } else {
            config.scan.frequencies.clone()
        };
        if targets.is_empty() {
            return Err(ScanError::NoTargets);
        }

        let extractor = FeatureExtractor::from_config(config);
        let waterfall = WaterfallBuffer::new(config.scan.waterfall_capacity, config.scan.spectrum_width);

        info!(
            targets = targets.len(),
            baseline_entries = baseline.len(),
            front_end = front_end.name(),
            sink = sink.backend_name(),
            statistics = extractor.backend_name(),
            peak_threshold_db = extractor.settings().peak_threshold_db,
            waterfall_capacity = waterfall.capacity(),
            "Scan orchestrator ready"
        );

        Ok(Self {
            device: config.device.clone(),
            identity: DeviceIdentity {
                label: config.device.label.clone(),
                latitude: config.device.latitude,
                longitude: config.device.longitude,
            },
            targets,
            baseline,
            front_end,
            sink,
            extractor,
            waterfall,
            tracker: SignalTracker::new(config.scan.drift_history_len, config.scan.statistics.backend()),
            scoring: ScoringSettings::from(&config.detection),
            retry: RetryPolicy::new(config.storage.persist_retries, config.storage.retry_backoff_ms),
            spectrum_width: config.scan.spectrum_width,
            raw_snippet_len: config.scan.raw_snippet_len,
            scan_number: 0,
            detection_sequence: 0,
            phase: ScanPhase::Idle,
            stats: RunStats::default(),
        })
    }

    /// Continue numbering after `last` (e.g. the highest sequence already
    /// in a durable store).
    #[must_use]
    pub fn resume_sequence_after(mut self, last: u64) -> Self {
        self.detection_sequence = last;
        self.stats.last_sequence = last;
        self
    }

    pub fn targets(&self) -> &[ScanTarget] {
        &self.targets
    }

    pub fn phase(&self) -> ScanPhase {
        self.phase
    }

    pub fn scan_number(&self) -> u64 {
        self.scan_number
    }

    /// Last detection sequence assigned.
    pub fn detection_sequence(&self) -> u64 {
        self.detection_sequence
    }

    pub fn waterfall(&self) -> &WaterfallBuffer {
        &self.waterfall
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    fn transition(&mut self, next: ScanPhase) {
        debug!(from = %self.phase, to = %next, "Scan phase");
        self.phase = next;
    }

    /// One sweep over every target.
    ///
    /// Cancellation is checked before each step; a step in progress always
    /// completes. Only a lost front-end aborts the sweep with an error.
    pub fn run_scan(&mut self, cancel: &CancellationToken) -> Result<ScanSummary, ScanError> {
        self.scan_number += 1;
        let scan = self.scan_number;
        self.transition(ScanPhase::Scanning { scan });

        let mut summary = ScanSummary {
            scan_number: scan,
            ..ScanSummary::default()
        };

        for index in 0..self.targets.len() {
            if cancel.is_cancelled() {
                summary.cancelled = true;
                break;
            }
            let target = self.targets[index].clone();
            self.transition(ScanPhase::PerFrequency {
                scan,
                frequency_hz: target.frequency_hz,
            });

            match self.process_target(&target) {
                Ok(StepOutcome::Matched) => summary.matched += 1,
                Ok(StepOutcome::Detected { .. }) => summary.detected += 1,
                Ok(StepOutcome::Dropped { .. }) => summary.dropped += 1,
                Err(e) if e.is_fatal() => {
                    summary.skipped += 1;
                    self.stats.absorb(&summary);
                    self.stats.last_sequence = self.detection_sequence;
                    warn!(frequency_hz = target.frequency_hz, error = %e, "Front-end lost, aborting scan");
                    return Err(ScanError::Device(e));
                }
                Err(e) => {
                    summary.skipped += 1;
                    warn!(
                        frequency_hz = target.frequency_hz,
                        label = %target.label,
                        error = %e,
                        "Skipping frequency"
                    );
                }
            }
        }

        self.stats.absorb(&summary);
        self.stats.last_sequence = self.detection_sequence;
        self.transition(ScanPhase::Idle);

        info!(
            scan = summary.scan_number,
            matched = summary.matched,
            detected = summary.detected,
            skipped = summary.skipped,
            dropped = summary.dropped,
            cancelled = summary.cancelled,
            "Scan complete"
        );
        Ok(summary)
    }

    /// Acquire, extract, match and, when unmatched, record one target.
    pub fn process_target(&mut self, target: &ScanTarget) -> Result<StepOutcome, DeviceError> {
        let frequency_hz = target.frequency_hz;

        self.front_end
            .configure(&Tuning::new(frequency_hz, &self.device))?;
        let samples = self.front_end.read(self.device.sample_count)?;
        let sample = ScanSample::new(frequency_hz, target.label.clone(), samples, self.device.sample_rate_hz);

        let features = self.extractor.extract_sample(&sample);
        self.waterfall.push(frequency_hz, &features.power_spectrum);
        if features.num_peaks > 0 {
            self.tracker
                .record_dominant(frequency_hz, frequency_hz + features.dominant_frequency_hz);
        }

        let verdict = matcher::matches(&self.baseline, frequency_hz, &target.label, &features);
        if verdict.matched {
            self.transition(ScanPhase::Matched { frequency_hz });
            return Ok(StepOutcome::Matched);
        }

        self.detection_sequence += 1;
        let sequence = self.detection_sequence;
        self.transition(ScanPhase::Detected { frequency_hz, sequence });

        let record = self.build_record(&sample, &features, &verdict, sequence);
        match persist_with_retry(self.sink.as_ref(), &record, self.retry) {
            Ok(()) => {
                info!(
                    frequency_hz,
                    label = %target.label,
                    sequence,
                    confidence = record.confidence_score,
                    deviation = record.baseline_deviation,
                    failed = ?verdict.failed_fields,
                    "Detection recorded"
                );
                Ok(StepOutcome::Detected {
                    sequence,
                    confidence: record.confidence_score,
                })
            }
            Err(e) => {
                warn!(frequency_hz, sequence, error = %e, "Detection dropped after retries");
                Ok(StepOutcome::Dropped { sequence })
            }
        }
    }

    fn build_record(
        &mut self,
        sample: &ScanSample,
        features: &SpectralFeatures,
        verdict: &MatchVerdict,
        sequence: u64,
    ) -> DetectionRecord {
        let frequency_hz = sample.frequency_hz;
        let quality = QualityReport::compute(features, verdict.entry.as_ref(), &verdict.tolerance, &self.scoring);

        let mut record = DetectionRecord::from_features(
            sample.timestamp,
            frequency_hz,
            &sample.label,
            self.identity.clone(),
            features,
        );
        record.confidence_score = quality.confidence_score;
        record.signal_quality_index = quality.signal_quality_index;
        record.interference_level = quality.interference_level;
        record.baseline_deviation = quality.baseline_deviation;
        record.bandwidth_efficiency = quality.bandwidth_efficiency;
        record.activity_score = quality.activity_score;
        record.doppler_shift_estimate = self.tracker.doppler_estimate(frequency_hz);
        record.signal_duration_s = self
            .tracker
            .signal_duration(frequency_hz, &sample.label, sample.timestamp);
        record.scan_number = self.scan_number;
        record.detection_sequence = sequence;

        let snapshot = self.waterfall.snapshot(frequency_hz);
        let waterfall = if snapshot.is_empty() {
            None
        } else {
            let (blob, rows) = encode_waterfall(&snapshot);
            record.waterfall_rows = rows;
            Some(blob)
        };
        record.blobs = DetectionBlobs {
            power_spectrum: encode_f32_slice(&downsample(&features.power_spectrum, self.spectrum_width)),
            raw_samples: encode_complex(sample.snippet(self.raw_snippet_len)),
            waterfall,
            peak_frequencies: encode_f32(&features.peak_frequencies_hz),
        };
        record
    }

    /// Flush the sink and stop. Safe to call more than once.
    pub fn shutdown(&mut self) -> Result<(), ScanError> {
        if self.phase == ScanPhase::Stopped {
            return Ok(());
        }
        self.transition(ScanPhase::ShuttingDown);
        let flushed = self.sink.flush();
        self.transition(ScanPhase::Stopped);
        flushed?;
        info!(
            scans = self.stats.scans,
            detected = self.stats.detected,
            last_sequence = self.stats.last_sequence,
            "Scan orchestrator stopped"
        );
        Ok(())
    }
}
