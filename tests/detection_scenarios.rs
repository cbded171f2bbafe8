//! Detection Scenarios
//!
//! End-to-end behaviour of matching, scoring and the scan pipeline using
//! the synthetic front-end. Everything runs in-process; durable storage
//! goes to a temp directory.

use rf_sentinel::acquisition::{FrontEnd, SyntheticFrontEnd, Tuning};
use rf_sentinel::baseline::{builtin_profiles, matcher, BaselineEntry, BaselineStore, ToleranceProfile};
use rf_sentinel::config::{ScanTarget, SentinelConfig};
use rf_sentinel::pipeline::{ScanLoop, ScanOrchestrator, StepOutcome};
use rf_sentinel::processing::FeatureExtractor;
use rf_sentinel::scoring::{baseline_deviation, confidence, QualityReport, ScoringSettings};
use rf_sentinel::storage::{decode_blobs, DetectionSink, InMemorySink, PersistenceError, SledDetectionStore};
use rf_sentinel::types::{DetectionRecord, SpectralFeatures};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const SEED: u64 = 11;

fn target(frequency_hz: f64, label: &str) -> ScanTarget {
    ScanTarget {
        frequency_hz,
        label: label.to_string(),
    }
}

fn sweep_plan() -> Vec<ScanTarget> {
    vec![
        target(95e6, "wfm"),
        target(140e6, "walkie_vhf"),
        target(150e6, "walkie_vhf"),
    ]
}

fn config() -> SentinelConfig {
    let mut config = SentinelConfig::default();
    config.device.sample_count = 4096;
    config.scan.frequencies = sweep_plan();
    config.storage.retry_backoff_ms = 0;
    config
}

/// Baseline where 95 MHz is measured from the same emitters (so it matches)
/// and 150 MHz expects a level no real signal reaches (so it always detects).
fn baseline(config: &SentinelConfig) -> BaselineStore {
    let mut fe = SyntheticFrontEnd::from_targets(SEED + 1000, &sweep_plan());
    let mut extractor = FeatureExtractor::from_config(config);
    fe.configure(&Tuning::new(95e6, &config.device)).unwrap();
    let features = extractor.extract(&fe.read(config.device.sample_count).unwrap(), config.device.sample_rate_hz);

    let mut wfm = BaselineEntry::from_features(95e6, "wfm", &features, 0.0);
    // Noise-peak counts vary too much between blocks to pin here
    wfm.num_peaks = None;

    let mut quiet = BaselineEntry::new(150e6, "walkie_vhf");
    quiet.peak_power_db = Some(-200.0);

    BaselineStore::new(vec![wfm, quiet], config.tolerance_profiles(), config.default_tolerance.clone()).unwrap()
}

fn front_end() -> Box<dyn FrontEnd> {
    Box::new(SyntheticFrontEnd::from_targets(SEED, &sweep_plan()).failing_at(140e6))
}

// ============================================================================
// Matching and scoring
// ============================================================================

fn wfm_features(peak_power_db: f64) -> SpectralFeatures {
    SpectralFeatures {
        peak_power_db,
        noise_floor_db: -40.0,
        mean_power_db: -35.0,
        std_power_db: 6.0,
        snr_db: 50.0,
        bandwidth_hz: 200_000.0,
        ..SpectralFeatures::default()
    }
}

fn wfm_store() -> BaselineStore {
    let mut entry = BaselineEntry::new(95e6, "wfm");
    entry.bandwidth_hz = Some(200_000.0);
    entry.peak_power_db = Some(10.0);
    entry.noise_floor_db = Some(-40.0);
    entry.snr_db = Some(50.0);
    entry.mean_power_db = Some(-35.0);
    entry.std_power_db = Some(6.0);
    BaselineStore::new(vec![entry], builtin_profiles(), ToleranceProfile::default()).unwrap()
}

#[test]
fn wfm_at_95mhz_matches_its_baseline() {
    let verdict = matcher::matches(&wfm_store(), 95e6, "wfm", &wfm_features(10.0));
    assert!(verdict.matched);
    assert_eq!(verdict.entry.map(|e| e.frequency_hz), Some(95e6));
}

#[test]
fn wfm_peak_drop_is_detected_with_positive_deviation() {
    let store = wfm_store();
    let features = wfm_features(-5.0);
    let verdict = matcher::matches(&store, 95e6, "wfm", &features);
    assert!(!verdict.matched);

    let report = QualityReport::compute(
        &features,
        verdict.entry.as_ref(),
        &verdict.tolerance,
        &ScoringSettings::default(),
    );
    assert!(report.baseline_deviation > 0.0);
    assert!((report.baseline_deviation - 7.5).abs() < 1e-9);
    assert!(report.confidence_score < 100.0);
}

/// Broadcast FM at 95 MHz as collected on site.
fn collected_wfm_store() -> BaselineStore {
    let mut entry = BaselineEntry::new(95e6, "wfm");
    entry.peak_power_db = Some(-20.0);
    entry.noise_floor_db = Some(-60.0);
    entry.snr_db = Some(40.0);
    entry.bandwidth_hz = Some(180_000.0);
    let mut profiles = builtin_profiles();
    profiles.insert("wfm".to_string(), ToleranceProfile::uniform(1_000.0, 0.15, 8.0, 3));
    BaselineStore::new(vec![entry], profiles, ToleranceProfile::default()).unwrap()
}

fn wfm_measurement(peak_power_db: f64) -> SpectralFeatures {
    SpectralFeatures {
        peak_power_db,
        noise_floor_db: -60.0,
        snr_db: 38.0,
        bandwidth_hz: 170_000.0,
        ..SpectralFeatures::default()
    }
}

#[test]
fn collected_wfm_within_tolerance_matches_with_high_confidence() {
    let store = collected_wfm_store();
    let measured = wfm_measurement(-22.0);
    let verdict = matcher::matches(&store, 95e6, "wfm", &measured);
    assert!(verdict.matched, "failed fields: {:?}", verdict.failed_fields);

    let entry = verdict.entry.unwrap();
    let tol = verdict.tolerance;
    let max_dev = ScoringSettings::default().max_deviation;
    let peak = confidence(measured.peak_power_db, entry.peak_power_db, tol.peak_power_tol_db, max_dev);
    let snr = confidence(measured.snr_db, entry.snr_db, tol.snr_tol_db, max_dev);
    let bandwidth = confidence(measured.bandwidth_hz, entry.bandwidth_hz, tol.bandwidth_tol_hz, max_dev);
    assert!((peak - 87.5).abs() < 1e-9);
    assert!((snr - 87.5).abs() < 1e-9);
    assert!(bandwidth > 99.9 && bandwidth <= 100.0);
    assert!([peak, snr, bandwidth].iter().all(|c| *c > 50.0));
}

#[test]
fn collected_wfm_with_strong_peak_is_detected() {
    let store = collected_wfm_store();
    let measured = wfm_measurement(-5.0);
    let verdict = matcher::matches(&store, 95e6, "wfm", &measured);
    assert!(!verdict.matched);

    let deviation = baseline_deviation(&measured, verdict.entry.as_ref());
    assert!(deviation > 0.0);
    // (|-5 - -20| + |170 kHz - 180 kHz| in kHz) / 2
    assert!((deviation - 12.5).abs() < 1e-9);
}

#[test]
fn offset_beyond_frequency_tolerance_is_detected() {
    let (matched, entry) = matcher::matches(&wfm_store(), 95.002e6, "wfm", &wfm_features(10.0)).into_parts();
    assert!(!matched);
    assert!(entry.is_none());
}

// ============================================================================
// Orchestrated sweeps
// ============================================================================

#[test]
fn sequence_increases_only_on_detections() {
    let config = config();
    let sink = Arc::new(InMemorySink::new());
    let mut orch = ScanOrchestrator::new(&config, baseline(&config), front_end(), sink.clone()).unwrap();
    let cancel = CancellationToken::new();

    for scan in 1..=3u64 {
        let summary = orch.run_scan(&cancel).unwrap();
        assert_eq!(summary.scan_number, scan);
        assert_eq!(summary.matched, 1, "95 MHz should match on scan {scan}");
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.detected, 1);
    }

    let records = sink.records();
    let seqs: Vec<u64> = records.iter().map(|r| r.detection_sequence).collect();
    assert_eq!(seqs, vec![1, 2, 3]);
    assert!(records.iter().all(|r| r.frequency_hz == 150e6 && r.label == "walkie_vhf"));
    assert_eq!(records.iter().map(|r| r.scan_number).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(orch.stats().matched, 3);
}

#[test]
fn waterfall_history_is_bounded_by_capacity() {
    let mut config = config();
    config.device.sample_count = 1024;
    config.scan.waterfall_capacity = 4;
    let sink = Arc::new(InMemorySink::new());
    let mut orch = ScanOrchestrator::new(&config, baseline(&config), front_end(), sink.clone()).unwrap();
    let cancel = CancellationToken::new();
    for _ in 0..7 {
        orch.run_scan(&cancel).unwrap();
    }
    assert_eq!(orch.waterfall().len(150e6), 4);
    assert_eq!(orch.waterfall().len(140e6), 0);
    assert!(sink.records().iter().all(|r| r.waterfall_rows <= 4));
}

/// Rejects every write.
struct BrokenSink {
    attempts: AtomicU32,
}

impl DetectionSink for BrokenSink {
    fn store(&self, _record: &DetectionRecord) -> Result<(), PersistenceError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PersistenceError::Storage("read-only filesystem".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "broken"
    }
}

#[test]
fn persistence_failure_drops_record_after_retries() {
    let mut config = config();
    config.storage.persist_retries = 2;
    let sink = Arc::new(BrokenSink {
        attempts: AtomicU32::new(0),
    });
    let mut orch = ScanOrchestrator::new(&config, baseline(&config), front_end(), sink.clone()).unwrap();

    let quiet = target(150e6, "walkie_vhf");
    assert_eq!(orch.process_target(&quiet).unwrap(), StepOutcome::Dropped { sequence: 1 });
    assert_eq!(orch.process_target(&quiet).unwrap(), StepOutcome::Dropped { sequence: 2 });
    assert_eq!(sink.attempts.load(Ordering::SeqCst), 4);

    let summary = orch.run_scan(&CancellationToken::new()).unwrap();
    assert_eq!(summary.dropped, 1);
}

// ============================================================================
// Durable runs
// ============================================================================

#[tokio::test]
async fn durable_run_resumes_sequence_after_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config();
    config.storage.data_dir = dir.path().to_path_buf();

    let first_run = {
        let store = Arc::new(SledDetectionStore::open(config.detections_db_path()).unwrap());
        let orch = ScanOrchestrator::new(&config, baseline(&config), front_end(), store.clone()).unwrap();
        let stats = ScanLoop::new(orch, CancellationToken::new(), Duration::from_millis(1))
            .with_max_scans(Some(2))
            .run()
            .await
            .unwrap();
        assert_eq!(stats.detected, 2);
        stats.last_sequence
    };
    assert_eq!(first_run, 2);

    let store = Arc::new(SledDetectionStore::open(config.detections_db_path()).unwrap());
    let last = store.last_sequence().unwrap().unwrap_or(0);
    assert_eq!(last, 2);
    let orch = ScanOrchestrator::new(&config, baseline(&config), front_end(), store.clone())
        .unwrap()
        .resume_sequence_after(last);
    ScanLoop::new(orch, CancellationToken::new(), Duration::from_millis(1))
        .with_max_scans(Some(1))
        .run()
        .await
        .unwrap();

    let recent = store.recent(10).unwrap();
    let seqs: Vec<u64> = recent.iter().map(|r| r.detection_sequence).collect();
    assert_eq!(seqs, vec![3, 2, 1]);

    let blobs = decode_blobs(&recent[1]).unwrap();
    assert_eq!(blobs.power_spectrum.len(), config.scan.spectrum_width);
    assert_eq!(blobs.raw_samples.len(), config.scan.raw_snippet_len);
    assert_eq!(blobs.waterfall.len(), 2);
    assert!(blobs.peak_frequencies.len() <= config.detection.max_reported_peaks);
}

#[tokio::test]
async fn cancelled_before_start_runs_no_scan() {
    let config = config();
    let sink = Arc::new(InMemorySink::new());
    let orch = ScanOrchestrator::new(&config, baseline(&config), front_end(), sink.clone()).unwrap();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let stats = ScanLoop::new(orch, cancel, Duration::from_secs(60)).run().await.unwrap();
    assert_eq!(stats.scans, 0);
    assert!(sink.is_empty());
}
