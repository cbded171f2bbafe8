//! Baseline collection from live acquisitions.
//!
//! One block per target, measured with the same extractor the scanner uses,
//! so a freshly collected baseline matches an unchanged band. The partial
//! list is written every `checkpoint_every` entries and again on
//! cancellation.

use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{BaselineEntry, BaselineError, BaselineStore};
use crate::acquisition::{FrontEnd, Tuning};
use crate::config::{DeviceConfig, ScanTarget, SentinelConfig};
use crate::processing::FeatureExtractor;

/// Outcome of one collection run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionReport {
    pub collected: usize,
    /// Targets whose acquisition failed
    pub skipped: usize,
    /// Intermediate writes (the final write is not counted)
    pub checkpoints: usize,
    pub interrupted: bool,
    pub path: PathBuf,
}

pub struct BaselineCollector {
    front_end: Box<dyn FrontEnd>,
    extractor: FeatureExtractor,
    device: DeviceConfig,
    output: PathBuf,
    checkpoint_every: usize,
}

impl BaselineCollector {
    pub fn new(
        front_end: Box<dyn FrontEnd>,
        extractor: FeatureExtractor,
        device: DeviceConfig,
        output: impl Into<PathBuf>,
        checkpoint_every: usize,
    ) -> Self {
        Self {
            front_end,
            extractor,
            device,
            output: output.into(),
            checkpoint_every: checkpoint_every.max(1),
        }
    }

    /// Collector writing to the configured baseline path.
    pub fn from_config(front_end: Box<dyn FrontEnd>, config: &SentinelConfig) -> Self {
        Self::new(
            front_end,
            FeatureExtractor::from_config(config),
            config.device.clone(),
            config.baseline.path.clone(),
            config.baseline.checkpoint_every,
        )
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Sweep plan used when the config names no frequencies: broadcast FM
    /// and TV, the GSM-900 downlink, PMR446, VHF/UHF business radio and DMR.
    pub fn default_targets() -> Vec<ScanTarget> {
        let target = |frequency_hz: f64, label: &str| ScanTarget {
            frequency_hz,
            label: label.to_string(),
        };

        let mut targets = vec![target(95e6, "wfm"), target(104e6, "wfm"), target(49.25e6, "tv")];
        targets.extend((935..960).step_by(2).map(|mhz| target(f64::from(mhz) * 1e6, "gsm_nigeria_900")));
        targets.extend((0..4u8).map(|step| target(446.0e6 + f64::from(step) * 50_000.0, "walkie_pmr446")));
        targets.extend([140e6, 150e6, 160e6].map(|f| target(f, "walkie_vhf")));
        targets.extend([450e6, 485e6].map(|f| target(f, "walkie_uhf")));
        targets.push(target(147.3375e6, "dmr"));
        targets
    }

    /// Measure every target and write the baseline.
    ///
    /// Cancellation is checked between targets. Device failures skip the
    /// target unless the device is gone, which ends collection early with
    /// what was gathered so far.
    pub fn collect(
        &mut self,
        targets: &[ScanTarget],
        cancel: &CancellationToken,
    ) -> Result<CollectionReport, BaselineError> {
        let mut entries = Vec::with_capacity(targets.len());
        let mut report = CollectionReport {
            collected: 0,
            skipped: 0,
            checkpoints: 0,
            interrupted: false,
            path: self.output.clone(),
        };

        info!(
            targets = targets.len(),
            front_end = self.front_end.name(),
            output = %self.output.display(),
            "Baseline collection started"
        );

        for target in targets {
            if cancel.is_cancelled() {
                report.interrupted = true;
                break;
            }

            match self.measure(target) {
                Ok(entry) => {
                    debug!(
                        frequency_hz = target.frequency_hz,
                        label = %target.label,
                        snr_db = entry.snr_db.unwrap_or_default(),
                        "Baseline entry collected"
                    );
                    entries.push(entry);
                    if entries.len() % self.checkpoint_every == 0 {
                        BaselineStore::save_entries(&self.output, &entries)?;
                        report.checkpoints += 1;
                        info!(entries = entries.len(), "Baseline checkpoint written");
                    }
                }
                Err(e) if e.is_fatal() => {
                    warn!(error = %e, "Front-end lost, stopping collection");
                    report.skipped += 1;
                    report.interrupted = true;
                    break;
                }
                Err(e) => {
                    warn!(frequency_hz = target.frequency_hz, label = %target.label, error = %e, "Skipping baseline target");
                    report.skipped += 1;
                }
            }
        }

        report.collected = entries.len();
        if entries.is_empty() {
            warn!("No baseline entries collected, nothing written");
        } else {
            BaselineStore::save_entries(&self.output, &entries)?;
        }

        info!(
            collected = report.collected,
            skipped = report.skipped,
            checkpoints = report.checkpoints,
            interrupted = report.interrupted,
            "Baseline collection finished"
        );
        Ok(report)
    }

    fn measure(&mut self, target: &ScanTarget) -> Result<BaselineEntry, crate::acquisition::DeviceError> {
        self.front_end
            .configure(&Tuning::new(target.frequency_hz, &self.device))?;
        let samples = self.front_end.read(self.device.sample_count)?;
        let features = self.extractor.extract(&samples, self.device.sample_rate_hz);
        #[allow(clippy::cast_precision_loss)]
        let timestamp = Utc::now().timestamp_millis() as f64 / 1000.0;
        Ok(BaselineEntry::from_features(
            target.frequency_hz,
            target.label.clone(),
            &features,
            timestamp,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::SyntheticFrontEnd;
    use crate::baseline::{builtin_profiles, matcher, ToleranceProfile};
    use crate::processing::{ExtractorSettings, StatisticsKind};
    use tempfile::tempdir;

    fn device() -> DeviceConfig {
        DeviceConfig {
            sample_count: 4096,
            ..DeviceConfig::default()
        }
    }

    fn collector(front_end: SyntheticFrontEnd, output: &Path, every: usize) -> BaselineCollector {
        BaselineCollector::new(
            Box::new(front_end),
            FeatureExtractor::new(ExtractorSettings::default(), StatisticsKind::Statrs.backend()),
            device(),
            output,
            every,
        )
    }

    fn targets() -> Vec<ScanTarget> {
        [(95e6, "wfm"), (104e6, "wfm"), (150e6, "walkie_vhf")]
            .iter()
            .map(|&(f, l)| ScanTarget {
                frequency_hz: f,
                label: l.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_default_targets_cover_every_builtin_label() {
        let targets = BaselineCollector::default_targets();
        let profiles = builtin_profiles();
        for label in profiles.keys() {
            assert!(targets.iter().any(|t| &t.label == label), "{label} missing");
        }
        assert_eq!(targets.iter().filter(|t| t.label == "gsm_nigeria_900").count(), 13);

        let pmr: Vec<f64> = targets
            .iter()
            .filter(|t| t.label == "walkie_pmr446")
            .map(|t| t.frequency_hz)
            .collect();
        assert_eq!(pmr, vec![446.0e6, 446.05e6, 446.1e6, 446.15e6]);
    }

    #[test]
    fn test_collect_writes_full_entries_and_checkpoints() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let targets = targets();
        let mut c = collector(SyntheticFrontEnd::from_targets(7, &targets), &path, 2);

        let report = c.collect(&targets, &CancellationToken::new()).unwrap();
        assert_eq!(report.collected, 3);
        assert_eq!(report.checkpoints, 1);
        assert!(!report.interrupted);

        let entries = BaselineStore::read_entries(&path).unwrap();
        assert_eq!(entries.len(), 3);
        assert!(entries.iter().all(|e| e.snr_db.is_some() && e.num_peaks.is_some()));
    }

    #[test]
    fn test_failed_target_is_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let targets = targets();
        let fe = SyntheticFrontEnd::from_targets(7, &targets).failing_at(104e6);
        let report = collector(fe, &path, 10).collect(&targets, &CancellationToken::new()).unwrap();
        assert_eq!((report.collected, report.skipped), (2, 1));
    }

    #[test]
    fn test_cancelled_before_start_writes_nothing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let cancel = CancellationToken::new();
        cancel.cancel();
        let report = collector(SyntheticFrontEnd::new(1, 0.1), &path, 1)
            .collect(&targets(), &cancel)
            .unwrap();
        assert!(report.interrupted);
        assert_eq!(report.collected, 0);
        assert!(!path.exists());
    }

    #[test]
    fn test_disconnect_keeps_partial_baseline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let targets = targets();
        let fe = SyntheticFrontEnd::from_targets(7, &targets).disconnect_after(1);
        let report = collector(fe, &path, 10).collect(&targets, &CancellationToken::new()).unwrap();
        assert!(report.interrupted);
        assert_eq!(BaselineStore::read_entries(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_collected_baseline_matches_same_band() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let targets = targets();
        collector(SyntheticFrontEnd::from_targets(7, &targets), &path, 5)
            .collect(&targets, &CancellationToken::new())
            .unwrap();

        let store = BaselineStore::load(&path, builtin_profiles(), ToleranceProfile::default()).unwrap();
        let mut fe = SyntheticFrontEnd::from_targets(7, &targets);
        let mut extractor =
            FeatureExtractor::new(ExtractorSettings::default(), StatisticsKind::Native.backend());
        let dev = device();
        fe.configure(&Tuning::new(95e6, &dev)).unwrap();
        let features = extractor.extract(&fe.read(dev.sample_count).unwrap(), dev.sample_rate_hz);
        assert!(matcher::matches(&store, 95e6, "wfm", &features).matched);
    }
}
