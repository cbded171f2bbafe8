//! Compare one measurement against the baseline.
//!
//! Candidates are the entries sharing the measurement's label, tried in file
//! order. The first candidate inside `freq_tol_hz` whose every present
//! property is within tolerance wins; later candidates are never consulted,
//! even if they would fit more closely.

use super::{BaselineEntry, BaselineStore, ResolvedTolerance};
use crate::types::SpectralFeatures;

/// A baseline property that can fall out of tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselineField {
    Bandwidth,
    PeakPower,
    NoiseFloor,
    Snr,
    MeanPower,
    StdPower,
    NumPeaks,
}

impl BaselineField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bandwidth => "bandwidth",
            Self::PeakPower => "peak_power",
            Self::NoiseFloor => "noise_floor",
            Self::Snr => "snr",
            Self::MeanPower => "mean_power",
            Self::StdPower => "std_power",
            Self::NumPeaks => "num_peaks",
        }
    }
}

impl std::fmt::Display for BaselineField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of matching one measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchVerdict {
    pub matched: bool,
    /// The matching entry; when unmatched, the first same-label entry inside
    /// the frequency tolerance (the one scores are computed against), if any
    pub entry: Option<BaselineEntry>,
    /// Tolerances resolved at the measured frequency
    pub tolerance: ResolvedTolerance,
    /// Properties of `entry` the measurement violated (empty when matched)
    pub failed_fields: Vec<BaselineField>,
}

impl MatchVerdict {
    pub fn into_parts(self) -> (bool, Option<BaselineEntry>) {
        (self.matched, self.entry)
    }
}

/// Match `features`, measured at `frequency_hz` under `label`, against `store`.
pub fn matches(
    store: &BaselineStore,
    frequency_hz: f64,
    label: &str,
    features: &SpectralFeatures,
) -> MatchVerdict {
    let tolerance = store.tolerance_for(label, frequency_hz);
    let mut nearest_miss: Option<(&BaselineEntry, Vec<BaselineField>)> = None;

    for entry in store.candidates(label) {
        if (frequency_hz - entry.frequency_hz).abs() > tolerance.freq_tol_hz {
            continue;
        }
        let failed = out_of_tolerance(entry, features, &tolerance);
        if failed.is_empty() {
            return MatchVerdict {
                matched: true,
                entry: Some(entry.clone()),
                tolerance,
                failed_fields: Vec::new(),
            };
        }
        if nearest_miss.is_none() {
            nearest_miss = Some((entry, failed));
        }
    }

    let (entry, failed_fields) = nearest_miss
        .map_or((None, Vec::new()), |(e, failed)| (Some(e.clone()), failed));
    MatchVerdict {
        matched: false,
        entry,
        tolerance,
        failed_fields,
    }
}

/// Properties of `entry` that `features` does not satisfy.
///
/// Absent baseline properties always pass. A baseline without a bandwidth
/// compares the measurement against itself, so bandwidth passes too.
pub fn out_of_tolerance(
    entry: &BaselineEntry,
    features: &SpectralFeatures,
    tol: &ResolvedTolerance,
) -> Vec<BaselineField> {
    let checks = [
        (BaselineField::Bandwidth, entry.bandwidth_hz, features.bandwidth_hz, tol.bandwidth_tol_hz),
        (BaselineField::PeakPower, entry.peak_power_db, features.peak_power_db, tol.peak_power_tol_db),
        (BaselineField::NoiseFloor, entry.noise_floor_db, features.noise_floor_db, tol.noise_floor_tol_db),
        (BaselineField::Snr, entry.snr_db, features.snr_db, tol.snr_tol_db),
        (BaselineField::MeanPower, entry.mean_power_db, features.mean_power_db, tol.mean_power_tol_db),
        (BaselineField::StdPower, entry.std_power_db, features.std_power_db, tol.std_power_tol_db),
    ];

    let mut failed: Vec<BaselineField> = checks
        .iter()
        .filter(|(_, expected, measured, limit)| {
            expected.is_some_and(|expected| (measured - expected).abs() > *limit)
        })
        .map(|(field, ..)| *field)
        .collect();

    if let Some(expected) = entry.num_peaks {
        let measured = i64::try_from(features.num_peaks).unwrap_or(i64::MAX);
        if (measured - i64::from(expected)).abs() > i64::from(tol.num_peaks_tol) {
            failed.push(BaselineField::NumPeaks);
        }
    }

    failed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::{builtin_profiles, ToleranceProfile};

    fn wfm_entry() -> BaselineEntry {
        BaselineEntry {
            bandwidth_hz: Some(200_000.0),
            peak_power_db: Some(10.0),
            noise_floor_db: Some(-30.0),
            snr_db: Some(40.0),
            ..BaselineEntry::new(95e6, "wfm")
        }
    }

    fn wfm_features(peak_power_db: f64) -> SpectralFeatures {
        SpectralFeatures {
            bandwidth_hz: 210_000.0,
            peak_power_db,
            noise_floor_db: -29.0,
            snr_db: peak_power_db + 29.0,
            ..Default::default()
        }
    }

    fn store(entries: Vec<BaselineEntry>) -> BaselineStore {
        BaselineStore::new(entries, builtin_profiles(), ToleranceProfile::default()).unwrap()
    }

    #[test]
    fn test_within_tolerance_matches() {
        let s = store(vec![wfm_entry()]);
        let verdict = matches(&s, 95e6, "wfm", &wfm_features(12.0));
        assert!(verdict.matched);
        assert_eq!(verdict.entry, Some(wfm_entry()));
        assert!(verdict.failed_fields.is_empty());
    }

    #[test]
    fn test_peak_power_outside_tolerance_misses_with_reference() {
        let s = store(vec![wfm_entry()]);
        let verdict = matches(&s, 95e6, "wfm", &wfm_features(-5.0));
        assert!(!verdict.matched);
        assert_eq!(verdict.entry, Some(wfm_entry()));
        assert!(verdict.failed_fields.contains(&BaselineField::PeakPower));
    }

    #[test]
    fn test_frequency_outside_tolerance_has_no_reference() {
        let s = store(vec![wfm_entry()]);
        let (matched, entry) = matches(&s, 95e6 + 5_000.0, "wfm", &wfm_features(12.0)).into_parts();
        assert!(!matched);
        assert!(entry.is_none());
    }

    #[test]
    fn test_other_labels_never_match() {
        let s = store(vec![wfm_entry()]);
        assert!(!matches(&s, 95e6, "tv", &wfm_features(12.0)).matched);
    }

    #[test]
    fn test_first_match_wins() {
        let loose = BaselineEntry::new(95e6, "wfm");
        let s = store(vec![loose.clone(), wfm_entry()]);
        let verdict = matches(&s, 95e6, "wfm", &wfm_features(12.0));
        assert_eq!(verdict.entry, Some(loose));
    }

    #[test]
    fn test_later_candidate_can_still_match() {
        let strict = BaselineEntry {
            peak_power_db: Some(-40.0),
            ..BaselineEntry::new(95e6, "wfm")
        };
        let s = store(vec![strict, wfm_entry()]);
        let verdict = matches(&s, 95e6, "wfm", &wfm_features(12.0));
        assert!(verdict.matched);
        assert_eq!(verdict.entry, Some(wfm_entry()));
    }

    #[test]
    fn test_num_peaks_tolerance() {
        let entry = BaselineEntry {
            num_peaks: Some(2),
            ..BaselineEntry::new(95e6, "wfm")
        };
        let tol = builtin_profiles()["wfm"].resolve(95e6);
        let mut features = SpectralFeatures {
            num_peaks: 5,
            ..Default::default()
        };
        assert!(out_of_tolerance(&entry, &features, &tol).is_empty());
        features.num_peaks = 6;
        assert_eq!(
            out_of_tolerance(&entry, &features, &tol),
            vec![BaselineField::NumPeaks]
        );
    }
}
