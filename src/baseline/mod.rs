//! Baseline Module - expected emissions and tolerance matching
//!
//! A baseline is the list of emissions a site expects to see: one
//! `BaselineEntry` per (frequency, label) with whatever spectral properties
//! were measured when it was collected. During scanning every measurement is
//! compared against the entries sharing its label; anything that does not fit
//! inside the label's `ToleranceProfile` becomes a detection.
//!
//! ## Architecture
//!
//! - `BaselineStore`: read-only entry list plus the tolerance table
//! - `ToleranceProfile`: per-label tolerances, resolved per frequency
//! - `matcher::matches`: first-match-wins comparison of one measurement
//! - `BaselineCollector`: builds a baseline file from live acquisitions
//!
//! ## File Format
//!
//! ```json
//! { "schema_version": 1, "entries": [ { "frequency_hz": 95000000.0, "label": "wfm", ... } ] }
//! ```
//!
//! A bare JSON array of entries using the short key names (`freq`,
//! `bandwidth`, `peak_power`, ...) is also accepted.

mod collector;
pub mod matcher;
mod store;
mod tolerance;

pub use collector::{BaselineCollector, CollectionReport};
pub use matcher::{BaselineField, MatchVerdict};
pub use store::BaselineStore;
pub use tolerance::{builtin_profiles, ResolvedTolerance, ToleranceProfile};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::types::SpectralFeatures;

/// Current on-disk baseline schema version.
pub const SCHEMA_VERSION: u32 = 1;

// ============================================================================
// Baseline Entry
// ============================================================================

/// Expected properties of one known emission.
///
/// Only `frequency_hz` and `label` are required; every absent property is
/// skipped when matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineEntry {
    #[serde(alias = "freq")]
    pub frequency_hz: f64,

    pub label: String,

    #[serde(default, alias = "bandwidth", skip_serializing_if = "Option::is_none")]
    pub bandwidth_hz: Option<f64>,

    #[serde(default, alias = "peak_power", skip_serializing_if = "Option::is_none")]
    pub peak_power_db: Option<f64>,

    #[serde(default, alias = "noise_floor", skip_serializing_if = "Option::is_none")]
    pub noise_floor_db: Option<f64>,

    #[serde(default, alias = "snr", skip_serializing_if = "Option::is_none")]
    pub snr_db: Option<f64>,

    #[serde(default, alias = "mean_power", skip_serializing_if = "Option::is_none")]
    pub mean_power_db: Option<f64>,

    #[serde(default, alias = "std_power", skip_serializing_if = "Option::is_none")]
    pub std_power_db: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_peaks: Option<u32>,

    /// Unix seconds when the entry was measured
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

impl BaselineEntry {
    /// Entry with only the required fields set.
    pub fn new(frequency_hz: f64, label: impl Into<String>) -> Self {
        Self {
            frequency_hz,
            label: label.into(),
            bandwidth_hz: None,
            peak_power_db: None,
            noise_floor_db: None,
            snr_db: None,
            mean_power_db: None,
            std_power_db: None,
            num_peaks: None,
            timestamp: None,
        }
    }

    /// Entry carrying every property measured in `features`.
    pub fn from_features(
        frequency_hz: f64,
        label: impl Into<String>,
        features: &SpectralFeatures,
        timestamp: f64,
    ) -> Self {
        Self {
            frequency_hz,
            label: label.into(),
            bandwidth_hz: Some(features.bandwidth_hz),
            peak_power_db: Some(features.peak_power_db),
            noise_floor_db: Some(features.noise_floor_db),
            snr_db: Some(features.snr_db),
            mean_power_db: Some(features.mean_power_db),
            std_power_db: Some(features.std_power_db),
            num_peaks: Some(u32::try_from(features.num_peaks).unwrap_or(u32::MAX)),
            timestamp: Some(timestamp),
        }
    }

    /// Reason this entry cannot be used, if any.
    fn invalid_reason(&self) -> Option<String> {
        if !(self.frequency_hz.is_finite() && self.frequency_hz > 0.0) {
            return Some(format!("frequency_hz must be > 0 (got {})", self.frequency_hz));
        }
        if self.label.trim().is_empty() {
            return Some("label must not be empty".to_string());
        }
        let optional = [
            ("bandwidth_hz", self.bandwidth_hz),
            ("peak_power_db", self.peak_power_db),
            ("noise_floor_db", self.noise_floor_db),
            ("snr_db", self.snr_db),
            ("mean_power_db", self.mean_power_db),
            ("std_power_db", self.std_power_db),
        ];
        optional
            .iter()
            .find(|(_, v)| v.is_some_and(|v| !v.is_finite()))
            .map(|(name, _)| format!("{name} must be finite"))
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Baseline loading and saving failures. All are fatal at startup.
#[derive(Debug, Error)]
pub enum BaselineError {
    #[error("Baseline file not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("Baseline I/O error ({}): {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed baseline ({}): {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid baseline entry #{index}: {reason}")]
    Invalid { index: usize, reason: String },

    #[error("Baseline contains no entries: {}", .0.display())]
    Empty(PathBuf),

    #[error("Schema version mismatch: file has v{0}, expected v{1}")]
    SchemaMismatch(u32, u32),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_key_names_accepted() {
        let entry: BaselineEntry = serde_json::from_str(
            r#"{"freq": 95000000.0, "label": "wfm", "bandwidth": 180000.0,
                "peak_power": 12.5, "noise_floor": -30.0, "snr": 42.5,
                "mean_power": -25.0, "std_power": 8.0, "num_peaks": 3,
                "timestamp": 1718000000.5}"#,
        )
        .unwrap();
        assert_eq!(entry.frequency_hz, 95e6);
        assert_eq!(entry.bandwidth_hz, Some(180_000.0));
        assert_eq!(entry.num_peaks, Some(3));
        assert_eq!(entry.timestamp, Some(1_718_000_000.5));
    }

    #[test]
    fn test_optional_fields_may_be_absent_or_null() {
        let entry: BaselineEntry =
            serde_json::from_str(r#"{"frequency_hz": 446.00625e6, "label": "walkie_pmr446", "snr_db": null}"#)
                .unwrap();
        assert_eq!(entry, BaselineEntry::new(446.00625e6, "walkie_pmr446"));
        assert!(entry.invalid_reason().is_none());
    }

    #[test]
    fn test_invalid_entries_detected() {
        assert!(BaselineEntry::new(0.0, "wfm").invalid_reason().is_some());
        assert!(BaselineEntry::new(95e6, " ").invalid_reason().is_some());
        let mut entry = BaselineEntry::new(95e6, "wfm");
        entry.peak_power_db = Some(f64::NAN);
        assert!(entry.invalid_reason().unwrap().contains("peak_power_db"));
    }
}
