//! Per-label tolerance profiles.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::defaults;

/// How far a measurement may drift from its baseline entry and still match.
///
/// Bandwidth tolerance scales with the carrier: it is stored as a fraction of
/// the frequency and resolved to Hz by [`ToleranceProfile::resolve`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToleranceProfile {
    #[serde(default = "default_freq_tol")]
    pub freq_tol_hz: f64,
    #[serde(default = "default_bandwidth_fraction")]
    pub bandwidth_fraction_of_freq: f64,
    #[serde(default = "default_power_tol")]
    pub peak_power_tol_db: f64,
    #[serde(default = "default_power_tol")]
    pub noise_floor_tol_db: f64,
    #[serde(default = "default_power_tol")]
    pub snr_tol_db: f64,
    #[serde(default = "default_power_tol")]
    pub mean_power_tol_db: f64,
    #[serde(default = "default_power_tol")]
    pub std_power_tol_db: f64,
    #[serde(default = "default_num_peaks_tol")]
    pub num_peaks_tol: u32,
}

fn default_freq_tol() -> f64 { defaults::DEFAULT_FREQ_TOL_HZ }
fn default_bandwidth_fraction() -> f64 { defaults::DEFAULT_BANDWIDTH_FRACTION }
fn default_power_tol() -> f64 { defaults::DEFAULT_POWER_TOL_DB }
fn default_num_peaks_tol() -> u32 { defaults::DEFAULT_NUM_PEAKS_TOL }

impl Default for ToleranceProfile {
    fn default() -> Self {
        Self::uniform(
            default_freq_tol(),
            default_bandwidth_fraction(),
            default_power_tol(),
            default_num_peaks_tol(),
        )
    }
}

impl ToleranceProfile {
    /// Profile with one tolerance shared by all five power fields.
    pub fn uniform(
        freq_tol_hz: f64,
        bandwidth_fraction_of_freq: f64,
        power_tol_db: f64,
        num_peaks_tol: u32,
    ) -> Self {
        Self {
            freq_tol_hz,
            bandwidth_fraction_of_freq,
            peak_power_tol_db: power_tol_db,
            noise_floor_tol_db: power_tol_db,
            snr_tol_db: power_tol_db,
            mean_power_tol_db: power_tol_db,
            std_power_tol_db: power_tol_db,
            num_peaks_tol,
        }
    }

    pub fn resolve(&self, frequency_hz: f64) -> ResolvedTolerance {
        ResolvedTolerance {
            freq_tol_hz: self.freq_tol_hz,
            bandwidth_tol_hz: frequency_hz.abs() * self.bandwidth_fraction_of_freq,
            peak_power_tol_db: self.peak_power_tol_db,
            noise_floor_tol_db: self.noise_floor_tol_db,
            snr_tol_db: self.snr_tol_db,
            mean_power_tol_db: self.mean_power_tol_db,
            std_power_tol_db: self.std_power_tol_db,
            num_peaks_tol: self.num_peaks_tol,
        }
    }
}

/// A profile with the bandwidth tolerance fixed for one frequency.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTolerance {
    pub freq_tol_hz: f64,
    pub bandwidth_tol_hz: f64,
    pub peak_power_tol_db: f64,
    pub noise_floor_tol_db: f64,
    pub snr_tol_db: f64,
    pub mean_power_tol_db: f64,
    pub std_power_tol_db: f64,
    pub num_peaks_tol: u32,
}

/// Tolerances for the emission classes the sentinel ships with.
pub fn builtin_profiles() -> BTreeMap<String, ToleranceProfile> {
    let table = [
        ("wfm", ToleranceProfile::uniform(1_000.0, 0.15, 8.0, 3)),
        ("tv", ToleranceProfile::uniform(1_000.0, 0.10, 10.0, 5)),
        ("gsm_nigeria_900", ToleranceProfile::uniform(2_000.0, 0.10, 12.0, 5)),
        ("walkie_pmr446", ToleranceProfile::uniform(15_000.0, 0.7, 10.0, 5)),
        ("walkie_vhf", ToleranceProfile::uniform(1_500.0, 0.08, 12.0, 6)),
        ("walkie_uhf", ToleranceProfile::uniform(2_000.0, 0.12, 10.0, 4)),
        ("dmr", ToleranceProfile::uniform(2_000.0, 0.10, 10.0, 4)),
    ];
    table
        .into_iter()
        .map(|(label, profile)| (label.to_string(), profile))
        .collect()
}
