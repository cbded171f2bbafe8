//! Config validation: unknown-key detection with Levenshtein suggestions
//! and range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use super::defaults::WATERFALL_CAPACITY_RANGE;
use super::SentinelConfig;
use crate::baseline::ToleranceProfile;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Placeholder segment for user-chosen labels under `[tolerances]`.
const LABEL_WILDCARD: &str = "*";

/// Fields accepted inside a tolerance profile table.
const TOLERANCE_FIELDS: &[&str] = &[
    "freq_tol_hz",
    "bandwidth_fraction_of_freq",
    "peak_power_tol_db",
    "noise_floor_tol_db",
    "snr_tol_db",
    "mean_power_tol_db",
    "std_power_tol_db",
    "num_peaks_tol",
];

/// Returns the complete set of valid dotted key paths for `SentinelConfig`.
///
/// Maintained by hand to match the struct hierarchy in sentinel_config.rs.
/// Labels under `[tolerances]` are free-form and appear as `tolerances.*`.
pub fn known_config_keys() -> HashSet<String> {
    let fixed: &[&str] = &[
        // [device]
        "device",
        "device.label",
        "device.latitude",
        "device.longitude",
        "device.sample_rate_hz",
        "device.sample_count",
        "device.gain_db",
        // [scan]
        "scan",
        "scan.interval_secs",
        "scan.frequencies",
        "scan.waterfall_capacity",
        "scan.spectrum_width",
        "scan.raw_snippet_len",
        "scan.drift_history_len",
        "scan.statistics",
        // [detection]
        "detection",
        "detection.peak_threshold_db",
        "detection.interference_threshold_db",
        "detection.interference_saturation_peaks",
        "detection.rolloff_fraction",
        "detection.max_reported_peaks",
        "detection.default_confidence",
        "detection.max_deviation",
        // [storage]
        "storage",
        "storage.data_dir",
        "storage.detections_db",
        "storage.persist_retries",
        "storage.retry_backoff_ms",
        // [baseline]
        "baseline",
        "baseline.path",
        "baseline.checkpoint_every",
        // [tolerances] / [default_tolerance]
        "tolerances",
        "default_tolerance",
    ];

    let mut keys: HashSet<String> = fixed.iter().map(|k| (*k).to_string()).collect();
    keys.insert(format!("tolerances.{LABEL_WILDCARD}"));
    for field in TOLERANCE_FIELDS {
        keys.insert(format!("tolerances.{LABEL_WILDCARD}.{field}"));
        keys.insert(format!("default_tolerance.{field}"));
    }
    keys
}

/// Recursively collect all dotted key paths from a TOML value tree.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

/// Replace the label segment of `tolerances.<label>[.field]` with the wildcard.
fn normalize_key(key: &str) -> String {
    let mut parts: Vec<&str> = key.split('.').collect();
    if parts.len() >= 2 && parts[0] == "tolerances" {
        parts[1] = LABEL_WILDCARD;
    }
    parts.join(".")
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<String>) -> Option<String> {
    let mut best: Option<(&str, usize)> = None;
    for k in known {
        let dist = levenshtein(unknown, k);
        if dist <= 3 && best.map_or(true, |(_, best_dist)| dist < best_dist) {
            best = Some((k.as_str(), dist));
        }
    }
    best.map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new(); // parse errors are handled by serde later
    };

    let known = known_config_keys();
    let mut warnings = Vec::new();

    for key in walk_toml_keys(&value, "") {
        let normalized = normalize_key(&key);
        if known.contains(&normalized) {
            continue;
        }
        let suggestion = suggest_correction(&normalized, &known).map(|s| {
            // Restore the user's label in the suggestion
            match key.split('.').nth(1) {
                Some(label) if key.starts_with("tolerances.") => {
                    s.replacen(LABEL_WILDCARD, label, 1)
                }
                _ => s,
            }
        });
        warnings.push(ValidationWarning {
            message: format!("Unknown config key '{key}'"),
            field: key,
            suggestion,
        });
    }

    warnings
}

// ============================================================================
// Range Validation
// ============================================================================

/// Validate value ranges on a parsed `SentinelConfig`.
///
/// Returns (errors, warnings). Errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_ranges(config: &SentinelConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let d = &config.device;
    if !(d.sample_rate_hz.is_finite() && d.sample_rate_hz > 0.0) {
        errors.push(format!("device.sample_rate_hz must be > 0 (got {})", d.sample_rate_hz));
    }
    if d.sample_count == 0 {
        errors.push("device.sample_count must be > 0".to_string());
    }
    if !(-90.0..=90.0).contains(&d.latitude) {
        errors.push(format!("device.latitude out of range [-90, 90] (got {})", d.latitude));
    }
    if !(-180.0..=180.0).contains(&d.longitude) {
        errors.push(format!("device.longitude out of range [-180, 180] (got {})", d.longitude));
    }
    if let Some(gain) = d.gain_db {
        if !gain.is_finite() {
            errors.push("device.gain_db must be finite".to_string());
        }
    }

    let s = &config.scan;
    if s.waterfall_capacity < 2 {
        errors.push(format!(
            "scan.waterfall_capacity must be >= 2 (got {})",
            s.waterfall_capacity
        ));
    } else if !(WATERFALL_CAPACITY_RANGE.0..=WATERFALL_CAPACITY_RANGE.1)
        .contains(&s.waterfall_capacity)
    {
        warnings.push(ValidationWarning {
            field: "scan.waterfall_capacity".to_string(),
            message: format!(
                "scan.waterfall_capacity = {} is outside the usual {}-{} range",
                s.waterfall_capacity, WATERFALL_CAPACITY_RANGE.0, WATERFALL_CAPACITY_RANGE.1
            ),
            suggestion: None,
        });
    }
    if s.spectrum_width == 0 {
        errors.push("scan.spectrum_width must be > 0".to_string());
    }
    if s.drift_history_len == 0 {
        errors.push("scan.drift_history_len must be > 0".to_string());
    }
    for (i, target) in s.frequencies.iter().enumerate() {
        if !(target.frequency_hz.is_finite() && target.frequency_hz > 0.0) {
            errors.push(format!("scan.frequencies[{i}].frequency_hz must be > 0"));
        }
        if target.label.trim().is_empty() {
            errors.push(format!("scan.frequencies[{i}].label must not be empty"));
        }
    }

    let det = &config.detection;
    if !(det.rolloff_fraction > 0.0 && det.rolloff_fraction <= 1.0) {
        errors.push(format!(
            "detection.rolloff_fraction must be in (0, 1] (got {})",
            det.rolloff_fraction
        ));
    }
    if !(det.peak_threshold_db.is_finite() && det.peak_threshold_db >= 0.0) {
        errors.push("detection.peak_threshold_db must be >= 0".to_string());
    }
    if !(det.interference_threshold_db.is_finite() && det.interference_threshold_db >= 0.0) {
        errors.push("detection.interference_threshold_db must be >= 0".to_string());
    }
    if det.interference_saturation_peaks == 0 {
        errors.push("detection.interference_saturation_peaks must be > 0".to_string());
    }
    if !(0.0..=100.0).contains(&det.default_confidence) {
        errors.push(format!(
            "detection.default_confidence must be in [0, 100] (got {})",
            det.default_confidence
        ));
    }
    if !(det.max_deviation.is_finite() && det.max_deviation > 0.0) {
        errors.push("detection.max_deviation must be > 0".to_string());
    }

    if config.storage.persist_retries == 0 {
        errors.push("storage.persist_retries must be >= 1".to_string());
    }
    if config.baseline.checkpoint_every == 0 {
        errors.push("baseline.checkpoint_every must be >= 1".to_string());
    }

    check_profile("default_tolerance", &config.default_tolerance, &mut errors);
    for (label, profile) in &config.tolerances {
        check_profile(&format!("tolerances.{label}"), profile, &mut errors);
    }

    (errors, warnings)
}

fn check_profile(name: &str, p: &ToleranceProfile, errors: &mut Vec<String>) {
    let fields = [
        ("freq_tol_hz", p.freq_tol_hz),
        ("bandwidth_fraction_of_freq", p.bandwidth_fraction_of_freq),
        ("peak_power_tol_db", p.peak_power_tol_db),
        ("noise_floor_tol_db", p.noise_floor_tol_db),
        ("snr_tol_db", p.snr_tol_db),
        ("mean_power_tol_db", p.mean_power_tol_db),
        ("std_power_tol_db", p.std_power_tol_db),
    ];
    for (field, value) in fields {
        if !(value.is_finite() && value >= 0.0) {
            errors.push(format!("{name}.{field} must be a finite value >= 0 (got {value})"));
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
