//! Config Validation Tests
//!
//! Typo detection (unknown keys with suggestions) and range validation,
//! exercised through the public config API.

use rf_sentinel::config::validation::{
    known_config_keys, suggest_correction, validate_ranges, validate_unknown_keys,
};
use rf_sentinel::config::{ConfigError, SentinelConfig};
use std::io::Write;

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_device_section_warns_with_suggestion() {
    let toml_str = r#"
[device]
sampel_rate_hz = 2048000.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "device.sampel_rate_hz");
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("device.sample_rate_hz")
    );
}

#[test]
fn typo_in_tolerance_table_keeps_user_label() {
    let toml_str = r#"
[tolerances.walkie_vhf]
freq_tol_hx = 1800.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].suggestion.as_deref(),
        Some("tolerances.walkie_vhf.freq_tol_hz")
    );
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[device]
label = "mast-lagos-3"
latitude = 6.45
longitude = 3.39
sample_rate_hz = 2048000.0
sample_count = 131072
gain_db = 28.0

[scan]
interval_secs = 30
waterfall_capacity = 48
statistics = "native"

[[scan.frequencies]]
frequency_hz = 95000000.0
label = "wfm"

[detection]
peak_threshold_db = 6.0
max_deviation = 25.0

[storage]
data_dir = "/var/lib/rf-sentinel"
persist_retries = 5

[baseline]
path = "/var/lib/rf-sentinel/baseline.json"
checkpoint_every = 10

[tolerances.dmr]
freq_tol_hz = 2500.0
num_peaks_tol = 6

[default_tolerance]
snr_tol_db = 12.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert!(warnings.is_empty(), "unexpected warnings: {warnings:?}");

    let config = SentinelConfig::from_toml_str(toml_str).unwrap();
    assert_eq!(config.device.gain_db, Some(28.0));
    assert_eq!(config.scan.frequencies.len(), 1);
    assert_eq!(config.tolerance_profiles()["dmr"].freq_tol_hz, 2500.0);
}

#[test]
fn unknown_section_far_from_anything_has_no_suggestion() {
    let warnings = validate_unknown_keys("[telemetry]\nendpoint = \"udp://x\"\n");
    assert_eq!(warnings.len(), 2);
    assert!(warnings.iter().all(|w| w.suggestion.is_none()));
}

#[test]
fn suggestion_requires_small_edit_distance() {
    let known = known_config_keys();
    assert_eq!(
        suggest_correction("scan.intervl_secs", &known).as_deref(),
        Some("scan.interval_secs")
    );
    assert!(suggest_correction("completely.unrelated", &known).is_none());
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn defaults_pass_range_validation() {
    let (errors, warnings) = validate_ranges(&SentinelConfig::default());
    assert!(errors.is_empty(), "{errors:?}");
    assert!(warnings.is_empty());
}

#[test]
fn impossible_values_are_errors() {
    let mut config = SentinelConfig::default();
    config.device.sample_rate_hz = 0.0;
    config.device.latitude = 123.0;
    config.scan.waterfall_capacity = 1;
    config.detection.rolloff_fraction = 1.5;

    let (errors, _) = validate_ranges(&config);
    assert_eq!(errors.len(), 4, "{errors:?}");
    assert!(matches!(config.validate(), Err(ConfigError::Validation(e)) if e.len() == 4));
}

#[test]
fn unusual_waterfall_capacity_only_warns() {
    let mut config = SentinelConfig::default();
    config.scan.waterfall_capacity = 200;
    let (errors, warnings) = validate_ranges(&config);
    assert!(errors.is_empty());
    assert_eq!(warnings.len(), 1);
    assert!(config.validate().is_ok());
}

#[test]
fn negative_tolerance_override_rejected() {
    let err = SentinelConfig::from_toml_str("[tolerances.wfm]\npeak_power_tol_db = -1.0\n").unwrap_err();
    assert!(err.to_string().contains("tolerances.wfm.peak_power_tol_db"));
}

#[test]
fn load_from_file_reports_path_on_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[device\nlabel = 1").unwrap();
    let err = SentinelConfig::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == file.path()));
}
