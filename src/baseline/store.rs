//! Loading, saving and lookup of baseline entries.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use tracing::{debug, info};

use super::{BaselineEntry, BaselineError, ResolvedTolerance, ToleranceProfile, SCHEMA_VERSION};
use crate::config::{ScanTarget, SentinelConfig};
use crate::processing::frequency_key;

/// On-disk shapes accepted by [`BaselineStore::read_entries`].
#[derive(Deserialize)]
#[serde(untagged)]
enum BaselineFile {
    Versioned {
        schema_version: u32,
        entries: Vec<BaselineEntry>,
    },
    Bare(Vec<BaselineEntry>),
}

#[derive(Serialize)]
struct BaselineFileRef<'a> {
    schema_version: u32,
    entries: &'a [BaselineEntry],
}

/// Read-only baseline plus the tolerance table used to judge it.
///
/// Entries keep file order; the matcher relies on it.
#[derive(Debug, Clone)]
pub struct BaselineStore {
    entries: Vec<BaselineEntry>,
    profiles: BTreeMap<String, ToleranceProfile>,
    default_profile: ToleranceProfile,
}

impl BaselineStore {
    /// Build a store from already-parsed entries, validating each one.
    pub fn new(
        entries: Vec<BaselineEntry>,
        profiles: BTreeMap<String, ToleranceProfile>,
        default_profile: ToleranceProfile,
    ) -> Result<Self, BaselineError> {
        if let Some((index, reason)) = entries
            .iter()
            .enumerate()
            .find_map(|(i, e)| e.invalid_reason().map(|r| (i, r)))
        {
            return Err(BaselineError::Invalid { index, reason });
        }
        Ok(Self {
            entries,
            profiles,
            default_profile,
        })
    }

    /// Load the baseline named in `config` with the config's tolerance table.
    pub fn from_config(config: &SentinelConfig) -> Result<Self, BaselineError> {
        Self::load(
            &config.baseline.path,
            config.tolerance_profiles(),
            config.default_tolerance.clone(),
        )
    }

    pub fn load(
        path: &Path,
        profiles: BTreeMap<String, ToleranceProfile>,
        default_profile: ToleranceProfile,
    ) -> Result<Self, BaselineError> {
        let entries = Self::read_entries(path)?;
        if entries.is_empty() {
            return Err(BaselineError::Empty(path.to_path_buf()));
        }
        let store = Self::new(entries, profiles, default_profile)?;
        info!(
            path = %path.display(),
            entries = store.len(),
            labels = store.labels().len(),
            "Baseline loaded"
        );
        Ok(store)
    }

    /// Parse a baseline file without validating entries.
    pub fn read_entries(path: &Path) -> Result<Vec<BaselineEntry>, BaselineError> {
        let json = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                BaselineError::Missing(path.to_path_buf())
            } else {
                BaselineError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let file: BaselineFile =
            serde_json::from_str(&json).map_err(|source| BaselineError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;

        match file {
            BaselineFile::Versioned {
                schema_version,
                entries,
            } => {
                if schema_version != SCHEMA_VERSION {
                    return Err(BaselineError::SchemaMismatch(schema_version, SCHEMA_VERSION));
                }
                Ok(entries)
            }
            BaselineFile::Bare(entries) => {
                debug!(path = %path.display(), "Baseline in bare-array form");
                Ok(entries)
            }
        }
    }

    /// Write entries atomically: temp file in the same directory, then rename.
    ///
    /// Parent directories are created if missing.
    pub fn save_entries(path: &Path, entries: &[BaselineEntry]) -> Result<(), BaselineError> {
        let io_err = |source| BaselineError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(&BaselineFileRef {
            schema_version: SCHEMA_VERSION,
            entries,
        })?;

        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)?;

        debug!(path = %path.display(), entries = entries.len(), "Baseline written");
        Ok(())
    }

    pub fn entries(&self) -> &[BaselineEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sharing `label`, in file order.
    pub fn candidates<'a>(&'a self, label: &'a str) -> impl Iterator<Item = &'a BaselineEntry> + 'a {
        self.entries.iter().filter(move |e| e.label == label)
    }

    /// Tolerances for `label`, falling back to the default profile, with
    /// the bandwidth tolerance resolved at `frequency_hz`.
    pub fn tolerance_for(&self, label: &str, frequency_hz: f64) -> ResolvedTolerance {
        self.profiles
            .get(label)
            .unwrap_or(&self.default_profile)
            .resolve(frequency_hz)
    }

    /// Distinct labels present, in first-seen order.
    pub fn labels(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert(e.label.as_str()))
            .map(|e| e.label.as_str())
            .collect()
    }

    /// Sweep plan derived from the baseline: each distinct (frequency, label)
    /// once, in file order.
    pub fn scan_targets(&self) -> Vec<ScanTarget> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .filter(|e| seen.insert((frequency_key(e.frequency_hz), e.label.clone())))
            .map(|e| ScanTarget {
                frequency_hz: e.frequency_hz,
                label: e.label.clone(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::baseline::builtin_profiles;
    use tempfile::tempdir;

    fn store(entries: Vec<BaselineEntry>) -> BaselineStore {
        BaselineStore::new(entries, builtin_profiles(), ToleranceProfile::default()).unwrap()
    }

    #[test]
    fn test_missing_file_is_missing_error() {
        let dir = tempdir().unwrap();
        let err = BaselineStore::load(
            &dir.path().join("nope.json"),
            builtin_profiles(),
            ToleranceProfile::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BaselineError::Missing(_)));
    }

    #[test]
    fn test_malformed_file_is_malformed_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = BaselineStore::read_entries(&path).unwrap_err();
        assert!(matches!(err, BaselineError::Malformed { .. }));
    }

    #[test]
    fn test_entry_without_label_is_malformed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, r#"[{"freq": 95000000.0}]"#).unwrap();
        assert!(matches!(
            BaselineStore::read_entries(&path),
            Err(BaselineError::Malformed { .. })
        ));
    }

    #[test]
    fn test_empty_baseline_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, "[]").unwrap();
        let err =
            BaselineStore::load(&path, builtin_profiles(), ToleranceProfile::default()).unwrap_err();
        assert!(matches!(err, BaselineError::Empty(_)));
    }

    #[test]
    fn test_schema_mismatch_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, r#"{"schema_version": 99, "entries": []}"#).unwrap();
        assert!(matches!(
            BaselineStore::read_entries(&path),
            Err(BaselineError::SchemaMismatch(99, 1))
        ));
    }

    #[test]
    fn test_save_then_load_preserves_order() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("baseline.json");
        let entries = vec![
            BaselineEntry::new(104e6, "wfm"),
            BaselineEntry::new(95e6, "wfm"),
            BaselineEntry::new(49.25e6, "tv"),
        ];
        BaselineStore::save_entries(&path, &entries).unwrap();
        let loaded =
            BaselineStore::load(&path, builtin_profiles(), ToleranceProfile::default()).unwrap();
        assert_eq!(loaded.entries(), entries.as_slice());
        assert!(!dir.path().join("nested").join("baseline.json.tmp").exists());
    }

    #[test]
    fn test_unknown_label_uses_default_profile() {
        let s = store(vec![BaselineEntry::new(433.92e6, "ism_remote")]);
        let tol = s.tolerance_for("ism_remote", 433.92e6);
        assert!((tol.freq_tol_hz - 2_000.0).abs() < f64::EPSILON);
        assert!((tol.bandwidth_tol_hz - 43.392e6).abs() < 1e-3);
    }

    #[test]
    fn test_lookup_and_targets() {
        let s = store(vec![
            BaselineEntry::new(95e6, "wfm"),
            BaselineEntry::new(95e6, "wfm"),
            BaselineEntry::new(95e6, "tv"),
        ]);
        assert_eq!(s.scan_targets().len(), 2);
        assert_eq!(s.labels(), vec!["wfm", "tv"]);
        assert_eq!(s.candidates("wfm").count(), 2);
    }

    #[test]
    fn test_invalid_entry_reports_index() {
        let err = BaselineStore::new(
            vec![BaselineEntry::new(95e6, "wfm"), BaselineEntry::new(-1.0, "wfm")],
            builtin_profiles(),
            ToleranceProfile::default(),
        )
        .unwrap_err();
        assert!(matches!(err, BaselineError::Invalid { index: 1, .. }));
    }
}
