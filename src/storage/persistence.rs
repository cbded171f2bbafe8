//! DetectionSink trait - pluggable record persistence
//!
//! The scan pipeline only ever appends detection records; how they are kept
//! is up to the backend:
//! - `InMemorySink`: bounded in-memory store for tests and dry runs
//! - `SledDetectionStore`: durable embedded store (see `detections.rs`)

use std::sync::RwLock;
use std::time::Duration;
use tracing::warn;

use crate::types::DetectionRecord;

/// Append-only destination for detection records.
///
/// Implementations must be thread-safe (Send + Sync); the scan loop hands
/// the sink to a blocking worker thread.
pub trait DetectionSink: Send + Sync {
    /// Persist one record
    fn store(&self, record: &DetectionRecord) -> Result<(), PersistenceError>;

    /// Push buffered writes to durable storage
    fn flush(&self) -> Result<(), PersistenceError> {
        Ok(())
    }

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Persistence errors
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sled::Error> for PersistenceError {
    fn from(err: sled::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

// ============================================================================
// Retry
// ============================================================================

/// Bounded retry with linear backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first
    pub attempts: u32,
    /// Sleep before attempt `n` is `backoff * (n - 1)`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff_ms: u64) -> Self {
        Self {
            attempts: attempts.max(1),
            backoff: Duration::from_millis(backoff_ms),
        }
    }
}

/// Store `record`, retrying per `policy`. Returns the last error if every
/// attempt failed; the caller decides whether to drop the record.
///
/// Blocks the calling thread during backoff.
pub fn persist_with_retry(
    sink: &dyn DetectionSink,
    record: &DetectionRecord,
    policy: RetryPolicy,
) -> Result<(), PersistenceError> {
    let mut attempt = 1;
    loop {
        match sink.store(record) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < policy.attempts => {
                warn!(
                    backend = sink.backend_name(),
                    sequence = record.detection_sequence,
                    attempt,
                    error = %e,
                    "Detection store failed, retrying"
                );
                std::thread::sleep(policy.backoff * attempt);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

// ============================================================================
// In-Memory Sink
// ============================================================================

/// In-memory persistence for testing and dry runs
///
/// Thread-safe via `RwLock`. Not durable.
pub struct InMemorySink {
    records: RwLock<Vec<DetectionRecord>>,
    max_records: usize,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::with_capacity(10_000)
    }

    /// Keep at most `max_records`, evicting the oldest.
    pub fn with_capacity(max_records: usize) -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            max_records: max_records.max(1),
        }
    }

    /// Snapshot of stored records, oldest first.
    pub fn records(&self) -> Vec<DetectionRecord> {
        self.records
            .read()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemorySink {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectionSink for InMemorySink {
    fn store(&self, record: &DetectionRecord) -> Result<(), PersistenceError> {
        let mut store = self
            .records
            .write()
            .map_err(|e| PersistenceError::Storage(e.to_string()))?;

        store.push(record.clone());

        // Evict oldest if over limit
        if store.len() > self.max_records {
            store.remove(0);
        }

        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "in-memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DeviceIdentity, SpectralFeatures};
    use chrono::Utc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn record(sequence: u64) -> DetectionRecord {
        let mut r = DetectionRecord::from_features(
            Utc::now(),
            95e6,
            "wfm",
            DeviceIdentity {
                label: "test".to_string(),
                latitude: 0.0,
                longitude: 0.0,
            },
            &SpectralFeatures::default(),
        );
        r.detection_sequence = sequence;
        r
    }

    /// Fails the first `failures` stores, then succeeds.
    struct FlakySink {
        failures: u32,
        calls: AtomicU32,
    }

    impl DetectionSink for FlakySink {
        fn store(&self, _record: &DetectionRecord) -> Result<(), PersistenceError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(PersistenceError::Storage("disk full".to_string()))
            } else {
                Ok(())
            }
        }

        fn backend_name(&self) -> &'static str {
            "flaky"
        }
    }

    #[test]
    fn test_in_memory_evicts_oldest() {
        let sink = InMemorySink::with_capacity(2);
        for seq in 1..=3 {
            sink.store(&record(seq)).unwrap();
        }
        let seqs: Vec<u64> = sink.records().iter().map(|r| r.detection_sequence).collect();
        assert_eq!(seqs, vec![2, 3]);
    }

    #[test]
    fn test_retry_recovers_within_budget() {
        let sink = FlakySink {
            failures: 2,
            calls: AtomicU32::new(0),
        };
        assert!(persist_with_retry(&sink, &record(1), RetryPolicy::new(3, 0)).is_ok());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_retry_gives_up_after_budget() {
        let sink = FlakySink {
            failures: 10,
            calls: AtomicU32::new(0),
        };
        assert!(persist_with_retry(&sink, &record(1), RetryPolicy::new(3, 0)).is_err());
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }
}
