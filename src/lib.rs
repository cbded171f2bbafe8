//! rf-sentinel: RF spectrum anomaly detection
//!
//! Sweeps a list of frequencies with a software-defined radio, measures each
//! block of I/Q samples, and records every measurement that no entry of the
//! site's baseline accepts.
//!
//! ## Architecture
//!
//! - **acquisition**: `FrontEnd` trait plus synthetic and capture-replay front-ends
//! - **processing**: FFT power spectrum, statistics backends, peaks, feature extraction, waterfall
//! - **baseline**: baseline entries, tolerance profiles, first-match-wins matcher, collection
//! - **scoring**: confidence and signal-quality scores for detections
//! - **pipeline**: per-sweep orchestrator and the async scan loop
//! - **storage**: detection sinks (sled, in-memory), blob codec, process lock

pub mod acquisition;
pub mod baseline;
pub mod config;
pub mod pipeline;
pub mod processing;
pub mod scoring;
pub mod storage;
pub mod types;

pub use config::SentinelConfig;

pub use types::{DetectionRecord, ScanSample, SpectralFeatures};

pub use baseline::{BaselineEntry, BaselineError, BaselineStore, ToleranceProfile};

pub use pipeline::{RunStats, ScanError, ScanLoop, ScanOrchestrator, ScanSummary};

pub use storage::{DetectionSink, InMemorySink, PersistenceError, SledDetectionStore};
