//! Detection persistence
//!
//! - `codec`: little-endian float32 blob layout shared by storage and replay
//! - `detections`: sled-backed durable store
//! - `persistence`: the `DetectionSink` seam, retry policy and in-memory sink
//! - `lockfile`: one process per data directory

pub mod codec;
mod detections;
pub mod lockfile;
mod persistence;

pub use detections::{decode_blobs, DecodedBlobs, SledDetectionStore};
pub use lockfile::{LockError, ProcessLock};
pub use persistence::{
    persist_with_retry, DetectionSink, InMemorySink, PersistenceError, RetryPolicy,
};
