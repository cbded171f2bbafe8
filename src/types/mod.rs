//! Shared data structures for the spectrum detection pipeline
//!
//! - `ScanSample`: one acquired block of I/Q at a tuned frequency
//! - `SpectralFeatures`: everything derived from a block, computed once
//! - `DetectionRecord`: the immutable record handed to persistence

mod sample;
mod features;
mod detection;

pub use sample::*;
pub use features::*;
pub use detection::*;
