//! Scanning Pipeline
//!
//! ```text
//! ScanLoop (async)
//!   └─ spawn_blocking per sweep
//!        └─ ScanOrchestrator::run_scan
//!             acquire -> extract -> waterfall -> match -> [score -> persist]
//! ```
//!
//! Detection steps (score, persist) only run for measurements no baseline
//! entry accepts. The detection sequence increases by one per detection for
//! the whole run, independent of matched or skipped steps.

mod orchestrator;
mod scan_loop;
mod state;
mod tracker;

pub use orchestrator::{ScanError, ScanOrchestrator};
pub use scan_loop::ScanLoop;
pub use state::{RunStats, ScanPhase, ScanSummary, StepOutcome};
pub use tracker::SignalTracker;
