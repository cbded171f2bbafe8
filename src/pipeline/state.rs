//! Scan state and run statistics
//!
//! Owned by the orchestrator; read by the scan loop and the CLI for
//! reporting.

use serde::{Deserialize, Serialize};

// ============================================================================
// Scan Phase
// ============================================================================

/// Where the orchestrator is in its sweep cycle.
///
/// ```text
/// Idle -> Scanning(n) -> PerFrequency(f) -> {Matched | Detected} -> next f
///      ^                                                              |
///      +--------------------- sleep <---------------------------------+
/// ```
///
/// `ShuttingDown -> Stopped` is entered from any phase on cancellation or
/// after an unrecoverable front-end failure.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ScanPhase {
    Idle,
    Scanning { scan: u64 },
    PerFrequency { scan: u64, frequency_hz: f64 },
    Matched { frequency_hz: f64 },
    Detected { frequency_hz: f64, sequence: u64 },
    ShuttingDown,
    Stopped,
}

impl std::fmt::Display for ScanPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Scanning { scan } => write!(f, "SCANNING(#{scan})"),
            Self::PerFrequency { frequency_hz, .. } => {
                write!(f, "PER_FREQUENCY({:.4} MHz)", frequency_hz / 1e6)
            }
            Self::Matched { frequency_hz } => write!(f, "MATCHED({:.4} MHz)", frequency_hz / 1e6),
            Self::Detected { sequence, .. } => write!(f, "DETECTED(seq {sequence})"),
            Self::ShuttingDown => write!(f, "SHUTTING_DOWN"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

// ============================================================================
// Per-step outcome
// ============================================================================

/// Result of one frequency step that produced a measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A baseline entry accepted the measurement
    Matched,
    /// Detection recorded and persisted
    Detected { sequence: u64, confidence: f64 },
    /// Detection assembled but every persistence attempt failed
    Dropped { sequence: u64 },
}

// ============================================================================
// Summaries
// ============================================================================

/// Counts for one sweep over the target list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scan_number: u64,
    pub matched: usize,
    pub detected: usize,
    /// Steps lost to front-end errors
    pub skipped: usize,
    /// Detections lost to persistence errors
    pub dropped: usize,
    /// Sweep stopped early on cancellation
    pub cancelled: bool,
}

impl ScanSummary {
    pub fn steps(&self) -> usize {
        self.matched + self.detected + self.skipped + self.dropped
    }
}

/// Totals for a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub scans: u64,
    pub matched: u64,
    pub detected: u64,
    pub skipped: u64,
    pub dropped: u64,
    /// Highest detection sequence assigned (0 if none)
    pub last_sequence: u64,
}

impl RunStats {
    pub fn absorb(&mut self, summary: &ScanSummary) {
        self.scans += 1;
        self.matched += summary.matched as u64;
        self.detected += summary.detected as u64;
        self.skipped += summary.skipped as u64;
        self.dropped += summary.dropped as u64;
    }
}
