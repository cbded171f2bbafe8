//! Descriptive statistics behind a swappable backend.
//!
//! The feature extractor only needs a handful of population statistics. Two
//! implementations exist: one delegating to `statrs`, one hand-rolled. The
//! choice is made once at startup from `[scan] statistics`.

use serde::{Deserialize, Serialize};
use statrs::statistics::{Data, Median, Statistics};

/// Which statistics implementation the extractor uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsKind {
    #[default]
    Statrs,
    Native,
}

impl StatisticsKind {
    pub fn backend(self) -> Box<dyn StatisticsBackend> {
        match self {
            Self::Statrs => Box::new(StatrsBackend),
            Self::Native => Box::new(NativeBackend),
        }
    }
}

/// Standardized third and fourth moments.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub skewness: f64,
    /// Excess kurtosis
    pub kurtosis: f64,
}

/// Population statistics over an `f64` slice.
///
/// All methods return 0 for an empty slice.
pub trait StatisticsBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn mean(&self, values: &[f64]) -> f64;

    /// Population standard deviation (divides by n).
    fn std_dev(&self, values: &[f64]) -> f64;

    /// Median; the mean of the two middle values for even lengths.
    fn median(&self, values: &[f64]) -> f64;

    fn variance(&self, values: &[f64]) -> f64 {
        let sd = self.std_dev(values);
        sd * sd
    }

    /// Skewness and excess kurtosis; both 0 when the spread is degenerate.
    fn moments(&self, values: &[f64]) -> Moments {
        if values.is_empty() {
            return Moments::default();
        }
        let mean = self.mean(values);
        let sd = self.std_dev(values);
        if is_degenerate_spread(sd, mean) {
            return Moments::default();
        }
        let n = values.len() as f64;
        let (m3, m4) = values.iter().fold((0.0, 0.0), |(m3, m4), &v| {
            let z = (v - mean) / sd;
            let z2 = z * z;
            (m3 + z2 * z, m4 + z2 * z2)
        });
        Moments {
            skewness: m3 / n,
            kurtosis: m4 / n - 3.0,
        }
    }
}

/// Treat a standard deviation lost in rounding noise as zero.
pub fn is_degenerate_spread(std_dev: f64, mean: f64) -> bool {
    !std_dev.is_finite() || std_dev <= f64::EPSILON * mean.abs().max(1.0) * 16.0
}

// ============================================================================
// statrs
// ============================================================================

pub struct StatrsBackend;

impl StatisticsBackend for StatrsBackend {
    fn name(&self) -> &'static str {
        "statrs"
    }

    fn mean(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        Statistics::mean(values.iter())
    }

    fn std_dev(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        Statistics::population_std_dev(values.iter())
    }

    fn median(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        Data::new(values.to_vec()).median()
    }
}

// ============================================================================
// Hand-rolled
// ============================================================================

pub struct NativeBackend;

impl StatisticsBackend for NativeBackend {
    fn name(&self) -> &'static str {
        "native"
    }

    fn mean(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        values.iter().sum::<f64>() / values.len() as f64
    }

    fn std_dev(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mean = self.mean(values);
        let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        var.sqrt()
    }

    fn median(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        let mid = sorted.len() / 2;
        if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / 2.0
        } else {
            sorted[mid]
        }
    }
}
