//! Signal processing: FFT, statistics, peaks, feature extraction and the waterfall

mod fft;
mod features;
mod peaks;
mod statistics;
mod waterfall;

pub use fft::{downsample, fft_shift, shifted_bin_frequencies, SpectrumAnalyzer};
pub use features::{ExtractorSettings, FeatureExtractor};
pub use peaks::{local_maxima, PeakSet};
pub use statistics::{
    is_degenerate_spread, Moments, NativeBackend, StatisticsBackend, StatisticsKind, StatrsBackend,
};
pub use waterfall::{frequency_key, FrequencyKey, WaterfallBuffer};
