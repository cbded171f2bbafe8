//! Local-maximum peak detection over a dB spectrum.

/// Indices of bins strictly greater than both neighbours and above `threshold`.
///
/// Edge bins have only one neighbour and are never reported. Returned in
/// ascending bin order.
pub fn local_maxima(spectrum: &[f64], threshold: f64) -> Vec<usize> {
    if spectrum.len() < 3 {
        return Vec::new();
    }
    spectrum
        .windows(3)
        .enumerate()
        .filter(|(_, w)| w[1] > w[0] && w[1] > w[2] && w[1] > threshold)
        .map(|(i, _)| i + 1)
        .collect()
}

/// One peak set shared by `num_peaks`, the reported peak list, the dominant
/// frequency and the stability estimate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PeakSet {
    /// Every detected peak, ascending bin order
    pub all: Vec<usize>,
    /// The strongest `max_reported` peaks, ascending bin order
    pub reported: Vec<usize>,
    /// The strongest peak overall
    pub dominant: Option<usize>,
}

impl PeakSet {
    pub fn detect(spectrum: &[f64], threshold: f64, max_reported: usize) -> Self {
        let all = local_maxima(spectrum, threshold);

        let mut by_power = all.clone();
        by_power.sort_by(|&a, &b| spectrum[b].total_cmp(&spectrum[a]).then(a.cmp(&b)));
        let dominant = by_power.first().copied();

        by_power.truncate(max_reported);
        by_power.sort_unstable();

        Self {
            all,
            reported: by_power,
            dominant,
        }
    }

    pub fn len(&self) -> usize {
        self.all.len()
    }

    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}
