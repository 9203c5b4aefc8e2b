//! Statistics toolkit for reducing raw sample streams to signatures
//!
//! Pure numeric primitives used by the probe reductions (MEMS bias/noise,
//! clock skew, keystroke variance) and by the gait frequency analysis. Every
//! function is side-effect-free and returns a safe default on empty input, so
//! callers never need an error path.

/// Component-wise mean of a sequence of 3-vectors.
///
/// Returns `[0.0, 0.0, 0.0]` for an empty sequence.
pub fn mean(samples: &[[f64; 3]]) -> [f64; 3] {
    if samples.is_empty() {
        return [0.0, 0.0, 0.0];
    }
    let mut sum = [0.0f64; 3];
    for s in samples {
        sum[0] += s[0];
        sum[1] += s[1];
        sum[2] += s[2];
    }
    let n = samples.len() as f64;
    [sum[0] / n, sum[1] / n, sum[2] / n]
}

/// Population variance (divide by N, not N-1).
///
/// Returns 0.0 for an empty sequence.
pub fn variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

/// Standard deviation of the flattened components of a 3-vector stream.
pub fn std_dev_flattened(samples: &[[f64; 3]]) -> f64 {
    let flat: Vec<f64> = samples.iter().flat_map(|s| s.iter().copied()).collect();
    variance(&flat).sqrt()
}

/// One spectral bin produced by [`frequency_spectrum`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpectralBin {
    /// Physical frequency in Hz (`k * sample_rate / n`)
    pub frequency: f64,
    /// Normalized magnitude (`|X[k]| / n`)
    pub magnitude: f64,
}

/// Bins with normalized magnitude at or below this value are discarded.
/// Literal value is a compatibility contract with the downstream step
/// frequency classification; do not tune.
const MAGNITUDE_FLOOR: f64 = 0.01;

/// Maximum number of frequency bins evaluated, regardless of input length.
const MAX_BINS: usize = 64;

/// Bounded discrete frequency-domain decomposition.
///
/// Direct O(N*K) transform restricted to bins `1..min(64, N/2)`. For each bin
/// the cosine and sine sums are accumulated over all N samples, the magnitude
/// is normalized by N, and bins whose magnitude does not exceed 0.01 are
/// discarded. This is intentionally not an FFT: the bin cap and magnitude
/// floor match the behavioral contract of the gait classifier bin-for-bin.
pub fn frequency_spectrum(samples: &[f64], sample_rate: f64) -> Vec<SpectralBin> {
    let n = samples.len();
    if n < 2 || sample_rate <= 0.0 {
        return Vec::new();
    }
    let max_bins = MAX_BINS.min(n / 2);
    let mut bins = Vec::new();
    for k in 1..max_bins {
        let mut real = 0.0f64;
        let mut imag = 0.0f64;
        for (t, x) in samples.iter().enumerate() {
            let angle = 2.0 * std::f64::consts::PI * (k as f64) * (t as f64) / (n as f64);
            real += x * angle.cos();
            imag -= x * angle.sin();
        }
        let magnitude = (real * real + imag * imag).sqrt() / (n as f64);
        if magnitude > MAGNITUDE_FLOOR {
            bins.push(SpectralBin {
                frequency: (k as f64) * sample_rate / (n as f64),
                magnitude,
            });
        }
    }
    bins
}

/// Top-N peak frequencies of a sample stream, strongest first.
///
/// Ties keep their bin order. Returns fewer than `top_n` entries when the
/// spectrum has fewer surviving bins, and an empty vector for degenerate
/// input.
pub fn frequency_peaks(samples: &[f64], sample_rate: f64, top_n: usize) -> Vec<f64> {
    let mut bins = frequency_spectrum(samples, sample_rate);
    bins.sort_by(|a, b| {
        b.magnitude
            .partial_cmp(&a.magnitude)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    bins.into_iter().take(top_n).map(|b| b.frequency).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_component_wise() {
        assert_eq!(
            mean(&[[1.0, 0.0, 0.0], [3.0, 0.0, 0.0]]),
            [2.0, 0.0, 0.0]
        );
        assert_eq!(mean(&[]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_variance_population() {
        assert_eq!(variance(&[2.0, 2.0, 2.0]), 0.0);
        assert_eq!(variance(&[]), 0.0);
        // Population variance of [1, 3] is 1.0 (not 2.0 as with N-1)
        assert!((variance(&[1.0, 3.0]) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_std_dev_flattened() {
        assert_eq!(std_dev_flattened(&[[5.0, 5.0, 5.0]]), 0.0);
        let samples = [[1.0, 1.0, 1.0], [3.0, 3.0, 3.0]];
        assert!((std_dev_flattened(&samples) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pure_sine_peak_within_one_bin() {
        // 2 Hz sine sampled at 50 Hz for 4 seconds
        let rate = 50.0;
        let n = 200;
        let target = 2.0;
        let samples: Vec<f64> = (0..n)
            .map(|t| (2.0 * std::f64::consts::PI * target * (t as f64) / rate).sin())
            .collect();

        let peaks = frequency_peaks(&samples, rate, 5);
        assert!(!peaks.is_empty());
        let bin_width = rate / (n as f64);
        assert!(
            (peaks[0] - target).abs() <= bin_width,
            "top peak {} not within one bin of {}",
            peaks[0],
            target
        );
    }

    #[test]
    fn test_spectrum_bin_cap() {
        // 1000 samples would allow 500 bins; the cap restricts to 64
        let samples: Vec<f64> = (0..1000).map(|t| ((t % 7) as f64) * 0.3).collect();
        let bins = frequency_spectrum(&samples, 100.0);
        for b in &bins {
            // Highest evaluated bin is k = 63
            assert!(b.frequency <= 63.0 * 100.0 / 1000.0 + 1e-9);
            assert!(b.magnitude > 0.01);
        }
    }

    #[test]
    fn test_degenerate_input() {
        assert!(frequency_spectrum(&[], 50.0).is_empty());
        assert!(frequency_spectrum(&[1.0], 50.0).is_empty());
        assert!(frequency_peaks(&[1.0, 2.0], 0.0, 5).is_empty());
    }
}
