//! Descriptive statistics over all samples of a recording.
//!
//! Moments are population (biased) moments, as `numpy.std` / `scipy.stats`
//! report them by default. Kurtosis is Fisher's (normal → 0). For constant
//! data, where the shape moments are undefined, kurtosis and skewness are 0.
use ndarray::Array2;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Statistics {
    pub mean: f64,
    pub std: f64,
    pub variance: f64,
    pub kurtosis: f64,
    pub skewness: f64,
    pub rms: f64,
    /// `max |x|`.
    pub max_amplitude: f64,
    /// `max x − min x`.
    pub dynamic_range: f64,
}

/// Statistics of every sample of `data`, channels flattened together.
/// Empty input yields all zeros.
pub fn calculate_statistics(data: &Array2<f64>) -> Statistics {
    statistics_of(data.iter().copied())
}

/// Statistics of an arbitrary sample sequence.
pub fn statistics_of(samples: impl Iterator<Item = f64> + Clone) -> Statistics {
    let mut n = 0usize;
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for v in samples.clone() {
        n += 1;
        sum += v;
        sum_sq += v * v;
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if n == 0 {
        return Statistics {
            mean: 0.0,
            std: 0.0,
            variance: 0.0,
            kurtosis: 0.0,
            skewness: 0.0,
            rms: 0.0,
            max_amplitude: 0.0,
            dynamic_range: 0.0,
        };
    }

    let nf = n as f64;
    let mean = sum / nf;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in samples {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    m2 /= nf;
    m3 /= nf;
    m4 /= nf;

    let (kurtosis, skewness) = if m2 > 0.0 {
        (m4 / (m2 * m2) - 3.0, m3 / m2.powf(1.5))
    } else {
        (0.0, 0.0)
    };

    Statistics {
        mean,
        std: m2.sqrt(),
        variance: m2,
        kurtosis,
        skewness,
        rms: (sum_sq / nf).sqrt(),
        max_amplitude: lo.abs().max(hi.abs()),
        dynamic_range: hi - lo,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_zero_is_all_zero() {
        let s = calculate_statistics(&Array2::zeros((3, 100)));
        assert_eq!(s.mean, 0.0);
        assert_eq!(s.std, 0.0);
        assert_eq!(s.rms, 0.0);
        assert_eq!(s.dynamic_range, 0.0);
        assert_eq!(s.kurtosis, 0.0);
    }

    #[test]
    fn known_moments() {
        let data = Array2::from_shape_vec((1, 4), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let s = calculate_statistics(&data);
        approx::assert_abs_diff_eq!(s.mean, 2.5);
        approx::assert_abs_diff_eq!(s.variance, 1.25);
        approx::assert_abs_diff_eq!(s.skewness, 0.0, epsilon = 1e-12);
        // m4 = 2.5625 → 2.5625 / 1.5625 − 3
        approx::assert_abs_diff_eq!(s.kurtosis, -1.36, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(s.rms, 7.5f64.sqrt(), epsilon = 1e-12);
        assert_eq!(s.max_amplitude, 4.0);
        assert_eq!(s.dynamic_range, 3.0);
    }

    #[test]
    fn negative_peak_counts_for_amplitude() {
        let data = Array2::from_shape_vec((2, 2), vec![1.0, -7.0, 2.0, 3.0]).unwrap();
        let s = calculate_statistics(&data);
        assert_eq!(s.max_amplitude, 7.0);
        assert!(s.skewness < 0.0);
    }
}
