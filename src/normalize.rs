//! Per-channel amplitude normalisation.
//!
//! `zscore`  — `(x − μ) / σ` per row, σ with ddof = 0
//! `minmax`  — `(x − min) / (max − min)` per row
//!
//! A flat channel (σ = 0 or max = min) has no scale; it is centred (z-score)
//! or mapped to zeros (min-max) instead of producing NaN.
use ndarray::{Array2, ArrayView1};

use crate::config::NormalizeMethod;

/// Normalise every row of `data` with `method`, returning a new array.
pub fn normalize(data: &Array2<f64>, method: NormalizeMethod) -> Array2<f64> {
    let mut out = data.clone();
    match method {
        NormalizeMethod::Zscore => zscore_rows_inplace(&mut out),
        NormalizeMethod::Minmax => minmax_rows_inplace(&mut out),
    }
    out
}

/// Per-channel z-score.
pub fn zscore_rows_inplace(data: &mut Array2<f64>) {
    for mut row in data.rows_mut() {
        let (mean, std) = mean_std(row.view());
        if std > 0.0 {
            row.mapv_inplace(|v| (v - mean) / std);
        } else {
            row.mapv_inplace(|v| v - mean);
        }
    }
}

/// Per-channel min-max scaling to `[0, 1]`.
pub fn minmax_rows_inplace(data: &mut Array2<f64>) {
    for mut row in data.rows_mut() {
        let lo = row.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = hi - lo;
        if range > 0.0 {
            row.mapv_inplace(|v| (v - lo) / range);
        } else {
            row.fill(0.0);
        }
    }
}

/// Mean and population standard deviation of one channel.
pub(crate) fn mean_std(x: ArrayView1<'_, f64>) -> (f64, f64) {
    let n = x.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let mean = x.sum() / n as f64;
    let var = x.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n as f64;
    (mean, var.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zscore_each_row_mean_zero_std_one() {
        let data = Array2::from_shape_fn((4, 512), |(c, t)| {
            (c as f64 * 3.7 + t as f64 * 0.1).sin() * 50.0 + c as f64 * 10.0
        });
        let out = normalize(&data, NormalizeMethod::Zscore);
        for row in out.rows() {
            let (m, s) = mean_std(row);
            approx::assert_abs_diff_eq!(m, 0.0, epsilon = 1e-10);
            approx::assert_abs_diff_eq!(s, 1.0, epsilon = 1e-10);
        }
    }

    #[test]
    fn minmax_spans_unit_interval() {
        let data = Array2::from_shape_fn((2, 100), |(c, t)| (t as f64 - 30.0) * (c as f64 + 1.0));
        let out = normalize(&data, NormalizeMethod::Minmax);
        for row in out.rows() {
            approx::assert_abs_diff_eq!(row.iter().copied().fold(f64::INFINITY, f64::min), 0.0);
            approx::assert_abs_diff_eq!(row.iter().copied().fold(f64::NEG_INFINITY, f64::max), 1.0);
        }
    }

    #[test]
    fn flat_channel_no_nan() {
        let data = Array2::from_elem((1, 64), 7.0);
        let z = normalize(&data, NormalizeMethod::Zscore);
        let m = normalize(&data, NormalizeMethod::Minmax);
        assert!(z.iter().all(|&v| v == 0.0));
        assert!(m.iter().all(|&v| v == 0.0));
    }
}
