//! Agreement metrics between our processed signal and an external reference
//! (e.g. the same recording filtered by another toolkit).
use std::fmt::Write as _;

use ndarray::{Array2, ArrayView1};
use serde::Serialize;

use crate::error::{EegError, Result};
use crate::signal::MultichannelSignal;
use crate::welch::welch;

/// Per-channel agreement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChannelComparison {
    pub channel: String,
    /// Pearson correlation, 0 when either side is constant.
    pub correlation: f64,
    /// `1 − SS_res / SS_tot` against the reference, 0 for a flat reference.
    pub r_squared: f64,
    pub rmse: f64,
    pub mae: f64,
    /// RMSE in percent of the reference range, 0 for a flat reference.
    pub nrmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub mean_correlation: f64,
    pub mean_r_squared: f64,
    pub mean_rmse: f64,
    pub mean_nrmse: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterComparison {
    pub channels: Vec<ChannelComparison>,
    pub summary: ComparisonSummary,
}

/// Compare every channel of `ours` against `reference` (same shape).
pub fn compare_filtering(ours: &MultichannelSignal, reference: &Array2<f64>) -> Result<FilterComparison> {
    if ours.data.dim() != reference.dim() {
        return Err(EegError::InputShape(format!(
            "comparison needs equal shapes, got {:?} and {:?}",
            ours.data.dim(),
            reference.dim()
        )));
    }
    let channels: Vec<ChannelComparison> = ours
        .data
        .rows()
        .into_iter()
        .zip(reference.rows())
        .enumerate()
        .map(|(i, (a, b))| compare_channel(ours.channel_name(i), a, b))
        .collect();

    let mean = |f: fn(&ChannelComparison) -> f64| {
        if channels.is_empty() {
            0.0
        } else {
            channels.iter().map(f).sum::<f64>() / channels.len() as f64
        }
    };
    let summary = ComparisonSummary {
        mean_correlation: mean(|c| c.correlation),
        mean_r_squared: mean(|c| c.r_squared),
        mean_rmse: mean(|c| c.rmse),
        mean_nrmse: mean(|c| c.nrmse),
    };
    Ok(FilterComparison { channels, summary })
}

fn compare_channel(name: String, ours: ArrayView1<'_, f64>, reference: ArrayView1<'_, f64>) -> ChannelComparison {
    let n = ours.len().max(1) as f64;
    let rmse = (ours.iter().zip(reference).map(|(a, b)| (a - b).powi(2)).sum::<f64>() / n).sqrt();
    let mae = ours.iter().zip(reference).map(|(a, b)| (a - b).abs()).sum::<f64>() / n;

    let ref_mean = reference.sum() / n;
    let ss_tot: f64 = reference.iter().map(|b| (b - ref_mean).powi(2)).sum();
    let ss_res: f64 = ours.iter().zip(reference).map(|(a, b)| (b - a).powi(2)).sum();
    let r_squared = if ss_tot > 0.0 { 1.0 - ss_res / ss_tot } else { 0.0 };

    let lo = reference.iter().copied().fold(f64::INFINITY, f64::min);
    let hi = reference.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = hi - lo;
    let nrmse = if range > 0.0 { rmse / range * 100.0 } else { 0.0 };

    ChannelComparison {
        channel: name,
        correlation: pearson(ours.iter().copied(), reference.iter().copied()),
        r_squared,
        rmse,
        mae,
        nrmse,
    }
}

/// Pearson correlation; 0 if either input has zero variance.
pub fn pearson(a: impl Iterator<Item = f64> + Clone, b: impl Iterator<Item = f64> + Clone) -> f64 {
    let (mut n, mut sa, mut sb) = (0usize, 0.0, 0.0);
    for (x, y) in a.clone().zip(b.clone()) {
        n += 1;
        sa += x;
        sb += y;
    }
    if n == 0 {
        return 0.0;
    }
    let (ma, mb) = (sa / n as f64, sb / n as f64);
    let (mut cov, mut va, mut vb) = (0.0, 0.0, 0.0);
    for (x, y) in a.zip(b) {
        cov += (x - ma) * (y - mb);
        va += (x - ma).powi(2);
        vb += (y - mb).powi(2);
    }
    if va > 0.0 && vb > 0.0 {
        cov / (va * vb).sqrt()
    } else {
        0.0
    }
}

/// Agreement of two Welch PSDs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PsdComparison {
    pub correlation: f64,
    pub rmse: f64,
    pub mean_abs_difference: f64,
}

/// Compare the Welch PSDs (`nperseg = min(256, N)`) of two equally long
/// channels.
pub fn compare_psd(ours: &[f64], reference: &[f64], sampling_rate: f64) -> Result<PsdComparison> {
    if ours.len() != reference.len() {
        return Err(EegError::InputShape(format!(
            "PSD comparison needs equal lengths, got {} and {}",
            ours.len(),
            reference.len()
        )));
    }
    let nperseg = 256.min(ours.len());
    let a = welch(ours, sampling_rate, nperseg)?.density;
    let b = welch(reference, sampling_rate, nperseg)?.density;
    let n = a.len().max(1) as f64;
    Ok(PsdComparison {
        correlation: pearson(a.iter().copied(), b.iter().copied()),
        rmse: (a.iter().zip(&b).map(|(x, y)| (x - y).powi(2)).sum::<f64>() / n).sqrt(),
        mean_abs_difference: a.iter().zip(&b).map(|(x, y)| (x - y).abs()).sum::<f64>() / n,
    })
}

/// Plain-text report of a comparison.
pub fn render_report(cmp: &FilterComparison) -> String {
    let mut s = String::new();
    let _ = writeln!(s, "FILTER VALIDATION REPORT");
    let _ = writeln!(s, "{}", "=".repeat(48));
    let _ = writeln!(
        s,
        "{:<12} {:>8} {:>8} {:>10} {:>10} {:>8}",
        "channel", "corr", "R²", "RMSE", "MAE", "NRMSE%"
    );
    for c in &cmp.channels {
        let _ = writeln!(
            s,
            "{:<12} {:>8.4} {:>8.4} {:>10.4e} {:>10.4e} {:>8.3}",
            c.channel, c.correlation, c.r_squared, c.rmse, c.mae, c.nrmse
        );
    }
    let m = &cmp.summary;
    let _ = writeln!(s, "{}", "-".repeat(48));
    let _ = writeln!(
        s,
        "mean correlation {:.4}, mean R² {:.4}, mean RMSE {:.4e}, mean NRMSE {:.3}%",
        m.mean_correlation, m.mean_r_squared, m.mean_rmse, m.mean_nrmse
    );
    let verdict = if m.mean_correlation > 0.99 {
        "excellent agreement"
    } else if m.mean_correlation > 0.95 {
        "good agreement"
    } else {
        "significant differences, check filter parameters"
    };
    let _ = writeln!(s, "verdict: {verdict}");
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_signals_agree_perfectly() {
        let data = Array2::from_shape_fn((2, 200), |(c, t)| (t as f64 * 0.1 + c as f64).sin());
        let sig = MultichannelSignal::new(data.clone(), 100.0, vec!["Fz".into()]).unwrap();
        let cmp = compare_filtering(&sig, &data).unwrap();
        assert_eq!(cmp.channels[1].channel, "Ch2");
        for c in &cmp.channels {
            approx::assert_abs_diff_eq!(c.correlation, 1.0, epsilon = 1e-12);
            approx::assert_abs_diff_eq!(c.r_squared, 1.0, epsilon = 1e-12);
            assert_eq!(c.rmse, 0.0);
        }
        assert!(render_report(&cmp).contains("excellent"));
    }

    #[test]
    fn flat_reference_zeroes_relative_metrics() {
        let ours = MultichannelSignal::from_samples(&[1.0, 2.0, 3.0], 10.0).unwrap();
        let reference = Array2::from_elem((1, 3), 2.0);
        let c = &compare_filtering(&ours, &reference).unwrap().channels[0];
        assert_eq!(c.r_squared, 0.0);
        assert_eq!(c.nrmse, 0.0);
        assert_eq!(c.correlation, 0.0);
        approx::assert_abs_diff_eq!(c.mae, 2.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn shape_mismatch_rejected() {
        let ours = MultichannelSignal::from_samples(&[1.0, 2.0], 10.0).unwrap();
        assert!(matches!(
            compare_filtering(&ours, &Array2::zeros((2, 2))),
            Err(EegError::InputShape(_))
        ));
    }

    #[test]
    fn psd_of_same_signal() {
        let x: Vec<f64> = (0..1000).map(|t| (t as f64 * 0.2).sin()).collect();
        let p = compare_psd(&x, &x, 100.0).unwrap();
        approx::assert_abs_diff_eq!(p.correlation, 1.0, epsilon = 1e-12);
        assert_eq!(p.rmse, 0.0);
    }
}
