//! Signal conditioning stages and the pipeline that chains them.
//!
//! Every stage takes `[C, T]` data and returns a new array of the same shape;
//! the input is never modified, so a failing stage leaves the caller's data
//! intact.
//!
//! Pipeline order (see [`run_pipeline`]):
//!
//! ```text
//! band-pass ─▶ notch ─▶ detrend ─▶ DC ─▶ artifacts ─▶ wavelet ─▶ normalise
//!              (>0 Hz)   (flag)    (flag)  (flag)      (Some)     (Some)
//! ```
use ndarray::{Array2, ArrayView1};
use tracing::debug;

use crate::config::PreprocessConfig;
use crate::error::{check_sampling_rate, EegError, Result};
use crate::filter::{butter_bandpass, iir_notch, sosfiltfilt, BUTTERWORTH_ORDER};
use crate::normalize::{mean_std, normalize};
use crate::observe::{timed, StageSink};
use crate::signal::MultichannelSignal;
use crate::validate::{log_warnings, validate_bandpass_params, validate_notch_params};
use crate::wavelet;

/// Output of a filtering stage: new samples plus the parameter corrections
/// made on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub data: Array2<f64>,
    pub warnings: Vec<String>,
    /// Edges or centre actually used, in Hz.
    pub applied: (f64, f64),
}

/// Zero-phase 4th-order Butterworth band-pass with validated edges.
pub fn bandpass_filter(
    data: &Array2<f64>,
    sampling_rate: f64,
    low_freq: f64,
    high_freq: f64,
) -> Result<Filtered> {
    let params = validate_bandpass_params(low_freq, high_freq, sampling_rate)?;
    log_warnings("bandpass", &params.warnings);

    let nyquist = sampling_rate / 2.0;
    let (low, high) = (params.low, params.high);
    if !(low > 0.0 && low < high && high < nyquist) {
        return Err(EegError::InputShape(format!(
            "band-pass edges out of order after correction: low={low} Hz, high={high} Hz, \
             nyquist={nyquist} Hz"
        )));
    }

    let filter = butter_bandpass(BUTTERWORTH_ORDER, low / nyquist, high / nyquist)?;
    let out = sosfiltfilt(&filter, data)?;
    debug!(low, high, channels = data.nrows(), "band-pass applied");
    Ok(Filtered { data: out, warnings: params.warnings, applied: (low, high) })
}

/// Zero-phase IIR notch at a validated centre frequency.
pub fn notch_filter(
    data: &Array2<f64>,
    sampling_rate: f64,
    notch_freq: f64,
    quality: f64,
) -> Result<Filtered> {
    let params = validate_notch_params(notch_freq, sampling_rate)?;
    log_warnings("notch", &params.warnings);

    let nyquist = sampling_rate / 2.0;
    let filter = iir_notch(params.freq / nyquist, quality)?;
    let out = sosfiltfilt(&filter, data)?;
    debug!(freq = params.freq, quality, "notch applied");
    Ok(Filtered { data: out, warnings: params.warnings, applied: (params.freq, params.freq) })
}

/// Remove the least-squares line from every channel.
pub fn detrend(data: &Array2<f64>) -> Array2<f64> {
    let mut out = data.clone();
    for mut row in out.rows_mut() {
        let (intercept, slope) = linear_fit(row.view());
        for (t, v) in row.iter_mut().enumerate() {
            *v -= intercept + slope * t as f64;
        }
    }
    out
}

/// Subtract the per-channel mean.
pub fn remove_dc(data: &Array2<f64>) -> Array2<f64> {
    let mut out = data.clone();
    for mut row in out.rows_mut() {
        let n = row.len();
        if n > 0 {
            let mean = row.sum() / n as f64;
            row.mapv_inplace(|v| v - mean);
        }
    }
    out
}

/// Replace samples with `|x − mean| > threshold · std` by linear
/// interpolation between the nearest kept samples; outliers before the first
/// (after the last) kept sample take its value. Kept samples are unchanged.
/// A channel with no kept samples is returned as is.
pub fn remove_artifacts(data: &Array2<f64>, threshold: f64) -> Array2<f64> {
    let mut out = data.clone();
    for (ch, mut row) in out.rows_mut().into_iter().enumerate() {
        let (mean, std) = mean_std(row.view());
        let limit = threshold * std;
        let outlier: Vec<bool> = row.iter().map(|&v| (v - mean).abs() > limit).collect();
        let n_out = outlier.iter().filter(|&&o| o).count();
        if n_out == 0 || n_out == row.len() {
            continue;
        }
        let kept: Vec<(usize, f64)> = row
            .iter()
            .enumerate()
            .filter(|(i, _)| !outlier[*i])
            .map(|(i, &v)| (i, v))
            .collect();
        for (i, v) in row.iter_mut().enumerate() {
            if outlier[i] {
                *v = interp(i as f64, &kept);
            }
        }
        debug!(channel = ch, replaced = n_out, "artifacts interpolated");
    }
    out
}

/// Daubechies-4 universal-threshold denoising of every channel.
pub fn wavelet_denoise(data: &Array2<f64>, level: usize) -> Array2<f64> {
    wavelet::denoise(data, level)
}

/// Result of [`run_pipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessOutput {
    pub signal: MultichannelSignal,
    /// Every parameter correction, in stage order.
    pub warnings: Vec<String>,
    /// Names of the stages that ran.
    pub stages: Vec<&'static str>,
}

/// Run the configured stages in fixed order, timing each into `sink`.
pub fn run_pipeline(
    signal: &MultichannelSignal,
    cfg: &PreprocessConfig,
    sink: &mut dyn StageSink,
) -> Result<PreprocessOutput> {
    let fs = check_sampling_rate(signal.sampling_rate)?;
    let mut data = signal.data.clone();
    let mut warnings = Vec::new();
    let mut stages = Vec::new();

    let f = timed(sink, "bandpass", || bandpass_filter(&data, fs, cfg.low_freq, cfg.high_freq))?;
    data = f.data;
    warnings.extend(f.warnings);
    stages.push("bandpass");

    if cfg.notch_freq > 0.0 {
        let f = timed(sink, "notch", || notch_filter(&data, fs, cfg.notch_freq, cfg.notch_quality))?;
        data = f.data;
        warnings.extend(f.warnings);
        stages.push("notch");
    }
    if cfg.detrend {
        data = timed(sink, "detrend", || detrend(&data));
        stages.push("detrend");
    }
    if cfg.remove_dc {
        data = timed(sink, "remove_dc", || remove_dc(&data));
        stages.push("remove_dc");
    }
    if cfg.remove_artifacts {
        data = timed(sink, "artifacts", || remove_artifacts(&data, cfg.artifact_threshold));
        stages.push("artifacts");
    }
    if let Some(w) = cfg.wavelet {
        data = timed(sink, "wavelet", || wavelet_denoise(&data, w.level));
        stages.push("wavelet");
    }
    if let Some(method) = cfg.normalize {
        data = timed(sink, "normalize", || normalize(&data, method));
        stages.push("normalize");
    }

    debug!(?stages, warnings = warnings.len(), "preprocessing finished");
    Ok(PreprocessOutput { signal: signal.with_data(data), warnings, stages })
}

/// `(intercept, slope)` of the least-squares line through `(t, x[t])`.
fn linear_fit(x: ArrayView1<'_, f64>) -> (f64, f64) {
    let n = x.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let nf = n as f64;
    let t_mean = (nf - 1.0) / 2.0;
    let x_mean = x.sum() / nf;
    if n < 2 {
        return (x_mean, 0.0);
    }
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (t, &v) in x.iter().enumerate() {
        let dt = t as f64 - t_mean;
        sxy += dt * (v - x_mean);
        sxx += dt * dt;
    }
    let slope = sxy / sxx;
    (x_mean - slope * t_mean, slope)
}

/// Piecewise-linear interpolation through `anchors` (ascending, non-empty),
/// clamped to the end values outside their range.
fn interp(t: f64, anchors: &[(usize, f64)]) -> f64 {
    let pos = anchors.partition_point(|&(i, _)| (i as f64) < t);
    match pos {
        0 => anchors[0].1,
        p if p == anchors.len() => anchors[p - 1].1,
        p => {
            let (i0, v0) = anchors[p - 1];
            let (i1, v1) = anchors[p];
            let w = (t - i0 as f64) / (i1 - i0) as f64;
            v0 + w * (v1 - v0)
        }
    }
}
