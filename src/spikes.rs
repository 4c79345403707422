//! Windowed peak picking and spike detection.
//!
//! [`find_peaks`] follows `scipy.signal.find_peaks` with `height` and
//! `distance`:
//!   • local maxima, flat tops reported at their (lower) midpoint, the first
//!     and last sample never qualify
//!   • candidates below `height` dropped (`>=` keeps)
//!   • distance suppression by priority: taller peaks first, the leftmost of
//!     equally tall peaks first; every kept peak removes all candidates closer
//!     than `distance` samples
use ndarray::ArrayView1;
use serde::Serialize;
use tracing::debug;

use crate::error::{check_sampling_rate, Result};
use crate::normalize::mean_std;
use crate::signal::MultichannelSignal;

/// Minimum spacing between spikes, seconds.
pub const SPIKE_MIN_SEPARATION_S: f64 = 0.1;

/// Detected spikes of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpikeResult {
    /// Ascending, seconds from the first sample.
    pub spike_times: Vec<f64>,
    /// Raw sample values at the spike positions.
    pub spike_amplitudes: Vec<f64>,
    pub spike_count: usize,
    /// Mean of `spike_amplitudes`, 0 without spikes.
    pub mean_amplitude: f64,
    /// Spikes per second of recording.
    pub spike_rate: f64,
}

/// Indices of peaks in `x`, ascending.
pub fn find_peaks(x: &[f64], min_height: Option<f64>, min_distance: usize) -> Vec<usize> {
    let mut peaks = local_maxima(x);
    if let Some(h) = min_height {
        peaks.retain(|&i| x[i] >= h);
    }
    if min_distance > 1 && peaks.len() > 1 {
        peaks = select_by_distance(&peaks, x, min_distance);
    }
    peaks
}

fn local_maxima(x: &[f64]) -> Vec<usize> {
    let n = x.len();
    let mut peaks = Vec::new();
    if n < 3 {
        return peaks;
    }
    let mut i = 1;
    while i < n - 1 {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead - 1;
            }
        }
        i += 1;
    }
    peaks
}

fn select_by_distance(peaks: &[usize], x: &[f64], distance: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[b]].total_cmp(&x[peaks[a]]).then(a.cmp(&b)));

    let mut keep = vec![true; peaks.len()];
    for j in order {
        if !keep[j] {
            continue;
        }
        for k in (0..j).rev() {
            if peaks[j] - peaks[k] >= distance {
                break;
            }
            keep[k] = false;
        }
        for k in j + 1..peaks.len() {
            if peaks[k] - peaks[j] >= distance {
                break;
            }
            keep[k] = false;
        }
    }
    peaks.iter().zip(keep).filter(|(_, k)| *k).map(|(&p, _)| p).collect()
}

/// Spikes of one channel: peaks of `|x − mean|` at least `threshold · std`
/// high and at least 100 ms apart.
pub fn detect_spikes_1d(x: ArrayView1<'_, f64>, sampling_rate: f64, threshold: f64) -> Result<SpikeResult> {
    let fs = check_sampling_rate(sampling_rate)?;
    let (mean, std) = mean_std(x);
    let deviation: Vec<f64> = x.iter().map(|v| (v - mean).abs()).collect();
    let distance = (fs * SPIKE_MIN_SEPARATION_S).ceil() as usize;
    let peaks = find_peaks(&deviation, Some(threshold * std), distance);

    let spike_times: Vec<f64> = peaks.iter().map(|&i| i as f64 / fs).collect();
    let spike_amplitudes: Vec<f64> = peaks.iter().map(|&i| x[i]).collect();
    let spike_count = peaks.len();
    let mean_amplitude = if spike_count > 0 {
        spike_amplitudes.iter().sum::<f64>() / spike_count as f64
    } else {
        0.0
    };
    let duration = x.len() as f64 / fs;
    let spike_rate = if duration > 0.0 { spike_count as f64 / duration } else { 0.0 };
    debug!(spike_count, threshold, "spike detection finished");

    Ok(SpikeResult { spike_times, spike_amplitudes, spike_count, mean_amplitude, spike_rate })
}

/// Spikes of channel `channel` of `signal`.
pub fn detect_spikes(signal: &MultichannelSignal, channel: usize, threshold: f64) -> Result<SpikeResult> {
    detect_spikes_1d(signal.channel(channel)?, signal.sampling_rate, threshold)
}
