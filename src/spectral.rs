//! FFT power spectrum and band aggregation for one channel.
//!
//! The periodogram is the raw DFT of the whole channel (no window, no
//! zero-padding) restricted to strictly positive frequencies:
//!
//! ```text
//! f_k = k · fs / N,  P_k = |X_k|² / N,  k = 1 ..= (N−1)/2
//! ```
//!
//! Band power sums the bins of each canonical band; a bin on a shared edge
//! counts for the lower band only, so the five band powers never add up to
//! more than the total.
use std::collections::BTreeMap;

use ndarray::ArrayView1;
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;
use tracing::warn;

use crate::bands::{rhythm_for_frequency, FrequencyBand, Rhythm};
use crate::error::{check_sampling_rate, EegError, Result};
use crate::signal::MultichannelSignal;

/// One-sided periodogram.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerSpectrum {
    /// Ascending, strictly positive, in Hz.
    pub frequencies: Vec<f64>,
    /// Non-negative, same length as `frequencies`.
    pub power: Vec<f64>,
}

/// Spectral descriptors of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectralResult {
    pub frequencies: Vec<f64>,
    pub power_spectrum: Vec<f64>,
    pub rhythm_power: BTreeMap<Rhythm, f64>,
    pub relative_power: BTreeMap<Rhythm, f64>,
    pub total_power: f64,
    pub peak_frequency: f64,
}

/// Periodogram of `x` sampled at `sampling_rate`.
pub fn power_spectrum(x: ArrayView1<'_, f64>, sampling_rate: f64) -> Result<PowerSpectrum> {
    let fs = check_sampling_rate(sampling_rate)?;
    let n = x.len();
    let n_pos = n.saturating_sub(1) / 2;
    if n_pos == 0 {
        return Err(EegError::InputShape(format!(
            "power spectrum needs at least 3 samples, got {n}"
        )));
    }

    let mut buf: Vec<Complex<f64>> = x.iter().map(|&v| Complex::new(v, 0.0)).collect();
    FftPlanner::new().plan_fft_forward(n).process(&mut buf);

    let nf = n as f64;
    let frequencies = (1..=n_pos).map(|k| k as f64 * fs / nf).collect();
    let power = buf[1..=n_pos].iter().map(|c| c.norm_sqr() / nf).collect();
    Ok(PowerSpectrum { frequencies, power })
}

/// Sum of power per canonical band. Every band is present.
pub fn band_powers(spectrum: &PowerSpectrum) -> BTreeMap<Rhythm, f64> {
    let mut out: BTreeMap<Rhythm, f64> = Rhythm::ALL.iter().map(|&r| (r, 0.0)).collect();
    for (&f, &p) in spectrum.frequencies.iter().zip(&spectrum.power) {
        if let Some(r) = rhythm_for_frequency(f) {
            *out.entry(r).or_insert(0.0) += p;
        }
    }
    out
}

/// `band / total` per band; all zeros when `total` is not positive.
pub fn relative_powers(band_power: &BTreeMap<Rhythm, f64>, total: f64) -> BTreeMap<Rhythm, f64> {
    if total > 0.0 {
        band_power.iter().map(|(&r, &p)| (r, p / total)).collect()
    } else {
        warn!("total spectral power is zero, relative powers set to 0");
        band_power.keys().map(|&r| (r, 0.0)).collect()
    }
}

/// Frequency of the largest bin; the lowest such frequency on ties, 0 for an
/// empty spectrum.
pub fn peak_frequency(frequencies: &[f64], power: &[f64]) -> f64 {
    argmax(power).map_or(0.0, |i| frequencies[i])
}

/// Peak frequency among bins inside `band`; 0 when the band holds no bins.
pub fn dominant_frequency_in_band(frequencies: &[f64], power: &[f64], band: FrequencyBand) -> f64 {
    let mut best: Option<(f64, f64)> = None;
    for (&f, &p) in frequencies.iter().zip(power) {
        if band.contains(f) && best.map_or(true, |(_, bp)| p > bp) {
            best = Some((f, p));
        }
    }
    best.map_or(0.0, |(f, _)| f)
}

/// Shannon entropy (nats) of the spectrum normalised to unit sum. Zero for an
/// all-zero spectrum.
pub fn spectral_entropy(power: &[f64]) -> f64 {
    let total: f64 = power.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    -power
        .iter()
        .map(|&p| p / total)
        .filter(|&p| p > 0.0)
        .map(|p| p * p.ln())
        .sum::<f64>()
}

/// Band with the largest relative power, earliest in canonical order on ties.
pub fn dominant_rhythm(relative: &BTreeMap<Rhythm, f64>) -> Rhythm {
    let mut best = (Rhythm::Delta, f64::NEG_INFINITY);
    for r in Rhythm::ALL {
        let v = relative.get(&r).copied().unwrap_or(0.0);
        if v > best.1 {
            best = (r, v);
        }
    }
    best.0
}

/// Full spectral pass over channel `channel` of `signal`.
pub fn compute_spectrum(signal: &MultichannelSignal, channel: usize) -> Result<SpectralResult> {
    let x = signal.channel(channel)?;
    let spectrum = power_spectrum(x, signal.sampling_rate)?;
    Ok(summarize(spectrum))
}

/// Band aggregation of an already computed periodogram.
pub fn summarize(spectrum: PowerSpectrum) -> SpectralResult {
    let rhythm_power = band_powers(&spectrum);
    let total_power: f64 = spectrum.power.iter().sum();
    let relative_power = relative_powers(&rhythm_power, total_power);
    let peak_frequency = peak_frequency(&spectrum.frequencies, &spectrum.power);
    SpectralResult {
        frequencies: spectrum.frequencies,
        power_spectrum: spectrum.power,
        rhythm_power,
        relative_power,
        total_power,
        peak_frequency,
    }
}

/// Index of the first maximum.
pub(crate) fn argmax(values: &[f64]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.map_or(true, |b| v > values[b]) {
            best = Some(i);
        }
    }
    best
}
