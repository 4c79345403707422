//! Rhythm decomposition of one channel.
//!
//! [`analyze_rhythms`] combines the FFT band powers with a per-band
//! zero-phase Butterworth decomposition: the mean absolute amplitude and the
//! dominant in-band frequency of every filtered rhythm.
//!
//! [`analyze_single_rhythm`] is the lighter per-band view used by the live
//! display: a Welch PSD integrated over the band.
use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, Axis};
use serde::Serialize;
use tracing::debug;

use crate::bands::{FrequencyBand, Rhythm};
use crate::error::Result;
use crate::preprocess::bandpass_filter;
use crate::signal::MultichannelSignal;
use crate::spectral::{self, dominant_frequency_in_band, power_spectrum, SpectralResult};
use crate::validate::capitalize;
use crate::welch::{trapezoid, welch};

/// Welch segment length of the single-rhythm view.
const SINGLE_RHYTHM_NPERSEG: usize = 256;

/// Descriptors of one rhythm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RhythmBandResult {
    pub power: f64,
    pub relative_power: f64,
    /// Mean |x| of the band-limited signal.
    pub mean_amplitude: f64,
    /// Strongest in-band frequency of the band-limited signal, 0 if none.
    pub dominant_frequency: f64,
}

/// Full rhythm analysis of one channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RhythmAnalysis {
    pub rhythms: BTreeMap<Rhythm, RhythmBandResult>,
    pub dominant_rhythm: Rhythm,
    pub spectral_entropy: f64,
    /// The underlying periodogram and band sums.
    pub spectrum: SpectralResult,
    /// Band-edge corrections made while filtering each rhythm.
    pub warnings: Vec<String>,
}

impl RhythmAnalysis {
    /// Relative power per band, the input of the rule engine.
    pub fn relative_powers(&self) -> BTreeMap<Rhythm, f64> {
        self.rhythms.iter().map(|(&r, b)| (r, b.relative_power)).collect()
    }
}

/// Analyse channel `channel` of `signal`.
pub fn analyze_rhythms(signal: &MultichannelSignal, channel: usize) -> Result<RhythmAnalysis> {
    let x = signal.channel(channel)?;
    let fs = signal.sampling_rate;
    let spectrum = spectral::summarize(power_spectrum(x, fs)?);

    let row: Array2<f64> = x.to_owned().insert_axis(Axis(0));
    let mut rhythms = BTreeMap::new();
    let mut warnings = Vec::new();
    for rhythm in Rhythm::ALL {
        let band = rhythm.band();
        let filtered = bandpass_filter(&row, fs, band.low_hz, band.high_hz)?;
        let label = capitalize(rhythm.name());
        warnings.extend(filtered.warnings.iter().map(|w| format!("{label}: {w}")));
        let y = filtered.data.row(0);

        let mean_amplitude = y.iter().map(|v| v.abs()).sum::<f64>() / y.len() as f64;
        let dominant_frequency = band_dominant_frequency(y, fs, band)?;
        rhythms.insert(
            rhythm,
            RhythmBandResult {
                power: spectrum.rhythm_power.get(&rhythm).copied().unwrap_or(0.0),
                relative_power: spectrum.relative_power.get(&rhythm).copied().unwrap_or(0.0),
                mean_amplitude,
                dominant_frequency,
            },
        );
    }

    let dominant_rhythm = spectral::dominant_rhythm(&spectrum.relative_power);
    let spectral_entropy = spectral::spectral_entropy(&spectrum.power_spectrum);
    debug!(channel, %dominant_rhythm, spectral_entropy, "rhythm analysis finished");
    Ok(RhythmAnalysis { rhythms, dominant_rhythm, spectral_entropy, spectrum, warnings })
}

/// Strongest FFT bin of `y` inside the nominal `band`.
fn band_dominant_frequency(y: ArrayView1<'_, f64>, fs: f64, band: FrequencyBand) -> Result<f64> {
    let spec = power_spectrum(y, fs)?;
    Ok(dominant_frequency_in_band(&spec.frequencies, &spec.power, band))
}

/// Welch-based view of one rhythm.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SingleRhythmResult {
    pub rhythm: Rhythm,
    pub band: FrequencyBand,
    /// Trapezoidal integral of the PSD over the band.
    pub power: f64,
    /// `power / total_power`, 0 when the total is 0.
    pub relative_power: f64,
    pub total_power: f64,
    /// Strongest in-band PSD bin, 0 when the band holds no bins.
    pub peak_frequency: f64,
    /// In-band PSD bins.
    pub frequencies: Vec<f64>,
    pub psd: Vec<f64>,
}

/// Single-rhythm analysis of channel `channel`.
pub fn analyze_single_rhythm(
    signal: &MultichannelSignal,
    channel: usize,
    rhythm: Rhythm,
) -> Result<SingleRhythmResult> {
    let samples = signal.channel(channel)?.to_vec();
    let nperseg = SINGLE_RHYTHM_NPERSEG.min(samples.len());
    let psd = welch(&samples, signal.sampling_rate, nperseg)?;
    let band = rhythm.band();

    let (frequencies, band_psd): (Vec<f64>, Vec<f64>) = psd
        .frequencies
        .iter()
        .zip(&psd.density)
        .filter(|(f, _)| band.contains(**f))
        .map(|(&f, &p)| (f, p))
        .unzip();

    let power = trapezoid(&band_psd, &frequencies);
    let total_power = trapezoid(&psd.density, &psd.frequencies);
    let relative_power = if total_power > 0.0 { power / total_power } else { 0.0 };
    let peak_frequency = spectral::argmax(&band_psd).map_or(0.0, |i| frequencies[i]);

    Ok(SingleRhythmResult {
        rhythm,
        band,
        power,
        relative_power,
        total_power,
        peak_frequency,
        frequencies,
        psd: band_psd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, fs: f64, n: usize) -> MultichannelSignal {
        let x: Vec<f64> = (0..n).map(|t| 50.0 * (2.0 * PI * freq * t as f64 / fs).sin()).collect();
        MultichannelSignal::from_samples(&x, fs).unwrap()
    }

    #[test]
    fn alpha_tone_dominates() {
        let a = analyze_rhythms(&tone(10.0, 250.0, 2500), 0).unwrap();
        assert_eq!(a.dominant_rhythm, Rhythm::Alpha);
        let alpha = &a.rhythms[&Rhythm::Alpha];
        assert_eq!(alpha.dominant_frequency, 10.0);
        // Mean |sin| = 2/π of the amplitude.
        approx::assert_abs_diff_eq!(alpha.mean_amplitude, 50.0 * 2.0 / PI, epsilon = 1.0);
        assert!(a.rhythms[&Rhythm::Delta].mean_amplitude < alpha.mean_amplitude / 10.0);
        assert_eq!(a.rhythms.len(), 5);
    }

    #[test]
    fn gamma_band_corrected_at_low_rate() {
        let a = analyze_rhythms(&tone(10.0, 128.0, 1280), 0).unwrap();
        assert!(a.warnings.iter().any(|w| w.starts_with("Gamma: ")), "{:?}", a.warnings);
        assert!(a.warnings.iter().all(|w| !w.starts_with("gamma")));
    }

    #[test]
    fn single_rhythm_integrates_band() {
        let r = analyze_single_rhythm(&tone(10.0, 256.0, 2560), 0, Rhythm::Alpha).unwrap();
        assert_eq!(r.peak_frequency, 10.0);
        assert!(r.relative_power > 0.95, "relative {}", r.relative_power);
        assert!(r.frequencies.iter().all(|&f| (8.0..=13.0).contains(&f)));
    }

    #[test]
    fn single_rhythm_zero_signal() {
        let sig = MultichannelSignal::from_samples(&[0.0; 300], 100.0).unwrap();
        let r = analyze_single_rhythm(&sig, 0, Rhythm::Theta).unwrap();
        assert_eq!(r.relative_power, 0.0);
        assert_eq!(r.total_power, 0.0);
    }
}
