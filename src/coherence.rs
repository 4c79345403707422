//! Magnitude-squared coherence between two channels.
//!
//! `C_xy(f) = |P_xy(f)|² / (P_xx(f) · P_yy(f))` from Welch auto and cross
//! spectra ([`crate::welch::cross_spectra`]). Bins where either auto spectrum
//! vanishes report 0; rounding above 1 is clipped.
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use crate::bands::Rhythm;
use crate::error::{EegError, Result};
use crate::signal::MultichannelSignal;
use crate::welch::cross_spectra;

/// Default Welch segment length.
pub const DEFAULT_NPERSEG: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoherenceResult {
    pub frequencies: Vec<f64>,
    /// In `[0, 1]`, same length as `frequencies`.
    pub coherence: Vec<f64>,
    /// Mean coherence over the bins of each band, 0 for a band without bins.
    pub rhythm_coherence: BTreeMap<Rhythm, f64>,
    /// Mean of `coherence`.
    pub mean_coherence: f64,
}

/// Coherence of raw sample slices.
pub fn coherence_1d(x: &[f64], y: &[f64], sampling_rate: f64, nperseg: usize) -> Result<CoherenceResult> {
    let cs = cross_spectra(x, y, sampling_rate, nperseg)?;
    let coherence: Vec<f64> = cs
        .pxy
        .iter()
        .zip(cs.pxx.iter().zip(&cs.pyy))
        .map(|(pxy, (&pxx, &pyy))| {
            let denom = pxx * pyy;
            if denom > f64::MIN_POSITIVE {
                (pxy.norm_sqr() / denom).clamp(0.0, 1.0)
            } else {
                0.0
            }
        })
        .collect();

    let rhythm_coherence = Rhythm::ALL
        .iter()
        .map(|&r| {
            let band = r.band();
            let (sum, n) = cs
                .frequencies
                .iter()
                .zip(&coherence)
                .filter(|(f, _)| band.contains(**f))
                .fold((0.0, 0usize), |(s, n), (_, &c)| (s + c, n + 1));
            (r, if n > 0 { sum / n as f64 } else { 0.0 })
        })
        .collect();
    let mean_coherence = if coherence.is_empty() {
        0.0
    } else {
        coherence.iter().sum::<f64>() / coherence.len() as f64
    };

    Ok(CoherenceResult { frequencies: cs.frequencies, coherence, rhythm_coherence, mean_coherence })
}

/// Coherence between channels `ch1` and `ch2` of a multichannel signal.
pub fn calculate_coherence(
    signal: &MultichannelSignal,
    ch1: usize,
    ch2: usize,
    nperseg: usize,
) -> Result<CoherenceResult> {
    if signal.n_channels() < 2 {
        return Err(EegError::InputShape(format!(
            "multichannel data required for coherence, got {} channel(s)",
            signal.n_channels()
        )));
    }
    let x = signal.channel(ch1)?.to_vec();
    let y = signal.channel(ch2)?.to_vec();
    let out = coherence_1d(&x, &y, signal.sampling_rate, nperseg)?;
    debug!(ch1, ch2, mean = out.mean_coherence, "coherence computed");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rand_distr::{Distribution, Normal};

    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let normal = Normal::new(0.0, 1.0).unwrap();
        (0..n).map(|_| normal.sample(&mut rng)).collect()
    }

    #[test]
    fn identical_channels_fully_coherent() {
        let x = noise(4096, 1);
        let r = coherence_1d(&x, &x, 256.0, 256).unwrap();
        for &c in &r.coherence[1..] {
            approx::assert_abs_diff_eq!(c, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn independent_noise_has_low_coherence() {
        let r = coherence_1d(&noise(8192, 1), &noise(8192, 2), 256.0, 256).unwrap();
        assert!(r.mean_coherence < 0.2, "mean {}", r.mean_coherence);
        assert!(r.coherence.iter().all(|&c| (0.0..=1.0).contains(&c)));
    }

    #[test]
    fn single_channel_rejected() {
        let sig = MultichannelSignal::from_samples(&[0.0; 64], 64.0).unwrap();
        assert!(matches!(calculate_coherence(&sig, 0, 0, 1024), Err(EegError::InputShape(_))));
    }

    #[test]
    fn band_without_bins_is_zero() {
        // fs = 20 Hz: nothing reaches the gamma band.
        let r = coherence_1d(&noise(512, 3), &noise(512, 4), 20.0, 64).unwrap();
        assert_eq!(r.rhythm_coherence[&Rhythm::Gamma], 0.0);
    }
}
