//! Seeded synthetic multichannel EEG for demos, tests and benches.
use std::f64::consts::PI;

use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::error::{check_sampling_rate, EegError, Result};
use crate::signal::MultichannelSignal;

/// `(low Hz, high Hz, amplitude)` per channel, cycled.
const CHANNEL_RHYTHMS: [(f64, f64, f64); 8] = [
    (2.0, 4.0, 50.0),
    (4.0, 8.0, 40.0),
    (8.0, 13.0, 60.0),
    (13.0, 30.0, 30.0),
    (30.0, 100.0, 20.0),
    (2.0, 30.0, 35.0),
    (8.0, 12.0, 55.0),
    (15.0, 25.0, 25.0),
];

const NOISE_STD: f64 = 5.0;
const ARTIFACT_SCALE: f64 = 80.0;

/// `duration` seconds of `n_channels` channels sampled at `sampling_rate`.
///
/// Channel `i` carries a sine at a random centre frequency drawn from the
/// `i mod 8`-th entry of the rhythm table, its 2nd and 3rd harmonics while
/// they stay inside that band (amplitude divided by the harmonic number),
/// N(0, 5²) noise and, on every third channel, 2 to 5 single-sample artifacts
/// of `80 · N(0, 1)`. Names are `EEG_000`, `EEG_001`, ….
pub fn generate_test_data(
    duration: f64,
    sampling_rate: f64,
    n_channels: usize,
    seed: u64,
) -> Result<MultichannelSignal> {
    let fs = check_sampling_rate(sampling_rate)?;
    if !(duration.is_finite() && duration > 0.0) || n_channels == 0 {
        return Err(EegError::InputShape(format!(
            "synthetic data needs a positive duration and at least one channel, got {duration} s × {n_channels}"
        )));
    }
    let n_samples = (duration * fs) as usize;
    if n_samples == 0 {
        return Err(EegError::InputShape(format!("{duration} s at {fs} Hz holds no samples")));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut data = Array2::<f64>::zeros((n_channels, n_samples));
    for (i, mut row) in data.rows_mut().into_iter().enumerate() {
        let (low, high, amplitude) = CHANNEL_RHYTHMS[i % CHANNEL_RHYTHMS.len()];
        let centre = rng.random_range(low..high);
        let harmonics: Vec<(f64, f64)> = (1..=3)
            .map(|h| h as f64)
            .filter(|&h| h == 1.0 || centre * h <= high)
            .map(|h| (centre * h, amplitude / h))
            .collect();

        for (t, v) in row.iter_mut().enumerate() {
            let time = t as f64 / fs;
            let tone: f64 = harmonics.iter().map(|&(f, a)| a * (2.0 * PI * f * time).sin()).sum();
            let noise: f64 = StandardNormal.sample(&mut rng);
            *v = tone + NOISE_STD * noise;
        }

        if i % 3 == 0 {
            let n_artifacts = rng.random_range(2..=5);
            for _ in 0..n_artifacts {
                let at = rng.random_range(0..n_samples);
                let z: f64 = StandardNormal.sample(&mut rng);
                row[at] += ARTIFACT_SCALE * z;
            }
        }
        debug!(channel = i, centre_hz = centre, "synthetic channel generated");
    }

    let names = (0..n_channels).map(|i| format!("EEG_{i:03}")).collect();
    MultichannelSignal::new(data, fs, names)
}
