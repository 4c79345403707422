/// Shared helpers for seeded test signals.
use eegscope::MultichannelSignal;
use ndarray::Array2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use std::f64::consts::PI;
use std::path::PathBuf;

#[allow(unused)]
/// `amp · sin(2π f t)` sampled at `fs`.
pub fn sine(freq: f64, amp: f64, fs: f64, n: usize) -> Vec<f64> {
    (0..n).map(|t| amp * (2.0 * PI * freq * t as f64 / fs).sin()).collect()
}

#[allow(unused)]
/// N(0, std²) samples from a fixed seed.
pub fn gaussian(n: usize, std: f64, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let normal = Normal::new(0.0, std).unwrap();
    (0..n).map(|_| normal.sample(&mut rng)).collect()
}

#[allow(unused)]
/// Single-channel tone plus Gaussian noise.
pub fn noisy_tone(freq: f64, amp: f64, noise_std: f64, fs: f64, seconds: f64, seed: u64) -> MultichannelSignal {
    let n = (fs * seconds) as usize;
    let x: Vec<f64> = sine(freq, amp, fs, n)
        .into_iter()
        .zip(gaussian(n, noise_std, seed))
        .map(|(s, e)| s + e)
        .collect();
    MultichannelSignal::from_samples(&x, fs).unwrap()
}

#[allow(unused)]
/// `[C, T]` array with one row per slice.
pub fn rows(channels: &[Vec<f64>]) -> Array2<f64> {
    let n = channels[0].len();
    Array2::from_shape_fn((channels.len(), n), |(c, t)| channels[c][t])
}

#[allow(unused)]
pub fn rms(x: impl IntoIterator<Item = f64>) -> f64 {
    let (mut s, mut n) = (0.0, 0usize);
    for v in x {
        s += v * v;
        n += 1;
    }
    (s / n.max(1) as f64).sqrt()
}

#[allow(unused)]
/// Maximum absolute element-wise difference.
pub fn max_abs_diff(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    assert_eq!(a.shape(), b.shape(), "shape mismatch");
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).fold(0.0_f64, f64::max)
}

#[allow(unused)]
/// Unique scratch path under the system temp directory.
pub fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("eegscope-{}-{name}", std::process::id()))
}
