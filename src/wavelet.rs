//! Daubechies-4 discrete wavelet transform and universal-threshold denoising.
//!
//! The transform is periodised: at every level the signal is treated as
//! circular, so a length-`N` input (`N` even) yields `N/2` approximation and
//! `N/2` detail coefficients and the inverse is exact. Inputs whose length is
//! not a multiple of `2^level` are extended by repeating the last sample and
//! truncated again after reconstruction.
//!
//! Denoising (Donoho–Johnstone):
//!   σ = median(|cD₁|) / 0.6745
//!   λ = σ · √(2 ln N)
//!   every detail coefficient c ↦ sign(c) · max(|c| − λ, 0)
use ndarray::Array2;

/// db4 reconstruction low-pass filter (8 taps, orthonormal).
const DB4_LO: [f64; 8] = [
    0.230_377_813_308_896_4,
    0.714_846_570_552_915_4,
    0.630_880_767_929_858_7,
    -0.027_983_769_416_859_85,
    -0.187_034_811_719_093_09,
    0.030_841_381_835_560_764,
    0.032_883_011_666_885_2,
    -0.010_597_401_785_069_032,
];

/// Median absolute deviation → Gaussian σ.
const MAD_SCALE: f64 = 0.6745;

/// Quadrature-mirror high-pass: `g[n] = (−1)ⁿ · h[L−1−n]`.
fn db4_hi() -> [f64; 8] {
    let mut g = [0.0; 8];
    for (n, gn) in g.iter_mut().enumerate() {
        let sign = if n % 2 == 0 { 1.0 } else { -1.0 };
        *gn = sign * DB4_LO[DB4_LO.len() - 1 - n];
    }
    g
}

/// Coefficients of a multilevel decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveletCoeffs {
    /// Coarsest approximation.
    pub approx: Vec<f64>,
    /// Details, finest (level 1) first.
    pub details: Vec<Vec<f64>>,
    /// Input length before padding.
    pub original_len: usize,
}

/// One analysis step. `x.len()` must be even.
fn dwt_step(x: &[f64]) -> (Vec<f64>, Vec<f64>) {
    let n = x.len();
    let g = db4_hi();
    let half = n / 2;
    let mut a = vec![0.0; half];
    let mut d = vec![0.0; half];
    for k in 0..half {
        for (i, (&h, &gi)) in DB4_LO.iter().zip(g.iter()).enumerate() {
            let v = x[(2 * k + i) % n];
            a[k] += h * v;
            d[k] += gi * v;
        }
    }
    (a, d)
}

/// One synthesis step, inverse of [`dwt_step`].
fn idwt_step(a: &[f64], d: &[f64]) -> Vec<f64> {
    let n = 2 * a.len();
    let g = db4_hi();
    let mut x = vec![0.0; n];
    for k in 0..a.len() {
        for (i, (&h, &gi)) in DB4_LO.iter().zip(g.iter()).enumerate() {
            x[(2 * k + i) % n] += h * a[k] + gi * d[k];
        }
    }
    x
}

/// Largest usable level for `n` samples: the coarsest approximation keeps at
/// least one coefficient.
pub fn max_level(n: usize) -> usize {
    if n < 2 {
        0
    } else {
        (usize::BITS - 1 - n.leading_zeros()) as usize
    }
}

/// Multilevel decomposition. `level` is capped at [`max_level`].
pub fn wavedec(x: &[f64], level: usize) -> WaveletCoeffs {
    let level = level.min(max_level(x.len()));
    let block = 1usize << level;
    let mut padded = x.to_vec();
    if let Some(&last) = x.last() {
        let target = x.len().div_ceil(block) * block;
        padded.resize(target, last);
    }

    let mut approx = padded;
    let mut details = Vec::with_capacity(level);
    for _ in 0..level {
        let (a, d) = dwt_step(&approx);
        details.push(d);
        approx = a;
    }
    WaveletCoeffs { approx, details, original_len: x.len() }
}

/// Reconstruct a signal of the original length.
pub fn waverec(coeffs: &WaveletCoeffs) -> Vec<f64> {
    let mut x = coeffs.approx.clone();
    for d in coeffs.details.iter().rev() {
        x = idwt_step(&x, d);
    }
    x.truncate(coeffs.original_len);
    x
}

/// Soft thresholding.
pub fn soft_threshold(c: f64, lambda: f64) -> f64 {
    c.signum() * (c.abs() - lambda).max(0.0)
}

/// Universal threshold from the finest detail band.
pub fn universal_threshold(finest_detail: &[f64], n: usize) -> f64 {
    if finest_detail.is_empty() || n < 2 {
        return 0.0;
    }
    let mut mags: Vec<f64> = finest_detail.iter().map(|c| c.abs()).collect();
    let sigma = median(&mut mags) / MAD_SCALE;
    sigma * (2.0 * (n as f64).ln()).sqrt()
}

/// Denoise one channel.
pub fn denoise_1d(x: &[f64], level: usize) -> Vec<f64> {
    let mut coeffs = wavedec(x, level);
    let Some(finest) = coeffs.details.first() else {
        return x.to_vec();
    };
    let lambda = universal_threshold(finest, x.len());
    for band in &mut coeffs.details {
        band.iter_mut().for_each(|c| *c = soft_threshold(*c, lambda));
    }
    waverec(&coeffs)
}

/// Denoise every row of `[C, T]` data.
pub fn denoise(data: &Array2<f64>, level: usize) -> Array2<f64> {
    let mut out = data.clone();
    for mut row in out.rows_mut() {
        let cleaned = denoise_1d(&row.to_vec(), level);
        row.iter_mut().zip(cleaned).for_each(|(dst, v)| *dst = v);
    }
    out
}

fn median(v: &mut [f64]) -> f64 {
    v.sort_by(f64::total_cmp);
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        (v[n / 2 - 1] + v[n / 2]) / 2.0
    }
}
