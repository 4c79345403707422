//! Welch power and cross spectral densities.
//!
//! Matches `scipy.signal.welch` / `scipy.signal.csd` defaults: periodic Hann
//! window, `noverlap = nperseg / 2`, constant detrend per segment, one-sided
//! density scaling `1 / (fs · Σw²)` with the non-DC, non-Nyquist bins doubled,
//! mean over segments. `nperseg` larger than the signal is cut to its length.
use std::f64::consts::PI;

use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

use crate::error::{check_sampling_rate, EegError, Result};

/// One-sided power spectral density.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Psd {
    /// `k · fs / nperseg`, `k = 0 ..= nperseg/2`.
    pub frequencies: Vec<f64>,
    pub density: Vec<f64>,
}

/// Auto and cross densities of two equally long signals.
#[derive(Debug, Clone, PartialEq)]
pub struct CrossSpectra {
    pub frequencies: Vec<f64>,
    pub pxx: Vec<f64>,
    pub pyy: Vec<f64>,
    /// `conj(X) · Y`.
    pub pxy: Vec<Complex<f64>>,
}

/// Periodic Hann window (`sym=False`); a single tap is `[1]`.
pub fn hann_periodic(m: usize) -> Vec<f64> {
    if m == 1 {
        return vec![1.0];
    }
    (0..m)
        .map(|n| 0.5 - 0.5 * (2.0 * PI * n as f64 / m as f64).cos())
        .collect()
}

/// Segment layout shared by PSD and CSD.
struct Segmenter {
    nperseg: usize,
    step: usize,
    n_segments: usize,
    window: Vec<f64>,
    scale: f64,
}

impl Segmenter {
    fn new(n: usize, nperseg: usize, fs: f64) -> Result<Self> {
        if n == 0 {
            return Err(EegError::InputShape("Welch estimate needs a non-empty signal".into()));
        }
        let nperseg = nperseg.clamp(1, n);
        let noverlap = nperseg / 2;
        let step = nperseg - noverlap;
        let n_segments = (n - nperseg) / step + 1;
        let window = hann_periodic(nperseg);
        let scale = 1.0 / (fs * window.iter().map(|w| w * w).sum::<f64>());
        Ok(Self { nperseg, step, n_segments, window, scale })
    }

    fn n_freqs(&self) -> usize {
        self.nperseg / 2 + 1
    }

    fn frequencies(&self, fs: f64) -> Vec<f64> {
        (0..self.n_freqs()).map(|k| k as f64 * fs / self.nperseg as f64).collect()
    }

    /// One-sided density factor for bin `k`.
    fn one_sided(&self, k: usize) -> f64 {
        let nyquist_bin = self.nperseg % 2 == 0 && k == self.nperseg / 2;
        if k == 0 || nyquist_bin {
            self.scale
        } else {
            2.0 * self.scale
        }
    }

    /// Detrended, windowed spectrum of every segment of `x`.
    fn spectra<'a>(
        &'a self,
        x: &'a [f64],
        planner: &'a mut FftPlanner<f64>,
    ) -> impl Iterator<Item = Vec<Complex<f64>>> + 'a {
        let fft = planner.plan_fft_forward(self.nperseg);
        (0..self.n_segments).map(move |s| {
            let seg = &x[s * self.step..s * self.step + self.nperseg];
            let mean = seg.iter().sum::<f64>() / self.nperseg as f64;
            let mut buf: Vec<Complex<f64>> = seg
                .iter()
                .zip(&self.window)
                .map(|(&v, &w)| Complex::new((v - mean) * w, 0.0))
                .collect();
            fft.process(&mut buf);
            buf.truncate(self.n_freqs());
            buf
        })
    }
}

/// Welch PSD of `x`.
pub fn welch(x: &[f64], sampling_rate: f64, nperseg: usize) -> Result<Psd> {
    let fs = check_sampling_rate(sampling_rate)?;
    let seg = Segmenter::new(x.len(), nperseg, fs)?;
    let mut acc = vec![0.0; seg.n_freqs()];
    let mut planner = FftPlanner::new();
    for spec in seg.spectra(x, &mut planner) {
        for (a, c) in acc.iter_mut().zip(&spec) {
            *a += c.norm_sqr();
        }
    }
    let inv_segs = 1.0 / seg.n_segments as f64;
    let density = acc
        .iter()
        .enumerate()
        .map(|(k, &p)| p * seg.one_sided(k) * inv_segs)
        .collect();
    Ok(Psd { frequencies: seg.frequencies(fs), density })
}

/// Welch auto and cross spectra of `x` and `y`.
pub fn cross_spectra(x: &[f64], y: &[f64], sampling_rate: f64, nperseg: usize) -> Result<CrossSpectra> {
    let fs = check_sampling_rate(sampling_rate)?;
    if x.len() != y.len() {
        return Err(EegError::InputShape(format!(
            "cross spectrum needs equal lengths, got {} and {}",
            x.len(),
            y.len()
        )));
    }
    let seg = Segmenter::new(x.len(), nperseg, fs)?;
    let nf = seg.n_freqs();
    let mut pxx = vec![0.0; nf];
    let mut pyy = vec![0.0; nf];
    let mut pxy = vec![Complex::new(0.0, 0.0); nf];

    let mut px = FftPlanner::new();
    let mut py = FftPlanner::new();
    for (sx, sy) in seg.spectra(x, &mut px).zip(seg.spectra(y, &mut py)) {
        for k in 0..nf {
            pxx[k] += sx[k].norm_sqr();
            pyy[k] += sy[k].norm_sqr();
            pxy[k] += sx[k].conj() * sy[k];
        }
    }
    let inv_segs = 1.0 / seg.n_segments as f64;
    for k in 0..nf {
        let s = seg.one_sided(k) * inv_segs;
        pxx[k] *= s;
        pyy[k] *= s;
        pxy[k] *= s;
    }
    Ok(CrossSpectra { frequencies: seg.frequencies(fs), pxx, pyy, pxy })
}

/// Trapezoidal integral of `y` over `x`.
pub fn trapezoid(y: &[f64], x: &[f64]) -> f64 {
    y.windows(2)
        .zip(x.windows(2))
        .map(|(yy, xx)| (xx[1] - xx[0]) * (yy[0] + yy[1]) / 2.0)
        .sum()
}
