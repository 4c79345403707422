//! IIR filter design in second-order sections.
//!
//! Band-pass: `scipy.signal.butter(N, [lo, hi], btype='band')` built in
//! zero/pole/gain form and split into biquads:
//!   • analog Butterworth prototype poles on the unit circle
//!   • pre-warp `w = 4·tan(π·Wn/2)` (bilinear with `fs = 2`)
//!   • low-pass → band-pass: `p ± √(p² − ω₀²)` around `ω₀ = √(w₁w₂)`
//!   • bilinear map `z = (4 + s)/(4 − s)`, `N` zeros at `+1` and `N` at `−1`
//!
//! Notch: `scipy.signal.iirnotch(w0, Q)`, a single biquad.
//!
//! Frequencies handed to the designers are fractions of Nyquist and must lie
//! strictly inside `(0, 1)`; [`crate::validate`] guarantees that for the
//! pipeline.
use std::f64::consts::PI;

use rustfft::num_complex::Complex;

use crate::error::{EegError, Result};

/// Order used for every band-pass in the crate.
pub const BUTTERWORTH_ORDER: usize = 4;

/// Notch quality factor used when none is configured.
pub const DEFAULT_NOTCH_Q: f64 = 30.0;

/// One biquad, `a0` normalised to 1:
/// `H(z) = (b0 + b1 z⁻¹ + b2 z⁻²) / (1 + a1 z⁻¹ + a2 z⁻²)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    /// `[1, a1, a2]`.
    pub a: [f64; 3],
}

impl Biquad {
    /// Gain at DC, `Σb / Σa`.
    pub fn dc_gain(&self) -> f64 {
        self.b.iter().sum::<f64>() / self.a.iter().sum::<f64>()
    }

    /// Steady-state delay-line contents for a constant input `x0`
    /// (scipy `lfilter_zi` scaled by `x0`).
    pub fn steady_state(&self, x0: f64) -> [f64; 2] {
        let y = self.dc_gain() * x0;
        let z2 = self.b[2] * x0 - self.a[2] * y;
        let z1 = self.b[1] * x0 - self.a[1] * y + z2;
        [z1, z2]
    }

    /// `|H(e^{jω})|` at normalised angular frequency `omega` (rad/sample).
    pub fn magnitude(&self, omega: f64) -> f64 {
        let z1 = Complex::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b[0] + z1 * self.b[1] + z2 * self.b[2];
        let den = self.a[0] + z1 * self.a[1] + z2 * self.a[2];
        (num / den).norm()
    }
}

/// A cascade of biquads.
#[derive(Debug, Clone, PartialEq)]
pub struct SosFilter {
    pub sections: Vec<Biquad>,
}

impl SosFilter {
    /// Edge extension used by zero-phase filtering, scipy's `sosfiltfilt`
    /// default: `3 · (2·n_sections + 1 − trailing zero taps)`.
    pub fn padlen(&self) -> usize {
        let zero_b2 = self.sections.iter().filter(|s| s.b[2] == 0.0).count();
        let zero_a2 = self.sections.iter().filter(|s| s.a[2] == 0.0).count();
        3 * (2 * self.sections.len() + 1 - zero_b2.min(zero_a2))
    }

    /// Cascade magnitude response at `freq_hz`.
    pub fn magnitude_at(&self, freq_hz: f64, sampling_rate: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sampling_rate;
        self.sections.iter().map(|s| s.magnitude(omega)).product()
    }
}

/// Butterworth band-pass of `order` between normalised edges `low < high`
/// (fractions of Nyquist).
pub fn butter_bandpass(order: usize, low: f64, high: f64) -> Result<SosFilter> {
    let fail = |reason: &str| EegError::FilterConstruction { low, high, reason: reason.to_string() };
    if order == 0 {
        return Err(fail("order must be at least 1"));
    }
    if !(low.is_finite() && high.is_finite() && 0.0 < low && low < high && high < 1.0) {
        return Err(fail("edges must satisfy 0 < low < high < 1"));
    }

    let w1 = 4.0 * (PI * low / 2.0).tan();
    let w2 = 4.0 * (PI * high / 2.0).tan();
    let bw = w2 - w1;
    let wo2 = w1 * w2;

    let mut poles = Vec::with_capacity(2 * order);
    for k in 0..order {
        let theta = PI * (2 * k + order + 1) as f64 / (2 * order) as f64;
        let p_lp = Complex::from_polar(1.0, theta) * (bw / 2.0);
        let root = (p_lp * p_lp - wo2).sqrt();
        poles.push(p_lp + root);
        poles.push(p_lp - root);
    }

    // Bilinear: analog zeros at the origin map to +1, the excess to −1.
    let four = Complex::new(4.0, 0.0);
    let digital: Vec<Complex<f64>> = poles.iter().map(|&p| (four + p) / (four - p)).collect();
    let denom: Complex<f64> = poles.iter().map(|&p| four - p).product();
    let gain = bw.powi(order as i32) * (Complex::new(4.0_f64.powi(order as i32), 0.0) / denom).re;

    let pairs = pair_poles(&digital).ok_or_else(|| fail("unpaired pole"))?;
    let mut sections: Vec<Biquad> = pairs
        .into_iter()
        .map(|a| Biquad { b: [1.0, 0.0, -1.0], a })
        .collect();
    if let Some(first) = sections.first_mut() {
        first.b.iter_mut().for_each(|v| *v *= gain);
    }

    let finite = sections
        .iter()
        .all(|s| s.a.iter().chain(s.b.iter()).all(|v| v.is_finite()));
    if !finite || sections.len() != order {
        return Err(fail("non-finite coefficients"));
    }
    Ok(SosFilter { sections })
}

/// Second-order IIR notch at normalised frequency `w0` (fraction of Nyquist).
pub fn iir_notch(w0: f64, quality: f64) -> Result<SosFilter> {
    if !(w0.is_finite() && 0.0 < w0 && w0 < 1.0) {
        return Err(EegError::FilterConstruction {
            low: w0,
            high: w0,
            reason: "notch frequency must satisfy 0 < w0 < 1".to_string(),
        });
    }
    if !(quality.is_finite() && quality > 0.0) {
        return Err(EegError::FilterConstruction {
            low: w0,
            high: w0,
            reason: format!("quality factor must be positive, got {quality}"),
        });
    }
    let bw = w0 / quality * PI;
    let w0 = w0 * PI;
    let beta = (bw / 2.0).tan();
    let gain = 1.0 / (1.0 + beta);
    let c = w0.cos();
    Ok(SosFilter {
        sections: vec![Biquad {
            b: [gain, -2.0 * gain * c, gain],
            a: [1.0, -2.0 * gain * c, 2.0 * gain - 1.0],
        }],
    })
}

/// Group digital poles into `[1, a1, a2]` denominators: each upper-half-plane
/// pole with its conjugate, leftover real poles two at a time.
fn pair_poles(poles: &[Complex<f64>]) -> Option<Vec<[f64; 3]>> {
    const TOL: f64 = 1e-12;
    let mut out = Vec::new();
    let mut reals = Vec::new();
    let mut upper = 0usize;
    let mut lower = 0usize;
    for p in poles {
        if p.im > TOL {
            upper += 1;
            out.push([1.0, -2.0 * p.re, p.norm_sqr()]);
        } else if p.im < -TOL {
            lower += 1;
        } else {
            reals.push(p.re);
        }
    }
    if upper != lower || reals.len() % 2 != 0 {
        return None;
    }
    for r in reals.chunks(2) {
        out.push([1.0, -(r[0] + r[1]), r[0] * r[1]]);
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bandpass_has_order_sections_and_padlen() {
        let f = butter_bandpass(4, 1.0 / 125.0, 40.0 / 125.0).unwrap();
        assert_eq!(f.sections.len(), 4);
        assert_eq!(f.padlen(), 27);
    }

    #[test]
    fn bandpass_unity_gain_at_centre() {
        // Butterworth band-pass peaks at 1 at the geometric centre of the
        // pre-warped edges; check passband vs stopband at 250 Hz.
        let fs = 250.0;
        let f = butter_bandpass(4, 8.0 / 125.0, 13.0 / 125.0).unwrap();
        let pass = f.magnitude_at(10.2, fs);
        assert!((pass - 1.0).abs() < 0.02, "passband {pass}");
        assert!(f.magnitude_at(1.0, fs) < 1e-3);
        assert!(f.magnitude_at(50.0, fs) < 1e-3);
        assert!(f.magnitude_at(0.0, fs) < 1e-9);
    }

    #[test]
    fn bandpass_edges_are_minus_3db() {
        let fs = 250.0;
        let f = butter_bandpass(4, 1.0 / 125.0, 40.0 / 125.0).unwrap();
        let half_power = std::f64::consts::FRAC_1_SQRT_2;
        approx::assert_abs_diff_eq!(f.magnitude_at(1.0, fs), half_power, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(f.magnitude_at(40.0, fs), half_power, epsilon = 1e-6);
    }

    #[test]
    fn bandpass_poles_inside_unit_circle() {
        let f = butter_bandpass(4, 0.001, 0.999).unwrap();
        for s in &f.sections {
            assert!(s.a[2] < 1.0 && s.a[2] > 0.0, "a2 = {}", s.a[2]);
        }
    }

    #[test]
    fn bandpass_rejects_bad_edges() {
        assert!(matches!(
            butter_bandpass(4, 0.5, 0.2),
            Err(EegError::FilterConstruction { .. })
        ));
        assert!(butter_bandpass(4, 0.0, 0.2).is_err());
        assert!(butter_bandpass(4, 0.1, 1.0).is_err());
    }

    #[test]
    fn notch_coefficients() {
        let f = iir_notch(50.0 / 125.0, 30.0).unwrap();
        assert_eq!(f.padlen(), 9);
        let s = f.sections[0];
        approx::assert_abs_diff_eq!(s.b[0], s.b[2], epsilon = 1e-15);
        assert!(f.magnitude_at(50.0, 250.0) < 1e-9);
        approx::assert_abs_diff_eq!(f.magnitude_at(10.0, 250.0), 1.0, epsilon = 1e-2);
        approx::assert_abs_diff_eq!(s.dc_gain(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn steady_state_holds_constant_input() {
        let s = iir_notch(0.4, 30.0).unwrap().sections[0];
        let [mut z1, mut z2] = s.steady_state(2.0);
        for _ in 0..5 {
            let y = s.b[0] * 2.0 + z1;
            z1 = s.b[1] * 2.0 - s.a[1] * y + z2;
            z2 = s.b[2] * 2.0 - s.a[2] * y;
            approx::assert_abs_diff_eq!(y, 2.0, epsilon = 1e-12);
        }
    }
}
