//! Frequency-parameter validation and auto-correction.
//!
//! Nothing here fails on bad frequencies: out-of-range values are repaired and
//! every repair is reported as a human-readable warning next to the corrected
//! value. Only a non-positive sampling rate is an error.
//!
//! Band-pass correction order:
//!
//! 1. `low <= 0` → 0.1 Hz, `high <= 0` → 40 Hz (non-finite counts as `<= 0`)
//! 2. `low >= high` → swap if the caller passed them reversed, else 1–40 Hz
//! 3. `high >= nyquist` → `0.95 · nyquist`
//! 4. `high - low < 0.5 Hz` → re-centre on a 0.5 Hz span inside the usable range
//! 5. normalised floor/ceiling: `low ≥ 0.001 · nyq`, `high ≤ 0.999 · nyq`
//! 6. if step 5 undid the separation, repeat step 4
//!
//! The usable range of step 4 is `[max(min(0.1, 0.05·nyq), 0.001·nyq), 0.95·nyq]`
//! and the span shrinks below 0.5 Hz only when Nyquist itself is ~1 Hz.
//! With these bounds the output always satisfies `0 < low < high < nyquist`
//! and feeding it back in returns it unchanged with no warnings.
use std::collections::BTreeMap;

use serde::Serialize;
use tracing::warn;

use crate::error::{check_sampling_rate, Result};

const DEFAULT_LOW_HZ: f64 = 0.1;
const DEFAULT_HIGH_HZ: f64 = 40.0;
const FALLBACK_LOW_HZ: f64 = 1.0;
const FALLBACK_HIGH_HZ: f64 = 40.0;
const DEFAULT_NOTCH_HZ: f64 = 50.0;
const MIN_SEPARATION_HZ: f64 = 0.5;
const NYQUIST_MARGIN: f64 = 0.95;
const NOTCH_NYQUIST_MARGIN: f64 = 0.8;
const NORM_FLOOR: f64 = 0.001;
const NORM_CEIL: f64 = 0.999;
/// Relative slack for the separation test so a re-centred band is a fixed point.
const SEPARATION_EPS: f64 = 1e-9;

/// Band-pass edges after correction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandpassParams {
    pub low: f64,
    pub high: f64,
    pub warnings: Vec<String>,
}

/// Notch centre after correction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotchParams {
    pub freq: f64,
    pub warnings: Vec<String>,
}

/// Conservative starting parameters for a given sampling rate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SafeFilterParams {
    pub low_freq: f64,
    pub high_freq: f64,
    pub notch_freq: f64,
}

/// Outcome of [`check_sampling_rate_adequacy`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateAdequacy {
    pub adequate: bool,
    /// `max_freq · min_ratio` when inadequate, the given rate otherwise.
    pub required_rate: f64,
    pub warning: Option<String>,
}

/// Correct a band-pass `(low, high)` pair for `sampling_rate`.
pub fn validate_bandpass_params(
    low_freq: f64,
    high_freq: f64,
    sampling_rate: f64,
) -> Result<BandpassParams> {
    let nyquist = check_sampling_rate(sampling_rate)? / 2.0;
    let (floor, ceil, min_sep) = usable_range(nyquist);

    let mut warnings = Vec::new();
    let (orig_low, orig_high) = (low_freq, high_freq);
    let (mut low, mut high) = (low_freq, high_freq);

    if !(low.is_finite() && low > 0.0) {
        low = DEFAULT_LOW_HZ;
        warnings.push(format!("low frequency {orig_low} Hz is not positive, set to {low} Hz"));
    }
    if !(high.is_finite() && high > 0.0) {
        high = DEFAULT_HIGH_HZ;
        warnings.push(format!("high frequency {orig_high} Hz is not positive, set to {high} Hz"));
    }

    if low >= high {
        if orig_low > orig_high {
            std::mem::swap(&mut low, &mut high);
            warnings.push(format!("frequencies swapped: {orig_low} <-> {orig_high}"));
        } else {
            low = FALLBACK_LOW_HZ;
            high = FALLBACK_HIGH_HZ;
            warnings.push(format!("invalid range, defaulted to {low}-{high} Hz"));
        }
    }

    if high >= nyquist {
        high = ceil;
        warnings.push(format!("high frequency exceeded Nyquist ({nyquist} Hz), set to {high:.2} Hz"));
    }

    if too_narrow(low, high, min_sep) {
        (low, high) = widen(low, high, floor, ceil, min_sep);
        warnings.push(format!("range too narrow, widened to {low:.2}-{high:.2} Hz"));
    }

    if low < nyquist * NORM_FLOOR {
        low = nyquist * NORM_FLOOR;
        warnings.push(format!("normalised low frequency too small, set to {low:.3} Hz"));
    }
    if high > nyquist * NORM_CEIL {
        high = nyquist * NORM_CEIL;
        warnings.push(format!("normalised high frequency too large, set to {high:.3} Hz"));
    }

    if too_narrow(low, high, min_sep) {
        (low, high) = widen(low, high, floor, ceil, min_sep);
        warnings.push(format!("range collapsed after normalisation, widened to {low:.2}-{high:.2} Hz"));
    }

    Ok(BandpassParams { low, high, warnings })
}

/// Correct a single notch frequency for `sampling_rate`. Invalid input
/// defaults to 50 Hz before the Nyquist checks.
pub fn validate_notch_params(notch_freq: f64, sampling_rate: f64) -> Result<NotchParams> {
    let nyquist = check_sampling_rate(sampling_rate)? / 2.0;
    let mut warnings = Vec::new();
    let mut freq = notch_freq;

    if !(freq.is_finite() && freq > 0.0) {
        freq = DEFAULT_NOTCH_HZ;
        warnings.push(format!("notch frequency {notch_freq} Hz is not positive, set to {freq} Hz"));
    }
    if freq >= nyquist {
        freq = nyquist * NOTCH_NYQUIST_MARGIN;
        warnings.push(format!("notch frequency exceeded Nyquist ({nyquist} Hz), set to {freq:.2} Hz"));
    }
    if freq < nyquist * NORM_FLOOR {
        freq = nyquist * NORM_FLOOR;
        warnings.push(format!("normalised notch frequency too small, set to {freq:.3} Hz"));
    }
    if freq > nyquist * NORM_CEIL {
        freq = nyquist * NORM_CEIL;
        warnings.push(format!("normalised notch frequency too large, set to {freq:.3} Hz"));
    }

    Ok(NotchParams { freq, warnings })
}

/// Apply [`validate_bandpass_params`] to every entry of a band table.
/// Warnings are prefixed with the capitalised band name.
pub fn validate_rhythm_bands<K>(
    bands: &BTreeMap<K, (f64, f64)>,
    sampling_rate: f64,
) -> Result<(BTreeMap<K, (f64, f64)>, Vec<String>)>
where
    K: Ord + Clone + std::fmt::Display,
{
    let mut corrected = BTreeMap::new();
    let mut warnings = Vec::new();
    for (name, &(low, high)) in bands {
        let p = validate_bandpass_params(low, high, sampling_rate)?;
        let label = capitalize(&name.to_string());
        warnings.extend(p.warnings.iter().map(|w| format!("{label}: {w}")));
        corrected.insert(name.clone(), (p.low, p.high));
    }
    Ok((corrected, warnings))
}

/// Safe defaults scaled to the sampling rate.
pub fn safe_filter_params(sampling_rate: f64) -> Result<SafeFilterParams> {
    let nyquist = check_sampling_rate(sampling_rate)? / 2.0;
    let mut low_freq = (nyquist * 0.002).max(0.5);
    let mut high_freq = (nyquist * 0.8).min(40.0);
    let notch_freq = (nyquist * 0.4).min(50.0);

    if high_freq - low_freq < 1.0 {
        let center = (low_freq + high_freq) / 2.0;
        low_freq = (center - 0.5).max(0.1);
        high_freq = (center + 0.5).min(nyquist * NYQUIST_MARGIN);
    }
    Ok(SafeFilterParams { low_freq, high_freq, notch_freq })
}

/// Is `sampling_rate` at least `min_ratio · max_freq`?
pub fn check_sampling_rate_adequacy(max_freq: f64, sampling_rate: f64, min_ratio: f64) -> RateAdequacy {
    let required = max_freq * min_ratio;
    if sampling_rate >= required {
        RateAdequacy { adequate: true, required_rate: sampling_rate, warning: None }
    } else {
        RateAdequacy {
            adequate: false,
            required_rate: required,
            warning: Some(format!(
                "sampling rate {sampling_rate} Hz is too low to analyse frequencies up to \
                 {max_freq} Hz; at least {required:.0} Hz recommended"
            )),
        }
    }
}

/// Emit each correction as a `warn!` event tagged with `stage`.
pub(crate) fn log_warnings(stage: &str, warnings: &[String]) {
    for w in warnings {
        warn!(stage, "{w}");
    }
}

/// `(floor, ceil, min_separation)` for the re-centring step.
fn usable_range(nyquist: f64) -> (f64, f64, f64) {
    let floor = DEFAULT_LOW_HZ.min(nyquist * 0.05).max(nyquist * NORM_FLOOR);
    let ceil = nyquist * NYQUIST_MARGIN;
    let min_sep = MIN_SEPARATION_HZ.min((ceil - floor) * 0.5);
    (floor, ceil, min_sep)
}

fn too_narrow(low: f64, high: f64, min_sep: f64) -> bool {
    high - low < min_sep - SEPARATION_EPS * high.abs().max(1.0)
}

/// Re-centre on a `min_sep` span with both edges exactly inside `[floor, ceil]`.
fn widen(low: f64, high: f64, floor: f64, ceil: f64, min_sep: f64) -> (f64, f64) {
    let half = min_sep / 2.0;
    let center = ((low + high) / 2.0).clamp(floor + half, ceil - half);
    let low = (center - half).max(floor);
    (low, (low + min_sep).min(ceil))
}

/// Upper-case the first character, as used for warning labels.
pub(crate) fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
