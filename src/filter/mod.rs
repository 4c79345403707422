//! IIR filter design and zero-phase application.
//!
//! - [`design`]: Butterworth band-pass and IIR notch as second-order
//!   sections, matching `scipy.signal.butter(..., output='sos')` and
//!   `scipy.signal.iirnotch`.
//! - [`apply`]: forward-backward filtering with odd edge extension and
//!   steady-state initial conditions, matching `scipy.signal.sosfiltfilt`.

pub mod apply;
pub mod design;

pub use apply::{sosfiltfilt, sosfiltfilt_1d};
pub use design::{butter_bandpass, iir_notch, Biquad, SosFilter, BUTTERWORTH_ORDER, DEFAULT_NOTCH_Q};
