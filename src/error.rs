//! Error type shared by every analysis stage.
//!
//! Parameter corrections made by [`crate::validate`] are *not* errors; they
//! come back as warning strings next to the corrected values. Everything in
//! this enum aborts the call that produced it.
use thiserror::Error;

/// Errors produced by the filtering, spectral and analysis stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EegError {
    /// Sampling rate was zero, negative or not finite.
    #[error("invalid sampling rate: {rate} Hz (must be finite and > 0)")]
    InvalidSamplingRate {
        /// Offending rate in Hz.
        rate: f64,
    },

    /// Coefficient synthesis failed for the given normalised band edges.
    #[error("filter construction failed: {reason} (normalised low={low:.4}, high={high:.4})")]
    FilterConstruction {
        /// Normalised low edge (fraction of Nyquist).
        low: f64,
        /// Normalised high edge (fraction of Nyquist).
        high: f64,
        /// What went wrong.
        reason: String,
    },

    /// Applying an already-designed filter to one channel failed.
    #[error("filter application failed on channel {channel}: {reason}")]
    FilterApplication {
        /// Zero-based channel index.
        channel: usize,
        /// What went wrong.
        reason: String,
    },

    /// Input does not have the shape or ordering an operation needs.
    #[error("invalid input shape: {0}")]
    InputShape(String),

    /// Requested channel does not exist.
    #[error("channel index {index} out of range ({count} channels)")]
    ChannelOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of channels available.
        count: usize,
    },

    /// Band name not in the canonical table.
    #[error("unknown rhythm: {0:?}")]
    UnknownRhythm(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, EegError>;

/// Reject rates that would make the Nyquist frequency meaningless.
pub(crate) fn check_sampling_rate(rate: f64) -> Result<f64> {
    if rate.is_finite() && rate > 0.0 {
        Ok(rate)
    } else {
        Err(EegError::InvalidSamplingRate { rate })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_rate_guard() {
        assert_eq!(check_sampling_rate(250.0), Ok(250.0));
        assert!(check_sampling_rate(0.0).is_err());
        assert!(check_sampling_rate(-1.0).is_err());
        assert!(check_sampling_rate(f64::NAN).is_err());
        assert!(check_sampling_rate(f64::INFINITY).is_err());
    }

    #[test]
    fn messages_carry_context() {
        let e = EegError::FilterApplication { channel: 3, reason: "too short".into() };
        assert!(e.to_string().contains("channel 3"));
        let e = EegError::FilterConstruction { low: 0.008, high: 0.32, reason: "x".into() };
        assert!(e.to_string().contains("low=0.0080"));
    }
}
