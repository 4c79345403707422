//! Pipeline and analysis configuration.
//!
//! [`PreprocessConfig`] holds every tunable parameter of the cleaning
//! pipeline, [`AnalysisConfig`] the parameters of the spectral / spike /
//! coherence pass. Both have defaults suited to scalp EEG at 100–1000 Hz and
//! (de)serialise with `serde`, so the binaries can read them from JSON.
use serde::{Deserialize, Serialize};

use crate::filter::DEFAULT_NOTCH_Q;

/// Configuration for [`crate::preprocess::run_pipeline`].
///
/// All fields are `pub` so you can construct one with struct-update syntax:
///
/// ```
/// use eegscope::PreprocessConfig;
///
/// let cfg = PreprocessConfig {
///     notch_freq: 60.0,        // North American mains
///     remove_artifacts: true,
///     ..PreprocessConfig::default()
/// };
/// assert_eq!(cfg.low_freq, 1.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessConfig {
    /// Lower band-pass edge in Hz.
    ///
    /// Corrected by [`crate::validate::validate_bandpass_params`] before the
    /// filter is designed; corrections are logged and returned in the
    /// pipeline report.
    ///
    /// Default: `1.0` Hz.
    pub low_freq: f64,

    /// Upper band-pass edge in Hz. Clamped below Nyquist by the validator.
    ///
    /// Default: `40.0` Hz.
    pub high_freq: f64,

    /// Mains-interference notch frequency in Hz.
    ///
    /// The notch stage runs only when the *requested* value is `> 0`; a
    /// positive value is then validated against Nyquist like the band edges.
    ///
    /// Default: `50.0` Hz.
    pub notch_freq: f64,

    /// Quality factor of the notch (`centre / bandwidth`).
    ///
    /// Default: `30.0`.
    pub notch_quality: f64,

    /// Remove the least-squares linear trend of every channel.
    ///
    /// Default: `false`.
    pub detrend: bool,

    /// Subtract the per-channel mean.
    ///
    /// Default: `false`.
    pub remove_dc: bool,

    /// Replace samples further than `artifact_threshold` standard deviations
    /// from the channel mean by linear interpolation between kept samples.
    ///
    /// Default: `false`.
    pub remove_artifacts: bool,

    /// Outlier threshold in standard deviations.
    ///
    /// Default: `3.0`.
    pub artifact_threshold: f64,

    /// Wavelet denoising after the artifact stage; `None` skips it.
    ///
    /// Default: `None`.
    pub wavelet: Option<WaveletConfig>,

    /// Final per-channel normalisation; `None` leaves amplitudes in µV.
    ///
    /// Default: `None`.
    pub normalize: Option<NormalizeMethod>,
}

impl Default for PreprocessConfig {
    /// 1–40 Hz band-pass, 50 Hz notch, every optional stage off.
    fn default() -> Self {
        Self {
            low_freq: 1.0,
            high_freq: 40.0,
            notch_freq: 50.0,
            notch_quality: DEFAULT_NOTCH_Q,
            detrend: false,
            remove_dc: false,
            remove_artifacts: false,
            artifact_threshold: 3.0,
            wavelet: None,
            normalize: None,
        }
    }
}

/// Daubechies-4 denoising parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaveletConfig {
    /// Decomposition depth. Default: `1`.
    pub level: usize,
}

impl Default for WaveletConfig {
    fn default() -> Self {
        Self { level: 1 }
    }
}

/// Per-channel normalisation method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeMethod {
    /// `(x − mean) / std`.
    Zscore,
    /// `(x − min) / (max − min)`.
    Minmax,
}

/// Parameters of the analysis pass run by [`crate::analyze`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Channel used by the spectral, rhythm and spike stages.
    ///
    /// Default: `0`.
    pub channel: usize,

    /// Spike threshold in standard deviations of `|x − mean|`.
    ///
    /// Default: `3.0`.
    pub spike_threshold: f64,

    /// Welch segment length for coherence, capped at the signal length.
    ///
    /// Default: `1024`.
    pub coherence_nperseg: usize,

    /// Channel pair for coherence. `None` uses `(0, 1)` when the signal has
    /// at least two channels and skips coherence otherwise.
    ///
    /// Default: `None`.
    pub coherence_pair: Option<(usize, usize)>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            channel: 0,
            spike_threshold: 3.0,
            coherence_nperseg: 1024,
            coherence_pair: None,
        }
    }
}

/// Both configs in one document, the shape `eeg_analyze --config` reads:
///
/// ```json
/// { "preprocess": { "notch_freq": 60.0 }, "analysis": { "channel": 2 } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub preprocess: PreprocessConfig,
    pub analysis: AnalysisConfig,
}
