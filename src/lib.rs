//! # eegscope — EEG conditioning, rhythm analysis and interpretation in pure Rust
//!
//! `eegscope` cleans multichannel scalp EEG, decomposes it into the classical
//! rhythms and turns the relative band powers into a plain-language summary.
//! Filtering is zero-phase second-order-section Butterworth, spectra come
//! from [RustFFT](https://crates.io/crates/rustfft); no Python, no BLAS,
//! no C libraries.
//!
//! ## Pipeline overview
//!
//! ```text
//! recording.safetensors  /  synth::generate_test_data()  /  realtime::SampleBuffer
//!   │
//!   ├─ validate            band edges and notch clamped inside (0, Nyquist)
//!   ├─ bandpass            4th-order Butterworth, forward-backward (sosfiltfilt)
//!   ├─ notch               IIR notch at mains frequency, Q = 30
//!   ├─ detrend / DC        optional, per channel
//!   ├─ artifacts           |z| > threshold → linear interpolation
//!   ├─ wavelet             optional db4 soft-threshold denoising
//!   ├─ normalize           optional z-score or min-max
//!   │
//!   └─→ analyze()
//!         ├─ spectral      periodogram, band powers, entropy, peak
//!         ├─ rhythm        per-band filtering, amplitude, dominant frequency
//!         ├─ spikes        |x − μ| peaks ≥ k·σ, ≥ 100 ms apart
//!         ├─ coherence     Welch magnitude-squared coherence of a channel pair
//!         ├─ stats         moments, RMS, dynamic range
//!         └─ rules         per-rhythm state, summary, advice, alerts
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use eegscope::{analyze, preprocess, AnalysisConfig, PreprocessConfig};
//! use eegscope::synth::generate_test_data;
//!
//! let raw = generate_test_data(10.0, 250.0, 8, 42).unwrap();
//!
//! let clean = preprocess(&raw, &PreprocessConfig::default()).unwrap();
//! for w in &clean.warnings {
//!     println!("corrected: {w}");
//! }
//!
//! let report = analyze(&clean.signal, &AnalysisConfig::default()).unwrap();
//! println!("dominant rhythm: {}", report.rhythms.dominant_rhythm);
//! println!("{}", report.recommendation.general.summary);
//! println!("{}", report.alerts);
//! ```
//!
//! ## Running individual steps
//!
//! ```no_run
//! use eegscope::filter::{butter_bandpass, sosfiltfilt, BUTTERWORTH_ORDER};
//! use eegscope::validate::validate_bandpass_params;
//! use eegscope::spectral::{band_powers, power_spectrum};
//! use ndarray::Array2;
//!
//! let data: Array2<f64> = Array2::zeros((4, 2500)); // [C, T]
//! let fs = 250.0;
//!
//! let p = validate_bandpass_params(1.0, 40.0, fs).unwrap();
//! let nyq = fs / 2.0;
//! let sos = butter_bandpass(BUTTERWORTH_ORDER, p.low / nyq, p.high / nyq).unwrap();
//! let filtered = sosfiltfilt(&sos, &data).unwrap();
//!
//! let spectrum = power_spectrum(filtered.row(0), fs).unwrap();
//! let bands = band_powers(&spectrum);
//! ```

pub mod bands;
pub mod coherence;
pub mod compare;
pub mod config;
pub mod error;
pub mod filter;
pub mod io;
pub mod normalize;
pub mod observe;
pub mod preprocess;
pub mod realtime;
pub mod rhythm;
pub mod rules;
pub mod signal;
pub mod spectral;
pub mod spikes;
pub mod stats;
pub mod synth;
pub mod validate;
pub mod wavelet;
pub mod welch;

use serde::Serialize;
use tracing::{debug, info};

// ── Crate-root re-exports ─────────────────────────────────────────────────
//
// Everything a downstream user is likely to need is available directly as
// `eegscope::Foo` without having to know the internal module layout.

// bands
pub use bands::{canonical_bands, rhythm_for_frequency, FrequencyBand, Rhythm};

// config
pub use config::{AnalysisConfig, NormalizeMethod, PreprocessConfig, RunConfig, WaveletConfig};

// error
pub use error::{EegError, Result};

// signal
pub use signal::MultichannelSignal;

// validate — parameter correction
pub use validate::{
    check_sampling_rate_adequacy, safe_filter_params, validate_bandpass_params,
    validate_notch_params, validate_rhythm_bands,
    BandpassParams, NotchParams, RateAdequacy, SafeFilterParams,
};

// filter — design + zero-phase application
pub use filter::{butter_bandpass, iir_notch, sosfiltfilt, Biquad, SosFilter};

// preprocess — individual stages + pipeline
pub use preprocess::{
    bandpass_filter, detrend, notch_filter, remove_artifacts, remove_dc, run_pipeline,
    wavelet_denoise, Filtered, PreprocessOutput,
};

// observe — stage timing
pub use observe::{NoopSink, StageSink, StageTimings, TracingSink};

// spectral / rhythm
pub use rhythm::{analyze_rhythms, analyze_single_rhythm, RhythmAnalysis, RhythmBandResult, SingleRhythmResult};
pub use spectral::{compute_spectrum, spectral_entropy, PowerSpectrum, SpectralResult};

// spikes / coherence / stats
pub use coherence::{calculate_coherence, CoherenceResult};
pub use spikes::{detect_spikes, find_peaks, SpikeResult};
pub use stats::{calculate_statistics, Statistics};

// rules — interpretation
pub use rules::{
    generate_recommendations, interpret_single_rhythm, medical_alerts, MedicalAlerts,
    Recommendation, RelaxationLevel, RhythmState,
};

// compare — agreement with an external reference
pub use compare::{compare_filtering, compare_psd, FilterComparison, PsdComparison};

/// Run the **cleaning pipeline** with timings sent to `tracing`.
///
/// Convenience wrapper around [`run_pipeline`] with a [`TracingSink`]. Stages
/// run in fixed order (band-pass, notch, detrend, DC removal, artifact
/// removal, wavelet denoising, normalisation); every optional stage is
/// controlled by a [`PreprocessConfig`] field.
///
/// # Errors
///
/// * [`EegError::InvalidSamplingRate`] for a rate that is not finite and
///   positive.
/// * [`EegError::FilterConstruction`] / [`EegError::FilterApplication`] when
///   a filter cannot be built or a channel is too short for it.
pub fn preprocess(signal: &MultichannelSignal, cfg: &PreprocessConfig) -> Result<PreprocessOutput> {
    run_pipeline(signal, cfg, &mut TracingSink)
}

/// Everything [`analyze`] produces for one recording.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// Name of the analysed channel.
    pub channel: String,
    pub sampling_rate: f64,
    pub duration_s: f64,
    pub rhythms: RhythmAnalysis,
    pub spikes: SpikeResult,
    /// Present when the recording has a second channel to pair with.
    pub coherence: Option<CoherenceResult>,
    /// Over all channels.
    pub statistics: Statistics,
    pub recommendation: Recommendation,
    pub alerts: MedicalAlerts,
}

/// Run the **full analysis pass** on an already cleaned recording.
///
/// Spectral, rhythm and spike analysis use channel [`AnalysisConfig::channel`];
/// statistics cover every channel. Coherence runs on
/// [`AnalysisConfig::coherence_pair`], or on channels 0 and 1 when no pair is
/// set and the recording has at least two channels.
///
/// # Errors
///
/// * [`EegError::ChannelOutOfRange`] for a channel index past the last row.
/// * [`EegError::InputShape`] for recordings too short to analyse, or for an
///   explicit coherence pair on a single-channel recording.
///
/// # Examples
///
/// ```no_run
/// use eegscope::{analyze, AnalysisConfig, Rhythm};
/// use eegscope::synth::generate_test_data;
///
/// let sig = generate_test_data(10.0, 250.0, 3, 1).unwrap();
/// let cfg = AnalysisConfig { channel: 2, ..AnalysisConfig::default() };
/// let report = analyze(&sig, &cfg).unwrap();
/// assert_eq!(report.rhythms.dominant_rhythm, Rhythm::Alpha);
/// ```
pub fn analyze(signal: &MultichannelSignal, cfg: &AnalysisConfig) -> Result<AnalysisReport> {
    let channel = cfg.channel;
    let rhythms = analyze_rhythms(signal, channel)?;
    let spikes = detect_spikes(signal, channel, cfg.spike_threshold)?;

    let pair = match cfg.coherence_pair {
        Some(p) => Some(p),
        None if signal.n_channels() >= 2 => Some((0, 1)),
        None => None,
    };
    let coherence = match pair {
        Some((a, b)) => Some(calculate_coherence(signal, a, b, cfg.coherence_nperseg)?),
        None => {
            debug!("single-channel recording, coherence skipped");
            None
        }
    };

    let statistics = calculate_statistics(&signal.data);
    let relative = rhythms.relative_powers();
    let recommendation =
        generate_recommendations(&relative, Some(rhythms.dominant_rhythm), rhythms.spectral_entropy);
    let alerts = medical_alerts(&relative, Some(spikes.spike_count));

    info!(
        channel,
        dominant = %rhythms.dominant_rhythm,
        spikes = spikes.spike_count,
        alerts = alerts.alerts.len(),
        "analysis finished"
    );

    Ok(AnalysisReport {
        channel: signal.channel_name(channel),
        sampling_rate: signal.sampling_rate,
        duration_s: signal.duration(),
        rhythms,
        spikes,
        coherence,
        statistics,
        recommendation,
        alerts,
    })
}
