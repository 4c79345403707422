mod common;
use common::noisy_tone;
use eegscope::compare::render_report;
use eegscope::synth::generate_test_data;
use eegscope::{
    analyze, compare_filtering, compare_psd, preprocess, AnalysisConfig, EegError,
    MultichannelSignal, PreprocessConfig, RelaxationLevel, Rhythm,
};
use ndarray::Array2;

// ── Synthetic data ────────────────────────────────────────────────────────────

#[test]
fn synthetic_recording_is_seeded_and_named() {
    let a = generate_test_data(4.0, 250.0, 6, 42).unwrap();
    let b = generate_test_data(4.0, 250.0, 6, 42).unwrap();
    let c = generate_test_data(4.0, 250.0, 6, 43).unwrap();
    assert_eq!(a.data, b.data);
    assert_ne!(a.data, c.data);
    assert_eq!(a.data.dim(), (6, 1000));
    assert_eq!(a.channel_names[5], "EEG_005");
}

#[test]
fn synthetic_rejects_empty_requests() {
    assert!(matches!(generate_test_data(0.0, 250.0, 2, 0), Err(EegError::InputShape(_))));
    assert!(matches!(generate_test_data(1.0, 250.0, 0, 0), Err(EegError::InputShape(_))));
    assert!(matches!(generate_test_data(1.0, -1.0, 2, 0), Err(EegError::InvalidSamplingRate { .. })));
}

// ── Full analysis ─────────────────────────────────────────────────────────────

#[test]
fn cleaned_synthetic_alpha_channel_end_to_end() {
    let raw = generate_test_data(10.0, 250.0, 3, 7).unwrap();
    let clean = preprocess(&raw, &PreprocessConfig::default()).unwrap();
    let cfg = AnalysisConfig { channel: 2, ..AnalysisConfig::default() };
    let report = analyze(&clean.signal, &cfg).unwrap();

    assert_eq!(report.channel, "EEG_002");
    assert_eq!(report.rhythms.dominant_rhythm, Rhythm::Alpha);
    assert_eq!(report.recommendation.general.dominant_rhythm, Some(Rhythm::Alpha));
    assert_eq!(report.recommendation.general.relaxation_level, RelaxationLevel::High);
    approx::assert_abs_diff_eq!(report.duration_s, 10.0, epsilon = 1e-12);
    assert!(report.coherence.is_some());
    assert_eq!(report.recommendation.rhythm_details.len(), 5);

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["rhythms"]["dominant_rhythm"], "alpha");
    assert!(json["recommendation"]["rhythm_details"]["alpha"]["state"].is_string());
}

#[test]
fn single_channel_skips_coherence() {
    let sig = noisy_tone(10.0, 20.0, 2.0, 250.0, 8.0, 1);
    let report = analyze(&sig, &AnalysisConfig::default()).unwrap();
    assert!(report.coherence.is_none());
    assert_eq!(report.channel, "Ch1");

    let cfg = AnalysisConfig { coherence_pair: Some((0, 0)), ..AnalysisConfig::default() };
    assert!(matches!(analyze(&sig, &cfg), Err(EegError::InputShape(_))));
}

#[test]
fn flat_recording_analyses_without_error() {
    let sig = MultichannelSignal::new(Array2::zeros((2, 2500)), 250.0, vec![]).unwrap();
    let report = analyze(&sig, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.statistics.std, 0.0);
    assert_eq!(report.statistics.kurtosis, 0.0);
    assert_eq!(report.spikes.spike_count, 0);
    assert_eq!(report.rhythms.dominant_rhythm, Rhythm::Delta);
    assert_eq!(report.recommendation.general.summary, "Balanced state");
    assert!(report.alerts.is_empty());
}

#[test]
fn out_of_range_channel_is_an_error() {
    let sig = noisy_tone(10.0, 20.0, 2.0, 250.0, 4.0, 2);
    let cfg = AnalysisConfig { channel: 4, ..AnalysisConfig::default() };
    assert!(matches!(analyze(&sig, &cfg), Err(EegError::ChannelOutOfRange { index: 4, .. })));
}

// ── Validation against a reference ────────────────────────────────────────────

#[test]
fn comparison_of_a_run_against_itself_is_excellent() {
    let raw = generate_test_data(4.0, 250.0, 2, 3).unwrap();
    let clean = preprocess(&raw, &PreprocessConfig::default()).unwrap();
    let cmp = compare_filtering(&clean.signal, &clean.signal.data).unwrap();
    approx::assert_abs_diff_eq!(cmp.summary.mean_correlation, 1.0, epsilon = 1e-12);
    assert_eq!(cmp.summary.mean_rmse, 0.0);
    let text = render_report(&cmp);
    assert!(text.contains("excellent agreement"));
    assert!(text.contains("EEG_001"));

    let row = clean.signal.data.row(0).to_vec();
    let psd = compare_psd(&row, &row, 250.0).unwrap();
    approx::assert_abs_diff_eq!(psd.correlation, 1.0, epsilon = 1e-12);
    assert_eq!(psd.mean_abs_difference, 0.0);
}

#[test]
fn comparison_against_raw_flags_differences() {
    let raw = generate_test_data(4.0, 250.0, 2, 3).unwrap();
    let clean = preprocess(&raw, &PreprocessConfig { low_freq: 30.0, high_freq: 45.0, ..PreprocessConfig::default() })
        .unwrap();
    let cmp = compare_filtering(&clean.signal, &raw.data).unwrap();
    assert!(cmp.summary.mean_correlation < 0.95);
    assert!(render_report(&cmp).contains("significant differences"));

    let wrong_shape = Array2::zeros((1, 1000));
    assert!(matches!(compare_filtering(&clean.signal, &wrong_shape), Err(EegError::InputShape(_))));
}
