mod common;
use common::{gaussian, max_abs_diff, rms, rows, sine};
use eegscope::preprocess::{detrend, remove_artifacts, remove_dc, run_pipeline, wavelet_denoise};
use eegscope::normalize::normalize;
use eegscope::{
    preprocess, MultichannelSignal, NoopSink, NormalizeMethod, PreprocessConfig, StageTimings,
    WaveletConfig,
};
use ndarray::{Array2, Axis};

const FS: f64 = 250.0;

fn eeg_like(seed: u64) -> MultichannelSignal {
    let n = 2500;
    let a: Vec<f64> = sine(10.0, 20.0, FS, n).iter().zip(gaussian(n, 2.0, seed)).map(|(s, e)| s + e).collect();
    let b: Vec<f64> = sine(6.0, 10.0, FS, n).iter().zip(gaussian(n, 2.0, seed + 1)).map(|(s, e)| s + e).collect();
    MultichannelSignal::new(rows(&[a, b]), FS, vec!["Fz".into(), "Cz".into()]).unwrap()
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

#[test]
fn default_pipeline_runs_bandpass_and_notch() {
    let out = preprocess(&eeg_like(1), &PreprocessConfig::default()).unwrap();
    assert_eq!(out.stages, vec!["bandpass", "notch"]);
    assert!(out.warnings.is_empty());
    assert_eq!(out.signal.data.dim(), (2, 2500));
    assert_eq!(out.signal.channel_names, vec!["Fz".to_string(), "Cz".to_string()]);
}

#[test]
fn every_stage_runs_in_fixed_order_and_is_timed() {
    let cfg = PreprocessConfig {
        detrend: true,
        remove_dc: true,
        remove_artifacts: true,
        wavelet: Some(WaveletConfig { level: 2 }),
        normalize: Some(NormalizeMethod::Zscore),
        ..PreprocessConfig::default()
    };
    let mut timings = StageTimings::new();
    let out = run_pipeline(&eeg_like(2), &cfg, &mut timings).unwrap();
    let expected = ["bandpass", "notch", "detrend", "remove_dc", "artifacts", "wavelet", "normalize"];
    assert_eq!(out.stages, expected);
    let timed: Vec<&str> = timings.stages.iter().map(|t| t.stage.as_str()).collect();
    assert_eq!(timed, expected);

    for row in out.signal.data.rows() {
        let mean = row.mean().unwrap();
        approx::assert_abs_diff_eq!(mean, 0.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(row.std(0.0), 1.0, epsilon = 1e-9);
    }
}

#[test]
fn pipeline_minmax_stage_scales_each_channel() {
    let cfg = PreprocessConfig { normalize: Some(NormalizeMethod::Minmax), ..PreprocessConfig::default() };
    let out = run_pipeline(&eeg_like(2), &cfg, &mut NoopSink).unwrap();
    assert_eq!(out.stages.last(), Some(&"normalize"));
    for row in out.signal.data.rows() {
        approx::assert_abs_diff_eq!(row.iter().copied().fold(f64::INFINITY, f64::min), 0.0);
        approx::assert_abs_diff_eq!(row.iter().copied().fold(f64::NEG_INFINITY, f64::max), 1.0);
    }
}

#[test]
fn notch_disabled_by_zero() {
    let cfg = PreprocessConfig { notch_freq: 0.0, ..PreprocessConfig::default() };
    let out = run_pipeline(&eeg_like(3), &cfg, &mut NoopSink).unwrap();
    assert_eq!(out.stages, vec!["bandpass"]);
}

#[test]
fn corrections_are_reported_not_fatal() {
    let cfg = PreprocessConfig { low_freq: -1.0, high_freq: 500.0, notch_freq: 200.0, ..PreprocessConfig::default() };
    let out = run_pipeline(&eeg_like(4), &cfg, &mut NoopSink).unwrap();
    // low not positive (→ 0.1), high above Nyquist, low under the 0.001·nyq
    // floor (→ 0.125), notch above Nyquist
    assert_eq!(out.warnings.len(), 4, "{:?}", out.warnings);
    assert!(out.warnings[3].starts_with("notch frequency"));
}

// ── Individual stages ─────────────────────────────────────────────────────────

#[test]
fn artifacts_replaced_by_interpolation() {
    let clean = sine(10.0, 1.0, FS, 2500);
    let mut spiky = clean.clone();
    for &i in &[400, 1200, 2100] {
        spiky[i] = 1000.0;
    }
    let out = remove_artifacts(&rows(&[spiky.clone()]), 3.0);
    for (t, (&y, (&c, &s))) in out.row(0).iter().zip(clean.iter().zip(&spiky)).enumerate() {
        if s == 1000.0 {
            assert!((y - c).abs() < 0.05, "t={t}: interpolated {y} vs clean {c}");
        } else {
            assert_eq!(y, s, "kept sample {t} changed");
        }
    }
}

#[test]
fn fully_flagged_channel_is_left_alone() {
    let x = rows(&[sine(10.0, 1.0, FS, 500)]);
    assert_eq!(remove_artifacts(&x, -1.0), x);
}

#[test]
fn detrend_removes_a_line() {
    let x = Array2::from_shape_fn((2, 300), |(c, t)| 3.0 + (c as f64 + 0.5) * t as f64);
    let y = detrend(&x);
    assert!(max_abs_diff(&y, &Array2::zeros((2, 300))) < 1e-9);
}

#[test]
fn remove_dc_centres_channels() {
    let x = Array2::from_shape_fn((3, 100), |(c, t)| c as f64 * 10.0 + (t as f64 * 0.3).sin());
    let y = remove_dc(&x);
    for m in y.mean_axis(Axis(1)).unwrap() {
        approx::assert_abs_diff_eq!(m, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn minmax_maps_to_unit_interval_and_flat_to_zero() {
    let x = rows(&[sine(3.0, 5.0, FS, 250), vec![7.0; 250]]);
    let y = normalize(&x, NormalizeMethod::Minmax);
    let r0 = y.row(0);
    approx::assert_abs_diff_eq!(r0.iter().copied().fold(f64::INFINITY, f64::min), 0.0);
    approx::assert_abs_diff_eq!(r0.iter().copied().fold(f64::NEG_INFINITY, f64::max), 1.0);
    assert!(y.row(1).iter().all(|&v| v == 0.0));
}

#[test]
fn zscore_flat_channel_is_centred() {
    let x = rows(&[vec![4.0; 100]]);
    let y = normalize(&x, NormalizeMethod::Zscore);
    assert!(y.iter().all(|&v| v == 0.0));
}

#[test]
fn wavelet_denoising_moves_towards_clean_signal() {
    let n = 2048;
    let clean = sine(2.0, 10.0, FS, n);
    let noisy: Vec<f64> = clean.iter().zip(gaussian(n, 2.0, 11)).map(|(s, e)| s + e).collect();
    let out = wavelet_denoise(&rows(&[noisy.clone()]), 4);

    let before = rms(noisy.iter().zip(&clean).map(|(a, b)| a - b));
    let after = rms(out.row(0).iter().zip(&clean).map(|(a, b)| a - b));
    assert!(after < 0.7 * before, "rms error {before:.3} → {after:.3}");
}
