/// pipeline_steps: run every cleaning stage on one recording and write each
/// intermediate array to a safetensors file for side-by-side inspection.
///
/// Output keys:
///   raw        [C, T]  f64  input
///   bandpass   [C, T]  f64  after the validated Butterworth band-pass
///   notch      [C, T]  f64  after the mains notch (absent with --notch 0)
///   detrend    [C, T]  f64  after linear detrending
///   artifacts  [C, T]  f64  after outlier interpolation
///   wavelet    [C, T]  f64  after db4 denoising
///   zscore     [C, T]  f64  after per-channel z-score
///   psd_freqs  [F]     f64  periodogram bins of channel 0
///   psd        [F]     f64  periodogram of channel 0 after z-score
///   sfreq      [1]     f64
///   n_stages   [1]     i32
/// Metadata: `ch_names`, `warnings` (newline-separated corrections).
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use eegscope::{
    io::{read_signal, StWriter},
    normalize::normalize,
    observe::{timed, StageTimings},
    preprocess::{bandpass_filter, detrend, notch_filter, remove_artifacts, wavelet_denoise},
    spectral::power_spectrum,
    synth::generate_test_data,
    filter::DEFAULT_NOTCH_Q,
    NormalizeMethod,
};

#[derive(Parser, Debug)]
#[command(name = "pipeline_steps")]
struct Args {
    /// Input recording; synthetic data when omitted.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Band-pass low edge (Hz).
    #[arg(long, default_value_t = 1.0)]
    low: f64,

    /// Band-pass high edge (Hz).
    #[arg(long, default_value_t = 40.0)]
    high: f64,

    /// Notch frequency (Hz), 0 to skip.
    #[arg(long, default_value_t = 50.0)]
    notch: f64,

    /// Artifact threshold (standard deviations).
    #[arg(long, default_value_t = 3.0)]
    threshold: f64,

    /// Wavelet decomposition level.
    #[arg(long, default_value_t = 1)]
    level: usize,

    /// Seed for synthetic input.
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut timings = StageTimings::new();
    let raw = timed(&mut timings, "load", || match &args.input {
        Some(p) => read_signal(p),
        None => Ok(generate_test_data(10.0, 250.0, 8, args.seed)?),
    })?;
    let fs = raw.sampling_rate;
    let mut warnings = Vec::new();

    // ── Filters ────────────────────────────────────────────────────────────
    let bp = timed(&mut timings, "bandpass", || bandpass_filter(&raw.data, fs, args.low, args.high))?;
    warnings.extend(bp.warnings);
    let notched = if args.notch > 0.0 {
        let n = timed(&mut timings, "notch", || notch_filter(&bp.data, fs, args.notch, DEFAULT_NOTCH_Q))?;
        warnings.extend(n.warnings);
        Some(n.data)
    } else {
        None
    };
    let filtered = notched.as_ref().unwrap_or(&bp.data);

    // ── Cleaning ───────────────────────────────────────────────────────────
    let data_dt = timed(&mut timings, "detrend", || detrend(filtered));
    let data_art = timed(&mut timings, "artifacts", || remove_artifacts(&data_dt, args.threshold));
    let data_wav = timed(&mut timings, "wavelet", || wavelet_denoise(&data_art, args.level));
    let data_z = timed(&mut timings, "zscore", || normalize(&data_wav, NormalizeMethod::Zscore));

    // ── Spectrum of channel 0 ──────────────────────────────────────────────
    let psd = timed(&mut timings, "psd", || power_spectrum(data_z.row(0), fs))?;

    // Format: "TIMING load=Xms bandpass=Xms ..."
    eprintln!("TIMING {}", timings.summary_line());
    eprintln!("  {} ch × {} samples @ {fs} Hz, {} corrections", raw.n_channels(), raw.n_samples(), warnings.len());
    for w in &warnings {
        eprintln!("  corrected: {w}");
    }

    // ── Write output ───────────────────────────────────────────────────────
    eprintln!("Writing → {}", args.output.display());
    let mut w = StWriter::new();
    w.add_f64_arr2("raw", &raw.data);
    w.add_f64_arr2("bandpass", &bp.data);
    if let Some(n) = &notched {
        w.add_f64_arr2("notch", n);
    }
    w.add_f64_arr2("detrend", &data_dt);
    w.add_f64_arr2("artifacts", &data_art);
    w.add_f64_arr2("wavelet", &data_wav);
    w.add_f64_arr2("zscore", &data_z);
    w.add_f64("psd_freqs", &psd.frequencies, &[psd.frequencies.len()]);
    w.add_f64("psd", &psd.power, &[psd.power.len()]);
    w.add_f64("sfreq", &[fs], &[1]);
    w.add_i32("n_stages", &[timings.stages.len() as i32], &[1]);
    w.add_metadata("ch_names", raw.resolved_names().join(","));
    w.add_metadata("warnings", warnings.join("\n"));
    w.write(&args.output)?;

    eprintln!("Done.");
    Ok(())
}
