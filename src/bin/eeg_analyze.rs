use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use eegscope::compare::{compare_filtering, render_report};
use eegscope::io::{read_json, read_signal, write_json};
use eegscope::realtime::{AcquisitionController, SampleBuffer, SyntheticDriver, DEFAULT_DRAIN_BATCHES};
use eegscope::synth::generate_test_data;
use eegscope::{
    analyze, analyze_single_rhythm, interpret_single_rhythm, preprocess, AnalysisReport,
    MultichannelSignal, Rhythm, RunConfig,
};

#[derive(Parser, Debug)]
#[command(name = "eeg_analyze", about = "Clean an EEG recording and report its rhythms")]
struct Args {
    /// Recording (`data` [C, T], `sfreq`) as safetensors
    #[arg(long, conflicts_with_all = ["synthetic", "live"])]
    input: Option<PathBuf>,

    /// Analyse generated test data instead of a file
    #[arg(long)]
    synthetic: bool,

    /// Record this many seconds from the synthetic live driver and analyse them
    #[arg(long, conflicts_with = "synthetic")]
    live: Option<f64>,

    /// Synthetic duration (s)
    #[arg(long, default_value_t = 10.0)]
    duration: f64,

    /// Synthetic / live sampling rate (Hz)
    #[arg(long, default_value_t = 250.0)]
    fs: f64,

    /// Synthetic channel count
    #[arg(long, default_value_t = 8)]
    channels: usize,

    /// Synthetic RNG seed
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// JSON file with `preprocess` and `analysis` sections
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the band-pass low edge (Hz)
    #[arg(long)]
    low: Option<f64>,

    /// Override the band-pass high edge (Hz)
    #[arg(long)]
    high: Option<f64>,

    /// Override the notch frequency (Hz); 0 disables the notch
    #[arg(long)]
    notch: Option<f64>,

    /// Override the analysed channel
    #[arg(long)]
    channel: Option<usize>,

    /// Analyse the input as is
    #[arg(long)]
    no_preprocess: bool,

    /// Also print the single-rhythm view of this band (delta … gamma)
    #[arg(long)]
    rhythm: Option<Rhythm>,

    /// Compare the cleaned signal against this reference recording
    #[arg(long)]
    reference: Option<PathBuf>,

    /// Write the full report as JSON
    #[arg(long)]
    output: Option<PathBuf>,

    /// Log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let mut cfg: RunConfig = match &args.config {
        Some(p) => read_json(p)?,
        None => RunConfig::default(),
    };
    if let Some(v) = args.low {
        cfg.preprocess.low_freq = v;
    }
    if let Some(v) = args.high {
        cfg.preprocess.high_freq = v;
    }
    if let Some(v) = args.notch {
        cfg.preprocess.notch_freq = v;
    }
    if let Some(v) = args.channel {
        cfg.analysis.channel = v;
    }

    let raw = load(&args)?;
    info!(
        channels = raw.n_channels(),
        samples = raw.n_samples(),
        sampling_rate = raw.sampling_rate,
        "recording loaded"
    );

    let signal = if args.no_preprocess {
        raw
    } else {
        let out = preprocess(&raw, &cfg.preprocess)?;
        info!(stages = ?out.stages, corrections = out.warnings.len(), "preprocessing done");
        out.signal
    };

    if let Some(path) = &args.reference {
        let reference = read_signal(path)?;
        let cmp = compare_filtering(&signal, &reference.data)?;
        println!("{}", render_report(&cmp));
    }

    let report = analyze(&signal, &cfg.analysis)?;
    print_report(&report);

    if let Some(rhythm) = args.rhythm {
        let single = analyze_single_rhythm(&signal, cfg.analysis.channel, rhythm)?;
        println!(
            "\n{rhythm}: {:.1}% of total power, peak {:.2} Hz\n  {}",
            single.relative_power * 100.0,
            single.peak_frequency,
            interpret_single_rhythm(rhythm, single.relative_power)
        );
    }

    if let Some(path) = &args.output {
        write_json(path, &report)?;
        info!(path = %path.display(), "report written");
    }
    Ok(())
}

fn load(args: &Args) -> Result<MultichannelSignal> {
    if let Some(path) = &args.input {
        return read_signal(path);
    }
    if let Some(seconds) = args.live {
        return record_live(seconds, args.fs, args.seed);
    }
    if args.synthetic {
        return Ok(generate_test_data(args.duration, args.fs, args.channels, args.seed)?);
    }
    bail!("no data source: pass --input FILE, --synthetic or --live SECONDS");
}

fn record_live(seconds: f64, fs: f64, seed: u64) -> Result<MultichannelSignal> {
    if !(seconds.is_finite() && seconds > 0.0) {
        bail!("--live needs a positive duration, got {seconds}");
    }
    let driver = SyntheticDriver::new(fs, seed);
    let mut controller = AcquisitionController::new(Box::new(driver));
    let mut buffer = SampleBuffer::new(1, seconds.max(30.0));

    controller.start().context("starting acquisition")?;
    let deadline = Instant::now() + Duration::from_secs_f64(seconds);
    while Instant::now() < deadline && controller.is_running() {
        for batch in controller.drain(DEFAULT_DRAIN_BATCHES) {
            buffer.add_batch(&batch);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    controller.stop();
    for batch in controller.drain(usize::MAX) {
        buffer.add_batch(&batch);
    }

    let stats = controller.stats();
    info!(samples = stats.samples_received, dropped = stats.batches_dropped, "live recording finished");
    if let Some(e) = controller.last_error() {
        warn!(error = %e, "driver reported an error");
    }
    Ok(buffer.to_signal(seconds, Some(fs))?)
}

fn print_report(r: &AnalysisReport) {
    println!("Channel {} ({:.1} s @ {} Hz)", r.channel, r.duration_s, r.sampling_rate);
    println!("{}", "─".repeat(48));
    for (rhythm, b) in &r.rhythms.rhythms {
        println!(
            "{:<6} {:>6.1}%  amp {:>8.3}  peak {:>6.2} Hz",
            rhythm.name(),
            b.relative_power * 100.0,
            b.mean_amplitude,
            b.dominant_frequency
        );
    }
    println!(
        "dominant {}  entropy {:.3}  spikes {} ({:.2}/s)",
        r.rhythms.dominant_rhythm, r.rhythms.spectral_entropy, r.spikes.spike_count, r.spikes.spike_rate
    );
    if let Some(c) = &r.coherence {
        println!("mean coherence {:.3}", c.mean_coherence);
    }
    println!("\n{}", r.recommendation.general.summary);
    for s in &r.recommendation.specific_recommendations {
        println!("  • {s}");
    }
    println!("\n{}", r.alerts);
}
