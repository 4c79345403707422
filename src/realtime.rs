//! Real-time acquisition: a driver produces samples on a background thread,
//! the controller groups them into batches and hands them over through a
//! bounded queue, and a [`SampleBuffer`] keeps the trailing seconds for
//! display and windowed analysis.
//!
//! ```text
//!  AcquisitionDriver ──▶ producer thread ──▶ BatchQueue (drop-oldest) ──▶ drain() ──▶ SampleBuffer
//! ```
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::signal::MultichannelSignal;

/// Samples per batch handed to the queue.
pub const DEFAULT_BATCH_SIZE: usize = 64;
/// Batches the queue holds before it starts dropping the oldest.
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
/// Upper bound on batches returned by one [`AcquisitionController::drain`].
pub const DEFAULT_DRAIN_BATCHES: usize = 5;
/// How long [`AcquisitionController::stop`] waits for the producer.
pub const STOP_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("failed to open acquisition source: {0}")]
    Open(String),
    #[error("failed to read sample: {0}")]
    Read(String),
    #[error("failed to spawn acquisition thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// One multichannel reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EegSample {
    /// Seconds since the session started.
    pub timestamp: f64,
    /// One value per channel.
    pub amplitudes: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct SampleBatch {
    pub samples: Vec<EegSample>,
}

/// A sample source. `next_sample` blocks until a sample is available and
/// returns `Ok(None)` once the stream has ended.
pub trait AcquisitionDriver: Send {
    fn open(&mut self) -> Result<(), AcquisitionError>;
    fn next_sample(&mut self) -> Result<Option<EegSample>, AcquisitionError>;
    fn close(&mut self) -> Result<(), AcquisitionError>;
}

/// Single-channel synthetic source:
/// `50·sin(2π·10t) + 20·sin(2π·20t) + N(0, 5²)` plus, with probability 0.1%
/// per sample, an artifact of `100 · N(0, 1)`.
pub struct SyntheticDriver {
    sampling_rate: f64,
    count: u64,
    rng: ChaCha8Rng,
    paced: bool,
    open: bool,
}

impl SyntheticDriver {
    pub fn new(sampling_rate: f64, seed: u64) -> Self {
        Self {
            sampling_rate,
            count: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            paced: true,
            open: false,
        }
    }

    /// Sleep one sample period per sample (default) or produce as fast as
    /// the consumer allows.
    pub fn paced(mut self, paced: bool) -> Self {
        self.paced = paced;
        self
    }

    pub fn sampling_rate(&self) -> f64 {
        self.sampling_rate
    }
}

impl AcquisitionDriver for SyntheticDriver {
    fn open(&mut self) -> Result<(), AcquisitionError> {
        if !(self.sampling_rate.is_finite() && self.sampling_rate > 0.0) {
            return Err(AcquisitionError::Open(format!(
                "synthetic source needs a positive rate, got {}",
                self.sampling_rate
            )));
        }
        self.open = true;
        self.count = 0;
        info!(sampling_rate = self.sampling_rate, "synthetic driver opened");
        Ok(())
    }

    fn next_sample(&mut self) -> Result<Option<EegSample>, AcquisitionError> {
        if !self.open {
            return Err(AcquisitionError::Read("driver is not open".into()));
        }
        let t = self.count as f64 / self.sampling_rate;
        let alpha = 50.0 * (2.0 * PI * 10.0 * t).sin();
        let beta = 20.0 * (2.0 * PI * 20.0 * t).sin();
        let noise: f64 = StandardNormal.sample(&mut self.rng);
        let artifact = if self.rng.random::<f64>() < 0.001 {
            let z: f64 = StandardNormal.sample(&mut self.rng);
            100.0 * z
        } else {
            0.0
        };
        self.count += 1;
        if self.paced {
            thread::sleep(Duration::from_secs_f64(1.0 / self.sampling_rate));
        }
        Ok(Some(EegSample { timestamp: t, amplitudes: vec![alpha + beta + 5.0 * noise + artifact] }))
    }

    fn close(&mut self) -> Result<(), AcquisitionError> {
        self.open = false;
        info!(samples = self.count, "synthetic driver closed");
        Ok(())
    }
}

/// Bounded FIFO of batches. Pushing into a full queue evicts the oldest batch.
pub struct BatchQueue {
    inner: Mutex<VecDeque<SampleBatch>>,
    capacity: usize,
}

impl BatchQueue {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { inner: Mutex::new(VecDeque::with_capacity(capacity)), capacity }
    }

    /// Enqueue; returns `true` when an old batch had to be dropped.
    pub fn push(&self, batch: SampleBatch) -> bool {
        let mut q = self.inner.lock();
        let dropped = if q.len() >= self.capacity {
            q.pop_front();
            true
        } else {
            false
        };
        q.push_back(batch);
        dropped
    }

    pub fn pop(&self) -> Option<SampleBatch> {
        self.inner.lock().pop_front()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[derive(Default)]
struct Counters {
    samples_received: AtomicU64,
    batches_enqueued: AtomicU64,
    batches_dropped: AtomicU64,
}

/// Snapshot of controller counters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AcquisitionStats {
    pub samples_received: u64,
    pub batches_enqueued: u64,
    pub batches_dropped: u64,
    pub queue_len: usize,
    pub is_running: bool,
}

/// Owns the producer thread for one driver.
pub struct AcquisitionController {
    driver: Arc<Mutex<Box<dyn AcquisitionDriver>>>,
    batch_size: usize,
    queue: Arc<BatchQueue>,
    running: Arc<AtomicBool>,
    counters: Arc<Counters>,
    last_error: Arc<Mutex<Option<String>>>,
    producer: Option<(JoinHandle<()>, Receiver<()>)>,
}

impl AcquisitionController {
    pub fn new(driver: Box<dyn AcquisitionDriver>) -> Self {
        Self::with_batch_size(driver, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(driver: Box<dyn AcquisitionDriver>, batch_size: usize) -> Self {
        Self {
            driver: Arc::new(Mutex::new(driver)),
            batch_size: batch_size.max(1),
            queue: Arc::new(BatchQueue::new(DEFAULT_QUEUE_CAPACITY)),
            running: Arc::new(AtomicBool::new(false)),
            counters: Arc::new(Counters::default()),
            last_error: Arc::new(Mutex::new(None)),
            producer: None,
        }
    }

    /// Spawn the producer. Does nothing while a producer is already running.
    pub fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.running.load(Ordering::Acquire) {
            return Ok(());
        }
        // Reap a producer that finished on its own.
        if let Some((handle, _)) = self.producer.take() {
            let _ = handle.join();
        }

        // Fresh flag per run; a producer detached by `stop` keeps its cleared one.
        self.running = Arc::new(AtomicBool::new(true));
        let (done_tx, done_rx) = bounded::<()>(1);
        let driver = Arc::clone(&self.driver);
        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);
        let counters = Arc::clone(&self.counters);
        let last_error = Arc::clone(&self.last_error);
        let batch_size = self.batch_size;

        let spawned = thread::Builder::new().name("eeg-acquisition".into()).spawn(move || {
            let mut driver = driver.lock();
            if let Err(e) = driver.open() {
                warn!(error = %e, "acquisition source failed to open");
                *last_error.lock() = Some(e.to_string());
            } else {
                produce(&mut **driver, batch_size, &queue, &running, &counters, &last_error);
                if let Err(e) = driver.close() {
                    warn!(error = %e, "acquisition source failed to close");
                }
            }
            running.store(false, Ordering::Release);
            let _ = done_tx.send(());
        });

        match spawned {
            Ok(handle) => {
                self.producer = Some((handle, done_rx));
                info!(batch_size, "acquisition started");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::Release);
                Err(AcquisitionError::Spawn(e))
            }
        }
    }

    /// Signal the producer to finish and join it, waiting at most
    /// [`STOP_TIMEOUT`]. Calling it again, or on a stopped controller, is a
    /// no-op.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        let Some((handle, done_rx)) = self.producer.take() else {
            return;
        };
        match done_rx.recv_timeout(STOP_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                let _ = handle.join();
                info!("acquisition stopped");
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(timeout_s = STOP_TIMEOUT.as_secs_f64(), "acquisition thread did not finish in time, detaching");
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Take at most `max_batches` batches off the queue, oldest first.
    pub fn drain(&self, max_batches: usize) -> Vec<SampleBatch> {
        std::iter::from_fn(|| self.queue.pop()).take(max_batches).collect()
    }

    pub fn stats(&self) -> AcquisitionStats {
        AcquisitionStats {
            samples_received: self.counters.samples_received.load(Ordering::Relaxed),
            batches_enqueued: self.counters.batches_enqueued.load(Ordering::Relaxed),
            batches_dropped: self.counters.batches_dropped.load(Ordering::Relaxed),
            queue_len: self.queue.len(),
            is_running: self.is_running(),
        }
    }

    pub fn clear_stats(&self) {
        self.counters.samples_received.store(0, Ordering::Relaxed);
        self.counters.batches_enqueued.store(0, Ordering::Relaxed);
        self.counters.batches_dropped.store(0, Ordering::Relaxed);
    }

    /// Last driver error reported by the producer, if any.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }
}

impl Drop for AcquisitionController {
    fn drop(&mut self) {
        self.stop();
    }
}

fn produce(
    driver: &mut dyn AcquisitionDriver,
    batch_size: usize,
    queue: &BatchQueue,
    running: &AtomicBool,
    counters: &Counters,
    last_error: &Mutex<Option<String>>,
) {
    let mut pending = Vec::with_capacity(batch_size);
    let flush = |pending: &mut Vec<EegSample>| {
        if pending.is_empty() {
            return;
        }
        let batch = SampleBatch { samples: std::mem::replace(pending, Vec::with_capacity(batch_size)) };
        if queue.push(batch) {
            counters.batches_dropped.fetch_add(1, Ordering::Relaxed);
            debug!("batch queue full, dropped oldest batch");
        }
        counters.batches_enqueued.fetch_add(1, Ordering::Relaxed);
    };

    while running.load(Ordering::Acquire) {
        match driver.next_sample() {
            Ok(Some(sample)) => {
                pending.push(sample);
                counters.samples_received.fetch_add(1, Ordering::Relaxed);
                if pending.len() >= batch_size {
                    flush(&mut pending);
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "acquisition read failed");
                *last_error.lock() = Some(e.to_string());
                break;
            }
        }
    }
    flush(&mut pending);
}

/// Trailing multichannel history for display and windowed analysis.
#[derive(Debug, Clone)]
pub struct SampleBuffer {
    max_duration: f64,
    timestamps: VecDeque<f64>,
    channels: Vec<VecDeque<f64>>,
    extrema: Option<(f64, f64)>,
}

impl SampleBuffer {
    /// Buffer for `n_channels` channels keeping the last `max_duration`
    /// seconds (by timestamp).
    pub fn new(n_channels: usize, max_duration: f64) -> Self {
        Self {
            max_duration,
            timestamps: VecDeque::new(),
            channels: vec![VecDeque::new(); n_channels.max(1)],
            extrema: None,
        }
    }

    /// Append a batch; channels a sample does not carry are filled with 0.
    pub fn add_batch(&mut self, batch: &SampleBatch) {
        for sample in &batch.samples {
            self.timestamps.push_back(sample.timestamp);
            for (c, ch) in self.channels.iter_mut().enumerate() {
                let v = sample.amplitudes.get(c).copied().unwrap_or(0.0);
                ch.push_back(v);
                self.extrema = Some(match self.extrema {
                    Some((lo, hi)) => (lo.min(v), hi.max(v)),
                    None => (v, v),
                });
            }
        }
        self.trim();
    }

    fn trim(&mut self) {
        let Some(&last) = self.timestamps.back() else {
            return;
        };
        let cutoff = last - self.max_duration;
        while self.timestamps.front().is_some_and(|&t| t < cutoff) {
            self.timestamps.pop_front();
            for ch in &mut self.channels {
                ch.pop_front();
            }
        }
    }

    /// Samples whose timestamp lies within `seconds` of the newest one:
    /// `(timestamps, one list per channel)`.
    pub fn window(&self, seconds: f64) -> (Vec<f64>, Vec<Vec<f64>>) {
        let Some(&last) = self.timestamps.back() else {
            return (Vec::new(), vec![Vec::new(); self.channels.len()]);
        };
        let start = self.timestamps.partition_point(|&t| t < last - seconds);
        let timestamps = self.timestamps.range(start..).copied().collect();
        let data = self.channels.iter().map(|ch| ch.range(start..).copied().collect()).collect();
        (timestamps, data)
    }

    /// Window as a [`MultichannelSignal`]; the rate is estimated from the
    /// timestamps when `sampling_rate` is `None`.
    pub fn to_signal(&self, seconds: f64, sampling_rate: Option<f64>) -> crate::Result<MultichannelSignal> {
        let (timestamps, data) = self.window(seconds);
        MultichannelSignal::from_window(&timestamps, &data, sampling_rate)
    }

    /// Smallest and largest value ever added since the last clear,
    /// `(-100, 100)` for an empty buffer.
    pub fn extrema(&self) -> (f64, f64) {
        self.extrema.unwrap_or((-100.0, 100.0))
    }

    /// Newest value per channel, zeros when empty.
    pub fn latest(&self) -> Vec<f64> {
        self.channels.iter().map(|ch| ch.back().copied().unwrap_or(0.0)).collect()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Span between the oldest and newest timestamp.
    pub fn duration(&self) -> f64 {
        match (self.timestamps.front(), self.timestamps.back()) {
            (Some(a), Some(b)) => b - a,
            _ => 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.timestamps.clear();
        self.channels.iter_mut().for_each(VecDeque::clear);
        self.extrema = None;
    }
}
