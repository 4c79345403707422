//! Stage timing.
//!
//! Pipeline entry points take a `&mut dyn StageSink` and report the wall time
//! of every stage they run. Nothing is global: pass [`NoopSink`] to ignore
//! timings, [`TracingSink`] to log them, or [`StageTimings`] to collect them.
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::debug;

/// Receives one call per completed stage.
pub trait StageSink {
    fn record(&mut self, stage: &str, elapsed: Duration);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl StageSink for NoopSink {
    fn record(&mut self, _stage: &str, _elapsed: Duration) {}
}

/// Emits a `debug!` event per stage.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl StageSink for TracingSink {
    fn record(&mut self, stage: &str, elapsed: Duration) {
        debug!(stage, elapsed_ms = elapsed.as_secs_f64() * 1000.0, "stage finished");
    }
}

/// One recorded stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageTiming {
    pub stage: String,
    pub elapsed_ms: f64,
}

/// Collects timings in call order.
#[derive(Debug, Default, Clone, Serialize)]
pub struct StageTimings {
    pub stages: Vec<StageTiming>,
}

impl StageTimings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> f64 {
        self.stages.iter().map(|s| s.elapsed_ms).sum()
    }

    /// Milliseconds spent in `stage`, summed over repeated calls.
    pub fn get(&self, stage: &str) -> Option<f64> {
        let mut hits = self.stages.iter().filter(|s| s.stage == stage).peekable();
        hits.peek()?;
        Some(hits.map(|s| s.elapsed_ms).sum())
    }

    /// `stage=1.2345ms stage=...` on one line.
    pub fn summary_line(&self) -> String {
        self.stages
            .iter()
            .map(|s| format!("{}={:.4}ms", s.stage, s.elapsed_ms))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl StageSink for StageTimings {
    fn record(&mut self, stage: &str, elapsed: Duration) {
        self.stages.push(StageTiming {
            stage: stage.to_string(),
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
        });
    }
}

/// Run `f`, reporting its wall time to `sink` under `stage`. The stage is
/// recorded whether `f` succeeds or not.
pub fn timed<T>(sink: &mut dyn StageSink, stage: &str, f: impl FnOnce() -> T) -> T {
    let t0 = Instant::now();
    let out = f();
    sink.record(stage, t0.elapsed());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_in_order() {
        let mut t = StageTimings::new();
        let v = timed(&mut t, "bandpass", || 41 + 1);
        timed(&mut t, "notch", || ());
        timed(&mut t, "bandpass", || ());
        assert_eq!(v, 42);
        let names: Vec<_> = t.stages.iter().map(|s| s.stage.as_str()).collect();
        assert_eq!(names, ["bandpass", "notch", "bandpass"]);
        assert!(t.get("bandpass").is_some());
        assert!(t.get("detrend").is_none());
        assert!(t.summary_line().starts_with("bandpass="));
    }

    #[test]
    fn noop_accepts_anything() {
        let mut sink = NoopSink;
        assert_eq!(timed(&mut sink, "x", || "ok"), "ok");
    }
}
