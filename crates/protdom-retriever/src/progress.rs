//! Progress reporting and cooperative cancellation
//!
//! Stages report `(message, percent)` pairs through a [`Progress`] handle.
//! Cancellation is a shared [`CancellationToken`] that is only ever checked
//! at well-defined points: stage boundaries and the top of each pool task.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

pub use tokio_util::sync::CancellationToken;

/// Receiver for progress updates (a progress bar, a channel, a test probe)
pub trait ProgressSink: Send + Sync {
    fn report(&self, message: &str, percent: f64);
}

impl<F> ProgressSink for F
where
    F: Fn(&str, f64) + Send + Sync,
{
    fn report(&self, message: &str, percent: f64) {
        self(message, percent)
    }
}

/// Cloneable progress handle passed to every stage
#[derive(Clone, Default)]
pub struct Progress {
    sink: Option<Arc<dyn ProgressSink>>,
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Progress {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self { sink: Some(sink) }
    }

    /// Handle that only logs
    pub fn none() -> Self {
        Self::default()
    }

    /// Report progress; `percent` is clamped to `[0, 100]`.
    ///
    /// A panicking sink is logged and otherwise ignored.
    pub fn update(&self, message: &str, percent: f64) {
        let percent = clamp_percent(percent);
        debug!(percent = format!("{:.1}", percent), "{}", message);

        if let Some(sink) = &self.sink {
            if catch_unwind(AssertUnwindSafe(|| sink.report(message, percent))).is_err() {
                warn!(message, "Progress sink panicked; update dropped");
            }
        }
    }

    /// Map `fraction` (0..1) of a stage onto the `[from, to]` percent window
    pub fn update_within(&self, message: &str, from: f64, to: f64, fraction: f64) {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        self.update(message, from + (to - from) * fraction);
    }
}

fn clamp_percent(percent: f64) -> f64 {
    if percent.is_nan() {
        0.0
    } else {
        percent.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (Progress, Arc<Mutex<Vec<(String, f64)>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let progress = Progress::new(Arc::new(move |msg: &str, pct: f64| {
            sink_seen.lock().unwrap().push((msg.to_string(), pct));
        }));
        (progress, seen)
    }

    #[test]
    fn test_percent_is_clamped() {
        let (progress, seen) = recording();

        progress.update("below", -10.0);
        progress.update("above", 250.0);
        progress.update("nan", f64::NAN);
        progress.update("inside", 42.5);

        let seen = seen.lock().unwrap();
        let percents: Vec<f64> = seen.iter().map(|(_, p)| *p).collect();
        assert_eq!(percents, vec![0.0, 100.0, 0.0, 42.5]);
    }

    #[test]
    fn test_update_within_window() {
        let (progress, seen) = recording();

        progress.update_within("half", 20.0, 40.0, 0.5);
        progress.update_within("overshoot", 20.0, 40.0, 3.0);

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].1, 30.0);
        assert_eq!(seen[1].1, 40.0);
    }

    #[test]
    fn test_panicking_sink_does_not_propagate() {
        let progress = Progress::new(Arc::new(|_: &str, _: f64| panic!("sink broke")));
        progress.update("still fine", 10.0);
    }

    #[test]
    fn test_none_only_logs() {
        Progress::none().update("nobody listening", 50.0);
    }
}
