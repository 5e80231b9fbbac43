//! Fractional progress relay for load and transcode operations

use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

/// Receives completion fractions in `[0, 1]`
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, fraction: f64);
}

impl<F> ProgressCallback for F
where
    F: Fn(f64) + Send + Sync,
{
    fn on_progress(&self, fraction: f64) {
        self(fraction)
    }
}

/// Shared handle to a progress observer
pub type ProgressHandle = Arc<dyn ProgressCallback>;

/// Relays progress to an optional observer.
///
/// Values are clamped into `[0, 1]`, NaN is dropped and regressions are
/// suppressed, so observers always see a non-decreasing sequence, even when
/// clones report from several tasks. The observer runs under the reporter's
/// lock and must not report back into it.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressHandle>,
    last: Arc<Mutex<Option<f64>>>,
}

impl ProgressReporter {
    pub fn new(callback: Option<ProgressHandle>) -> Self {
        Self {
            callback,
            last: Arc::new(Mutex::new(None)),
        }
    }

    /// Reporter with no observer
    pub fn silent() -> Self {
        Self::default()
    }

    /// Report a completion fraction
    pub fn report(&self, fraction: f64) {
        if fraction.is_nan() {
            return;
        }
        let fraction = fraction.clamp(0.0, 1.0);

        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        if matches!(*last, Some(previous) if fraction < previous) {
            return;
        }
        *last = Some(fraction);

        if let Some(callback) = &self.callback {
            callback.on_progress(fraction);
        }
    }

    /// Report `done / total`; ignored when total is not positive
    pub fn report_ratio(&self, done: f64, total: f64) {
        if total > 0.0 {
            self.report(done / total);
        }
    }

    /// Report completion
    pub fn complete(&self) {
        self.report(1.0);
    }

    /// Last value delivered to the observer
    pub fn last(&self) -> Option<f64> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("has_callback", &self.callback.is_some())
            .field("last", &self.last())
            .finish()
    }
}

/// Console progress bar on stderr
pub struct ConsoleProgressCallback {
    label: String,
}

impl ConsoleProgressCallback {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
        }
    }

    fn render(&self, fraction: f64) -> String {
        let bar_length = 20;
        let filled = ((fraction * bar_length as f64) as usize).min(bar_length);
        let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);
        format!("{} [{}] {:>5.1}%", self.label, bar, fraction * 100.0)
    }
}

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, fraction: f64) {
        let mut stderr = std::io::stderr().lock();
        let _ = write!(stderr, "\r{}", self.render(fraction));
        if fraction >= 1.0 {
            let _ = writeln!(stderr);
        }
        let _ = stderr.flush();
    }
}

/// JSON progress events on stdout for machine consumers
pub struct JsonProgressCallback {
    operation: String,
}

impl JsonProgressCallback {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
        }
    }

    fn event(&self, fraction: f64) -> serde_json::Value {
        serde_json::json!({
            "event": "progress",
            "operation": self.operation,
            "fraction": fraction,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })
    }
}

impl ProgressCallback for JsonProgressCallback {
    fn on_progress(&self, fraction: f64) {
        println!("{}", self.event(fraction));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording() -> (ProgressReporter, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let reporter = ProgressReporter::new(Some(Arc::new(move |f: f64| {
            sink.lock().unwrap().push(f);
        })));
        (reporter, seen)
    }

    #[test]
    fn test_reporter_clamps_and_suppresses_regressions() {
        let (reporter, seen) = recording();
        reporter.report(0.2);
        reporter.report(0.1);
        reporter.report(1.7);
        reporter.report(f64::NAN);

        assert_eq!(*seen.lock().unwrap(), vec![0.2, 1.0]);
        assert_eq!(reporter.last(), Some(1.0));
    }

    #[test]
    fn test_reporter_ratio() {
        let (reporter, seen) = recording();
        reporter.report_ratio(5.0, 10.0);
        reporter.report_ratio(1.0, 0.0);
        assert_eq!(*seen.lock().unwrap(), vec![0.5]);
    }

    #[test]
    fn test_clones_share_monotonic_state() {
        let (reporter, seen) = recording();
        let clone = reporter.clone();
        reporter.report(0.6);
        clone.report(0.4);
        clone.complete();
        assert_eq!(*seen.lock().unwrap(), vec![0.6, 1.0]);
    }

    #[test]
    fn test_concurrent_reporters_deliver_in_order() {
        let (reporter, seen) = recording();
        let threads: Vec<_> = (0..4)
            .map(|offset| {
                let reporter = reporter.clone();
                std::thread::spawn(move || {
                    for step in 0..250 {
                        reporter.report(((step * 4 + offset) as f64) / 1000.0);
                    }
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_silent_reporter_tracks_last() {
        let reporter = ProgressReporter::silent();
        reporter.report(0.3);
        assert_eq!(reporter.last(), Some(0.3));
    }

    #[test]
    fn test_console_render() {
        let callback = ConsoleProgressCallback::new("cut");
        assert_eq!(callback.render(0.5), "cut [##########----------]  50.0%");
    }

    #[test]
    fn test_json_event_shape() {
        let callback = JsonProgressCallback::new("load");
        let event = callback.event(1.0);
        assert_eq!(event["operation"], "load");
        assert_eq!(event["fraction"], 1.0);
    }
}
