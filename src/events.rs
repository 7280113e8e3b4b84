//! Logging and progress reporting for a scan run
//!
//! Every component that reports something receives a `&dyn ScanEvents`
//! explicitly. The default implementation forwards to `tracing`.

use std::error::Error as _;
use crate::error::Error;

/// Sink for leveled log messages and progress updates
///
/// Implementations must be `Sync`: decoding and assembly report from worker
/// threads.
pub trait ScanEvents: Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// A fatal error that ends the run, with what was being done at the time
    fn exception(&self, context: &str, error: &Error) {
        self.error(&format!("{}: {}", context, error));
    }

    /// Overall progress in `[0, 1]`
    fn progress(&self, _fraction: f32) {}
}

/// Forwards messages to `tracing` and progress to an optional callback
#[derive(Default)]
pub struct TracingEvents {
    on_progress: Option<Box<dyn Fn(f32) + Send + Sync>>,
}

impl TracingEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a progress callback (e.g. a progress bar)
    pub fn with_progress(mut self, callback: impl Fn(f32) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(callback));
        self
    }
}

impl ScanEvents for TracingEvents {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!("{}", message);
    }

    fn exception(&self, context: &str, error: &Error) {
        match error.source() {
            Some(cause) => tracing::error!(cause = %cause, "{}: {}", context, error),
            None => tracing::error!("{}: {}", context, error),
        }
    }

    fn progress(&self, fraction: f32) {
        if let Some(ref callback) = self.on_progress {
            callback(fraction.clamp(0.0, 1.0));
        }
    }
}

/// Maps a phase-local fraction onto a sub-range of the overall progress
pub(crate) struct PhaseProgress<'a> {
    events: &'a dyn ScanEvents,
    start: f32,
    span: f32,
}

impl<'a> PhaseProgress<'a> {
    pub(crate) fn new(events: &'a dyn ScanEvents, start: f32, end: f32) -> Self {
        Self { events, start, span: end - start }
    }

    /// Report `done` of `total` units finished within this phase
    pub(crate) fn report(&self, done: usize, total: usize) {
        let local = if total == 0 { 1.0 } else { done as f32 / total as f32 };
        self.events.progress(self.start + self.span * local.min(1.0));
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingEvents;
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_phase_progress_maps_into_range() {
        let events = RecordingEvents::default();
        let phase = PhaseProgress::new(&events, 0.5, 0.9);
        phase.report(0, 4);
        phase.report(2, 4);
        phase.report(4, 4);

        let seen = events.progress.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        assert!((seen[0] - 0.5).abs() < 1e-6);
        assert!((seen[1] - 0.7).abs() < 1e-6);
        assert!((seen[2] - 0.9).abs() < 1e-6);
    }

    struct ErrorsOnly(Mutex<Vec<String>>);

    impl ScanEvents for ErrorsOnly {
        fn info(&self, _message: &str) {}
        fn warn(&self, _message: &str) {}
        fn error(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    #[test]
    fn test_exception_defaults_to_error_level() {
        let events = ErrorsOnly(Mutex::new(Vec::new()));
        events.exception("Packaging failed", &Error::General("disk full".to_string()));
        assert_eq!(*events.0.lock().unwrap(), vec!["Packaging failed: disk full".to_string()]);
    }

    #[test]
    fn test_tracing_events_clamps_progress() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let events = TracingEvents::new().with_progress(move |f| sink.lock().unwrap().push(f));
        events.progress(1.5);
        events.progress(-0.2);
        assert_eq!(*seen.lock().unwrap(), vec![1.0, 0.0]);
    }
}
