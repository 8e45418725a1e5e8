use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Process-wide run counters.
///
/// Lock-free, updated with relaxed ordering from every worker
/// and reported once when the process finishes.
#[derive(Default)]
pub struct RuntimeMetrics {
    pub runs_started: AtomicUsize,
    pub runs_completed: AtomicUsize,

    // Disconnected, idle or failed to connect
    pub runs_incomplete: AtomicUsize,

    pub frames_received: AtomicUsize,
    pub batches_posted: AtomicUsize,
}

impl RuntimeMetrics {
    /// One-line summary in the `[METRICS] key=value` format.
    pub fn summary(&self) -> String {
        format!(
            "[METRICS] started={} completed={} incomplete={} frames={} batches={}",
            self.runs_started.load(Ordering::Relaxed),
            self.runs_completed.load(Ordering::Relaxed),
            self.runs_incomplete.load(Ordering::Relaxed),
            self.frames_received.load(Ordering::Relaxed),
            self.batches_posted.load(Ordering::Relaxed),
        )
    }
}

/// Global metrics registry (singleton)
pub static METRICS: Lazy<Arc<RuntimeMetrics>> =
    Lazy::new(|| Arc::new(RuntimeMetrics::default()));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_reports_every_counter() {
        let m = RuntimeMetrics::default();
        m.runs_started.fetch_add(2, Ordering::Relaxed);
        m.frames_received.fetch_add(7, Ordering::Relaxed);

        assert_eq!(
            m.summary(),
            "[METRICS] started=2 completed=0 incomplete=0 frames=7 batches=0"
        );
    }
}
