// Performance metrics module
//
// Provides lightweight counters showing how often a run crossed the boundary
// compared to how much work it did

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Run metrics
///
/// Uses atomic operations for thread-safe metric tracking without locks.
/// The interesting ratio is `sync_cycles` against `units_processed`: a well
/// paced run synchronizes once per checkpoint, not once per unit.
#[derive(Debug)]
pub struct Metrics {
    /// Units of work performed across all runs
    pub units_processed: AtomicU64,

    /// Progress publications (checkpoints and completions)
    pub checkpoints_published: AtomicU64,

    /// Synchronization cycles observed through the boundary hook
    pub sync_cycles: AtomicU64,

    pub runs_completed: AtomicU64,
    pub runs_cancelled: AtomicU64,
    pub runs_failed: AtomicU64,

    /// Number of state broadcasts delivered to at least one subscriber
    pub state_broadcasts: AtomicU64,

    /// Number of state broadcasts sent while nobody was subscribed
    pub state_broadcasts_unobserved: AtomicU64,

    /// Application start time
    start_time: Instant,
}

impl Metrics {
    /// Create a new Metrics instance
    pub fn new() -> Self {
        Self {
            units_processed: AtomicU64::new(0),
            checkpoints_published: AtomicU64::new(0),
            sync_cycles: AtomicU64::new(0),
            runs_completed: AtomicU64::new(0),
            runs_cancelled: AtomicU64::new(0),
            runs_failed: AtomicU64::new(0),
            state_broadcasts: AtomicU64::new(0),
            state_broadcasts_unobserved: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_unit(&self) {
        self.units_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checkpoint(&self) {
        self.checkpoints_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sync_cycle(&self) {
        self.sync_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_completed(&self) {
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_cancelled(&self) {
        self.runs_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_run_failed(&self) {
        self.runs_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state broadcast
    pub fn record_state_broadcast(&self) {
        self.state_broadcasts.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a state broadcast nobody received
    pub fn record_state_broadcast_unobserved(&self) {
        self.state_broadcasts_unobserved.fetch_add(1, Ordering::Relaxed);
    }

    /// Get total uptime
    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Units of work per synchronization cycle, 0 when nothing synchronized
    pub fn units_per_sync(&self) -> f64 {
        let units = self.units_processed.load(Ordering::Relaxed);
        let cycles = self.sync_cycles.load(Ordering::Relaxed);
        if cycles > 0 {
            units as f64 / cycles as f64
        } else {
            0.0
        }
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Run Metrics Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Runs: {} completed, {} cancelled, {} failed",
            self.runs_completed.load(Ordering::Relaxed),
            self.runs_cancelled.load(Ordering::Relaxed),
            self.runs_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Units: {}, checkpoints: {}, sync cycles: {} ({:.1} units per sync)",
            self.units_processed.load(Ordering::Relaxed),
            self.checkpoints_published.load(Ordering::Relaxed),
            self.sync_cycles.load(Ordering::Relaxed),
            self.units_per_sync()
        );
        tracing::info!(
            "State broadcasts: {} delivered, {} unobserved",
            self.state_broadcasts.load(Ordering::Relaxed),
            self.state_broadcasts_unobserved.load(Ordering::Relaxed)
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = Metrics::new();
        assert_eq!(metrics.units_processed.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.sync_cycles.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_record_run_outcomes() {
        let metrics = Metrics::new();

        metrics.record_run_completed();
        metrics.record_run_completed();
        metrics.record_run_cancelled();
        metrics.record_run_failed();

        assert_eq!(metrics.runs_completed.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.runs_cancelled.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.runs_failed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_units_per_sync() {
        let metrics = Metrics::new();

        for _ in 0..10 {
            metrics.record_unit();
        }
        metrics.record_sync_cycle();
        metrics.record_sync_cycle();

        assert_eq!(metrics.units_per_sync(), 5.0);
    }

    #[test]
    fn test_units_per_sync_without_cycles() {
        let metrics = Metrics::new();
        metrics.record_unit();
        assert_eq!(metrics.units_per_sync(), 0.0);
    }

    #[test]
    fn test_uptime() {
        let metrics = Metrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
