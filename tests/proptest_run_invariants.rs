//! Property-based invariant tests for chunked runs.
//!
//! For any workload size and checkpoint cadence:
//!
//! 1. Published percentages never decrease.
//! 2. The last publication is 100% at the final iteration.
//! 3. One publication per multiple of the cadence below the total, plus completion.
//! 4. One synchronization cycle per publication.
//! 5. Percentages are the rounded share of finished units.

use proptest::prelude::*;
use std::sync::{Arc, Mutex};
use zonepace::models::SchedulerConfig;
use zonepace::scheduler::{CheckpointHandler, HandlerError};
use zonepace::{BoundaryController, ChunkedScheduler, ProgressReport, StateManager};

// ── Helpers ─────────────────────────────────────────────────────────────

fn workload_strategy() -> impl Strategy<Value = (u64, u64)> {
    (1u64..=2_000).prop_flat_map(|total| (Just(total), 1u64..=total + 10))
}

/// Records every report handed to the checkpoint handler
struct Recorder(Arc<Mutex<Vec<(u8, u64)>>>);

impl CheckpointHandler for Recorder {
    fn on_checkpoint(&mut self, report: &ProgressReport) -> Result<(), HandlerError> {
        self.0.lock().unwrap().push((report.percent, report.iteration));
        Ok(())
    }
}

/// Run a workload to completion and collect (percent, iteration) publications.
fn publications(total: u64, every: u64) -> (Vec<(u8, u64)>, u64) {
    let boundary = BoundaryController::new();
    let state = Arc::new(StateManager::new());
    let published = Arc::new(Mutex::new(Vec::new()));

    ChunkedScheduler::new(
        SchedulerConfig::new(total, every),
        boundary.clone(),
        Arc::clone(&state),
    )
    .unwrap()
    .with_handler(Recorder(Arc::clone(&published)))
    .run_to_completion()
    .unwrap();

    // The view holds whatever was published last
    assert_eq!(state.snapshot().progress, 100);

    let published = published.lock().unwrap().clone();
    (published, boundary.sync_cycles())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn percentages_non_decreasing((total, every) in workload_strategy()) {
        let (published, _) = publications(total, every);
        for pair in published.windows(2) {
            prop_assert!(pair[0].0 <= pair[1].0);
            prop_assert!(pair[0].1 < pair[1].1);
        }
    }

    #[test]
    fn completion_is_last((total, every) in workload_strategy()) {
        let (published, _) = publications(total, every);
        prop_assert_eq!(published.last().copied(), Some((100, total)));
        prop_assert_eq!(published.iter().filter(|(_, i)| *i == total).count(), 1);
    }

    #[test]
    fn publication_count((total, every) in workload_strategy()) {
        let (published, _) = publications(total, every);
        prop_assert_eq!(published.len() as u64, (total - 1) / every + 1);
    }

    #[test]
    fn one_sync_per_publication((total, every) in workload_strategy()) {
        let (published, cycles) = publications(total, every);
        prop_assert_eq!(published.len() as u64, cycles);
    }

    #[test]
    fn percent_is_rounded_share(iteration in 0u64..=1_000_000, extra in 0u64..=1_000_000) {
        let total = (iteration + extra).max(1);
        let iteration = iteration.min(total);
        let report = ProgressReport::new(iteration, total);

        let exact = iteration as f64 * 100.0 / total as f64;
        prop_assert!((f64::from(report.percent) - exact).abs() <= 0.5 + f64::EPSILON * 100.0);
        prop_assert!(report.percent <= 100);
    }
}
