//! zonepace - terminal demo of a frame-paced chunked run
//!
//! # Overview
//!
//! Runs the configured workload (3000 units by default) one unit per frame
//! outside the synchronization boundary and prints progress each time the run
//! crosses back in at a checkpoint. It initializes:
//! - Configuration ([`ConfigManager`], `zonepace-data/zonepace.yaml` + `ZONEPACE_*` env)
//! - Logging infrastructure (file rotation + console output on stderr)
//! - A current-thread tokio runtime (one logical thread, cooperative pacing)
//! - State management ([`StateManager`]) and the [`RunController`]
//!
//! # Execution Flow
//!
//! 1. Load configuration
//! 2. Initialize logging → logs/zonepace.<date>
//! 3. Start the run and follow its state changes in the terminal
//! 4. Ctrl-C requests cancellation; the run ends as cancelled
//! 5. Log the metrics summary and shut the runtime down

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use zonepace::host::{ProgressView, RunController};
use zonepace::{APP_NAME, ConfigManager, Metrics, StateManager, VERSION};

fn main() -> Result<()> {
    let config_manager = ConfigManager::new("zonepace-data")?;
    let app_config = config_manager.load_app_config()?;

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = zonepace::logging::setup_logging(&app_config.logging)?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let metrics = Arc::new(Metrics::new());
    let state_manager = Arc::new(StateManager::new().with_metrics(Arc::clone(&metrics)));
    let controller = Arc::new(RunController::new(
        app_config.scheduler.clone(),
        Arc::clone(&state_manager),
        Arc::clone(&metrics),
        runtime.handle().clone(),
    )?);

    let result = runtime.block_on(async {
        let updates = controller.subscribe();
        controller.start_run()?;

        let cancel_on_interrupt = Arc::clone(&controller);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted - cancelling run");
                cancel_on_interrupt.request_cancel();
            }
        });

        let mut view = ProgressView::new(std::io::stdout());
        let phase = view.follow(updates).await?;
        tracing::info!("View finished with phase {:?}", phase);

        controller.wait_for_run().await
    });

    metrics.log_summary();
    runtime.shutdown_timeout(Duration::from_secs(5));

    match result {
        Ok(outcome) => {
            tracing::info!("Application shutdown complete: {:?}", outcome);
            Ok(())
        }
        Err(e) => {
            tracing::error!("Run error: {:#}", e);
            Err(e)
        }
    }
}
