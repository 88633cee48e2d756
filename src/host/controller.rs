// Run Controller - the "start run" command of the view layer
//
// This module contains the RunController which coordinates between:
// - BoundaryController (shared by every run, carries the sync hooks)
// - ChunkedScheduler (one fresh instance per run)
// - StateManager (observable state the view follows)
// - The tokio runtime the paced loop is spawned on
//
// It handles:
// - Starting a run with fail-fast precondition checks
// - Spawning the frame-paced loop
// - Cancellation through a watch channel

use crate::boundary::{BoundaryController, TracingHook};
use crate::metrics::Metrics;
use crate::models::SchedulerConfig;
use crate::scheduler::{ChunkedScheduler, IntervalFrames, RunOutcome, SchedulerError};
use crate::state::{StateChange, StateManager};
use anyhow::{Context, Result};
use std::sync::{Arc, Mutex};
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

type RunTask = JoinHandle<Result<RunOutcome, SchedulerError>>;

/// Host-side controller that starts and cancels runs
///
/// Every run gets its own [`ChunkedScheduler`] (and therefore its own
/// `TaskState`), while the boundary, the view state and the metrics are
/// shared across runs.
///
/// # Example
/// ```ignore
/// let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
/// let controller = RunController::new(
///     SchedulerConfig::default(),
///     Arc::new(StateManager::new()),
///     Arc::new(Metrics::new()),
///     runtime.handle().clone(),
/// )?;
///
/// runtime.block_on(async {
///     controller.start_run()?;
///     controller.wait_for_run().await
/// })?;
/// ```
pub struct RunController {
    config: SchedulerConfig,

    /// Shared by all runs so hooks stay subscribed between runs
    boundary: BoundaryController,

    state_manager: Arc<StateManager>,

    metrics: Arc<Metrics>,

    /// Handle to the tokio runtime the paced loop runs on
    tokio_handle: tokio::runtime::Handle,

    /// Cancellation sender
    /// Send `true` to request cancellation of the active run
    cancel_tx: watch::Sender<bool>,

    /// The spawned loop of the most recent run
    active: Mutex<Option<RunTask>>,
}

impl RunController {
    /// Create a new run controller
    ///
    /// # Arguments
    /// * `config` - Workload shape and pacing, validated here
    /// * `state_manager` - Observable state shared with the view
    /// * `metrics` - Counters, also fed by a sync hook
    /// * `tokio_handle` - Runtime the paced loop is spawned on
    pub fn new(
        config: SchedulerConfig,
        state_manager: Arc<StateManager>,
        metrics: Arc<Metrics>,
        tokio_handle: tokio::runtime::Handle,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        let boundary = BoundaryController::new();
        boundary.subscribe(TracingHook);
        let sync_metrics = Arc::clone(&metrics);
        boundary.subscribe_fn(move |_| sync_metrics.record_sync_cycle());

        let (cancel_tx, _) = watch::channel(false);

        tracing::info!("Run controller initialized");

        Ok(Self {
            config,
            boundary,
            state_manager,
            metrics,
            tokio_handle,
            cancel_tx,
            active: Mutex::new(None),
        })
    }

    /// Start a run and return immediately
    ///
    /// The precondition check happens synchronously: if a run is still
    /// active this fails with [`SchedulerError::AlreadyRunning`] and nothing
    /// is spawned. Progress is observed through [`subscribe()`](Self::subscribe).
    pub fn start_run(&self) -> Result<(), SchedulerError> {
        tracing::info!("Start run requested");

        let mut scheduler = ChunkedScheduler::new(
            self.config.clone(),
            self.boundary.clone(),
            Arc::clone(&self.state_manager),
        )?
        .with_metrics(Arc::clone(&self.metrics));

        scheduler.start()?;

        // Only clear a stale cancellation once this run owns the state
        self.cancel_tx.send_replace(false);
        let cancel_rx = self.cancel_tx.subscribe();
        let frame_interval = self.config.frame_interval();

        let task = self.tokio_handle.spawn(async move {
            let mut frames = IntervalFrames::new(frame_interval);
            let result = scheduler.drive(&mut frames, cancel_rx).await;

            match &result {
                Ok(outcome) => tracing::info!("Run finished: {:?}", outcome),
                Err(e) => tracing::error!("Run error: {}", e),
            }
            result
        });

        let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
        *active = Some(task);
        Ok(())
    }

    /// Request cancellation of the active run
    ///
    /// The loop notices before its next unit of work and finishes the run as
    /// cancelled.
    pub fn request_cancel(&self) {
        tracing::info!("Cancellation requested via watch channel");
        self.cancel_tx.send_replace(true);
    }

    /// Wait for the most recently started run to end
    ///
    /// # Returns
    /// - `Ok(None)` if no run was started since the last wait
    /// - `Ok(Some(outcome))` when the run completed or was cancelled
    /// - `Err(_)` if the run failed or its task panicked
    pub async fn wait_for_run(&self) -> Result<Option<RunOutcome>> {
        let task = {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            active.take()
        };

        let Some(task) = task else {
            return Ok(None);
        };

        let outcome = task.await.context("Run task panicked")??;
        Ok(Some(outcome))
    }

    /// Subscribe to state changes of current and future runs
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_manager.subscribe()
    }

    pub fn state_manager(&self) -> &Arc<StateManager> {
        &self.state_manager
    }

    pub fn boundary(&self) -> &BoundaryController {
        &self.boundary
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }
}
