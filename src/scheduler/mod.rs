//! Chunked scheduler - frame-paced execution of a fixed workload.
//!
//! The scheduler owns the [`TaskState`] of one run and advances it one unit of
//! work per frame. All of that happens outside the synchronization boundary;
//! the scheduler only crosses back in through
//! [`BoundaryController::run_inside`] at fixed checkpoints and once at
//! completion, so a run of `total` units triggers
//! `ceil(total / checkpoint_every)` synchronization cycles instead of `total`.
//!
//! # Lifecycle
//!
//! ```text
//! start() ──► step() … step() ──► Completed
//!               │   every K units: checkpoint callback (inside)
//!               │   last unit:     completion callback (inside)
//!               ├─► cancellation token set ──► Cancelled
//!               ├─► handler error or panic ──► Failed
//!               └─► driver unwinds / dropped ──► Failed
//! ```
//!
//! # Drivers
//!
//! - [`ChunkedScheduler::run`] / [`ChunkedScheduler::drive`]: async, paced by a
//!   [`FrameSource`], cancellable through a `watch` channel
//! - [`ChunkedScheduler::run_to_completion`]: synchronous, no pacing
//! - [`ChunkedScheduler::step`]: one unit at a time, for hosts with their own
//!   event loop and for tests

pub mod frames;

pub use frames::{FrameSource, IntervalFrames, UnpacedFrames};

use crate::boundary::BoundaryController;
use crate::metrics::Metrics;
use crate::models::{ProgressReport, RunPhase, SchedulerConfig, TaskState};
use crate::state::StateManager;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

/// Error type returned by checkpoint handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while scheduling a run
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Invalid scheduler configuration: {0}")]
    InvalidConfig(String),

    #[error("A run is already in progress")]
    AlreadyRunning,

    #[error("No run is in progress")]
    NotRunning,

    #[error("Checkpoint handler failed at iteration {iteration}: {source}")]
    CheckpointFailed {
        iteration: u64,
        #[source]
        source: HandlerError,
    },
}

/// Called inside the boundary at every checkpoint and at completion.
///
/// Returning an error fails the run: loading is cleared, progress stops and
/// the error is surfaced as [`SchedulerError::CheckpointFailed`]. A panic is
/// caught and handled the same way.
#[cfg_attr(test, mockall::automock)]
pub trait CheckpointHandler: Send {
    fn on_checkpoint(&mut self, report: &ProgressReport) -> Result<(), HandlerError>;
}

/// Result of a single [`ChunkedScheduler::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Plain unit of work, nothing published
    Advanced { iteration: u64 },

    /// Progress was published at a checkpoint
    Checkpoint(ProgressReport),

    /// The last unit ran and the completion callback finished the run
    Completed(ProgressReport),
}

/// How a driven run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Completed { total: u64 },
    Cancelled { at_iteration: u64 },
}

/// Frame-paced executor for one fixed-size workload
///
/// A scheduler holds the state of a single run. Starting it while it (or any
/// other scheduler publishing into the same [`StateManager`]) is running fails
/// with [`SchedulerError::AlreadyRunning`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use zonepace::{BoundaryController, ChunkedScheduler, RunOutcome, StateManager};
/// use zonepace::models::SchedulerConfig;
///
/// let state = Arc::new(StateManager::new());
/// let mut scheduler = ChunkedScheduler::new(
///     SchedulerConfig::new(10, 5),
///     BoundaryController::new(),
///     Arc::clone(&state),
/// )?;
///
/// assert_eq!(scheduler.run_to_completion()?, RunOutcome::Completed { total: 10 });
/// assert_eq!(state.snapshot().progress, 100);
/// # Ok::<(), zonepace::SchedulerError>(())
/// ```
pub struct ChunkedScheduler {
    config: SchedulerConfig,
    task: TaskState,
    boundary: BoundaryController,
    state: Arc<StateManager>,
    handler: Option<Box<dyn CheckpointHandler>>,
    metrics: Option<Arc<Metrics>>,
}

impl ChunkedScheduler {
    /// Create a scheduler, rejecting invalid configurations up front.
    pub fn new(
        config: SchedulerConfig,
        boundary: BoundaryController,
        state: Arc<StateManager>,
    ) -> Result<Self, SchedulerError> {
        config.validate()?;

        Ok(Self {
            task: TaskState::new(config.total),
            config,
            boundary,
            state,
            handler: None,
            metrics: None,
        })
    }

    /// Run `handler` inside the boundary at every checkpoint and at completion.
    pub fn with_handler<H>(mut self, handler: H) -> Self
    where
        H: CheckpointHandler + 'static,
    {
        self.handler = Some(Box::new(handler));
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn task(&self) -> &TaskState {
        &self.task
    }

    pub fn boundary(&self) -> &BoundaryController {
        &self.boundary
    }

    pub fn is_running(&self) -> bool {
        self.task.running
    }

    /// Begin a run: reset the counter, set loading and announce the start.
    ///
    /// # Errors
    ///
    /// [`SchedulerError::AlreadyRunning`] if this scheduler is mid-run or the
    /// shared state is still loading for another run.
    pub fn start(&mut self) -> Result<(), SchedulerError> {
        if self.task.running {
            if self.state.is_loading() {
                tracing::warn!(
                    "Run requested while iteration {} is in progress",
                    self.task.iteration
                );
                return Err(SchedulerError::AlreadyRunning);
            }
            // The previous run unwound and was already marked failed
            tracing::warn!(
                "Restarting after a run that stopped at iteration {}",
                self.task.iteration
            );
            self.task.running = false;
        }

        if self.state.try_begin_run(self.task.total).is_none() {
            tracing::warn!("Run requested while another run holds the view state");
            return Err(SchedulerError::AlreadyRunning);
        }

        self.task.begin();

        tracing::info!(
            "Run started: {} units, checkpoint every {}",
            self.task.total,
            self.config.checkpoint_every
        );
        Ok(())
    }

    /// Perform one unit of work.
    ///
    /// Recomputes the boundary status after the unit, then runs the
    /// checkpoint callback on a multiple of `checkpoint_every` or the
    /// completion callback on the last unit. Never both on the same unit.
    pub fn step(&mut self) -> Result<StepOutcome, SchedulerError> {
        if !self.task.running {
            return Err(SchedulerError::NotRunning);
        }

        let iteration = self.task.advance();
        std::hint::black_box(iteration);
        self.record(Metrics::record_unit);

        self.state
            .set_inside_boundary(self.boundary.is_inside_boundary());
        tracing::trace!("Unit {}/{} done", iteration, self.task.total);

        if self.task.is_complete() {
            return self.complete().map(StepOutcome::Completed);
        }

        if self.task.is_checkpoint(self.config.checkpoint_every) {
            return self.checkpoint().map(StepOutcome::Checkpoint);
        }

        Ok(StepOutcome::Advanced { iteration })
    }

    /// Stop the active run and mark it cancelled.
    pub fn cancel(&mut self) -> Result<RunOutcome, SchedulerError> {
        if !self.task.running {
            return Err(SchedulerError::NotRunning);
        }

        let at_iteration = self.task.iteration;
        let boundary = self.boundary.clone();
        boundary.run_inside(|| {
            self.task.running = false;
            self.state
                .set_inside_boundary(boundary.is_inside_boundary());
            self.state.finish_run(RunPhase::Cancelled, None);
        });
        self.record(Metrics::record_run_cancelled);

        tracing::warn!("Run cancelled at iteration {}/{}", at_iteration, self.task.total);
        Ok(RunOutcome::Cancelled { at_iteration })
    }

    /// Start a run and drive it to the end.
    pub async fn run<F>(
        &mut self,
        frames: &mut F,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunOutcome, SchedulerError>
    where
        F: FrameSource + Send,
    {
        self.start()?;
        self.drive(frames, cancel).await
    }

    /// Drive an already started run, one unit per frame.
    ///
    /// The whole loop runs under a single outside-boundary scope. The
    /// cancellation token is checked once per unit of work; a pending
    /// cancellation wins over the next unit.
    pub async fn drive<F>(
        &mut self,
        frames: &mut F,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunOutcome, SchedulerError>
    where
        F: FrameSource + Send,
    {
        if !self.task.running {
            return Err(SchedulerError::NotRunning);
        }

        let unfinished = UnfinishedRun::arm(&self.state, &self.metrics);
        let boundary = self.boundary.clone();
        let result = boundary
            .run_outside_async(self.drive_frames(frames, cancel))
            .await;
        unfinished.disarm();
        result
    }

    async fn drive_frames<F>(
        &mut self,
        frames: &mut F,
        cancel: watch::Receiver<bool>,
    ) -> Result<RunOutcome, SchedulerError>
    where
        F: FrameSource + Send,
    {
        loop {
            let cancelled = *cancel.borrow();
            if cancelled {
                return self.cancel();
            }

            match self.step()? {
                StepOutcome::Completed(_) => {
                    return Ok(RunOutcome::Completed {
                        total: self.task.total,
                    });
                }
                StepOutcome::Checkpoint(_) => {
                    if let Some(pause) = self.config.checkpoint_pause() {
                        tokio::time::sleep(pause).await;
                    }
                }
                StepOutcome::Advanced { .. } => {}
            }

            frames.next_frame().await;
        }
    }

    /// Start a run and execute every unit immediately, without pacing.
    pub fn run_to_completion(&mut self) -> Result<RunOutcome, SchedulerError> {
        self.start()?;

        let unfinished = UnfinishedRun::arm(&self.state, &self.metrics);
        let boundary = self.boundary.clone();
        let result = boundary.run_outside(|| {
            loop {
                if let StepOutcome::Completed(_) = self.step()? {
                    return Ok(RunOutcome::Completed {
                        total: self.task.total,
                    });
                }
            }
        });
        unfinished.disarm();
        result
    }

    fn checkpoint(&mut self) -> Result<ProgressReport, SchedulerError> {
        let report = self.task.report();
        let boundary = self.boundary.clone();

        boundary.run_inside(|| {
            self.notify_handler(&report)?;

            self.state.publish_progress(&report);
            self.state
                .set_inside_boundary(boundary.is_inside_boundary());
            self.record(Metrics::record_checkpoint);

            tracing::debug!(
                "Checkpoint at {}/{}: {}%",
                report.iteration,
                report.total,
                report.percent
            );
            Ok(report)
        })
    }

    fn complete(&mut self) -> Result<ProgressReport, SchedulerError> {
        let report = ProgressReport::complete(self.task.total);
        let boundary = self.boundary.clone();

        boundary.run_inside(|| {
            self.notify_handler(&report)?;

            self.task.running = false;
            self.state.publish_progress(&report);
            self.state
                .set_inside_boundary(boundary.is_inside_boundary());
            self.state.finish_run(RunPhase::Completed, None);
            self.record(Metrics::record_checkpoint);
            self.record(Metrics::record_run_completed);

            tracing::info!("Run completed: {} units", report.total);
            Ok(report)
        })
    }

    /// Hand `report` to the handler; on error fail the run while still inside.
    fn notify_handler(&mut self, report: &ProgressReport) -> Result<(), SchedulerError> {
        let Some(handler) = self.handler.as_mut() else {
            return Ok(());
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.on_checkpoint(report)))
            .unwrap_or_else(|payload| Err(panic_message(payload.as_ref()).into()));

        if let Err(source) = outcome {
            tracing::error!(
                "Checkpoint handler failed at iteration {}: {}",
                report.iteration,
                source
            );

            self.task.running = false;
            self.state
                .finish_run(RunPhase::Failed, Some(source.to_string()));
            self.record(Metrics::record_run_failed);

            return Err(SchedulerError::CheckpointFailed {
                iteration: report.iteration,
                source,
            });
        }

        Ok(())
    }

    fn record(&self, counter: fn(&Metrics)) {
        if let Some(metrics) = &self.metrics {
            counter(metrics);
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic payload".to_string());
    format!("checkpoint handler panicked: {}", detail)
}

/// Fails the run if its driver unwinds or is dropped before a terminal phase.
///
/// Armed for the duration of `drive` / `run_to_completion`; a run that ends
/// normally disarms it.
struct UnfinishedRun {
    state: Arc<StateManager>,
    metrics: Option<Arc<Metrics>>,
    armed: bool,
}

impl UnfinishedRun {
    fn arm(state: &Arc<StateManager>, metrics: &Option<Arc<Metrics>>) -> Self {
        Self {
            state: Arc::clone(state),
            metrics: metrics.clone(),
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for UnfinishedRun {
    fn drop(&mut self) {
        if !self.armed || !self.state.is_loading() {
            return;
        }

        tracing::error!("Run stopped before reaching a terminal phase");
        self.state.finish_run(
            RunPhase::Failed,
            Some("run stopped before finishing".to_string()),
        );
        if let Some(metrics) = &self.metrics {
            metrics.record_run_failed();
        }
    }
}
