// State management module
//
// This module provides the StateManager which wraps ViewState with thread-safe access
// using Arc<RwLock<T>> and emits change events for the view layer.

use crate::metrics::Metrics;
use crate::models::{ProgressReport, RunPhase, ViewState};
use std::sync::{Arc, RwLock};
use tokio::sync::broadcast;

/// Change events emitted when observable state is published
///
/// These events notify the view about run progress without requiring it to
/// poll. They are only produced by the explicit publishing methods of
/// [`StateManager`], never by the per-unit work of the scheduler.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// A run has started
    RunStarted { total: u64 },

    /// The loading indicator flipped
    LoadingChanged { loading: bool },

    /// Progress was published at a checkpoint or at completion
    ProgressPublished { percent: u8, iteration: u64 },

    /// The live boundary status flipped
    BoundaryChanged { inside: bool },

    /// A run reached a terminal phase
    RunFinished {
        phase: RunPhase,
        error: Option<String>,
    },

    /// State has been reset
    StateReset,
}

/// Thread-safe view state with event emission
///
/// This is the observable side of a run:
/// - Provides thread-safe access to [`ViewState`] via `Arc<RwLock<T>>`
/// - Detects loading, boundary and phase transitions and emits [`StateChange`] events
/// - Supports subscribing to changes via tokio broadcast channels
///
/// # Usage
///
/// The scheduler calls [`try_begin_run()`](Self::try_begin_run),
/// [`publish_progress()`](Self::publish_progress),
/// [`set_inside_boundary()`](Self::set_inside_boundary) and
/// [`finish_run()`](Self::finish_run); a view uses
/// [`snapshot()`](Self::snapshot), [`read()`](Self::read) and
/// [`subscribe()`](Self::subscribe).
pub struct StateManager {
    /// The view state protected by RwLock for thread-safe access
    state: Arc<RwLock<ViewState>>,

    /// Broadcast channel for emitting state change events
    /// Multiple subscribers can listen for state changes
    state_tx: broadcast::Sender<StateChange>,

    metrics: Option<Arc<Metrics>>,
}

impl StateManager {
    /// Create a new StateManager with default state
    ///
    /// # Returns
    /// A new StateManager with a broadcast channel buffer of 100 events
    pub fn new() -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            state: Arc::new(RwLock::new(ViewState::default())),
            state_tx,
            metrics: None,
        }
    }

    /// Count every broadcast in `metrics`
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Get a read-only snapshot of the current state
    pub fn snapshot(&self) -> ViewState {
        self.read(|state| state.clone())
    }

    /// Execute a function with read access to the state
    ///
    /// # Example
    /// ```ignore
    /// let loading = state_manager.read(|state| state.loading);
    /// ```
    pub fn read<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&ViewState) -> R,
    {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        f(&state)
    }

    /// Update the state and emit change events
    ///
    /// This:
    /// 1. Captures the old state
    /// 2. Applies the update function
    /// 3. Detects what changed
    /// 4. Emits appropriate events
    ///
    /// Progress is not diffed; it is announced by [`publish_progress()`](Self::publish_progress).
    ///
    /// # Returns
    /// A vector of StateChange events that were emitted
    pub fn update<F>(&self, update_fn: F) -> Vec<StateChange>
    where
        F: FnOnce(&mut ViewState),
    {
        let changes = {
            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            let old_state = state.clone();

            update_fn(&mut state);

            Self::detect_changes(&old_state, &state)
        };

        for change in &changes {
            self.emit(change.clone());
        }

        changes
    }

    /// Subscribe to state change events
    ///
    /// Returns a receiver that will get notified of all future state changes.
    /// Multiple subscribers can listen simultaneously.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }

    /// Detect what changed between two states and generate events
    fn detect_changes(old: &ViewState, new: &ViewState) -> Vec<StateChange> {
        let mut changes = Vec::new();

        if old.phase != new.phase && new.phase == RunPhase::Running {
            changes.push(StateChange::RunStarted { total: new.total });
        }

        if old.loading != new.loading {
            changes.push(StateChange::LoadingChanged {
                loading: new.loading,
            });
        }

        if old.inside_boundary != new.inside_boundary {
            changes.push(StateChange::BoundaryChanged {
                inside: new.inside_boundary,
            });
        }

        if old.phase != new.phase && new.phase.is_terminal() {
            changes.push(StateChange::RunFinished {
                phase: new.phase,
                error: new.last_error.clone(),
            });
        }

        changes
    }

    fn emit(&self, change: StateChange) {
        // Ignore send errors - it's OK if no one is listening
        let delivered = self.state_tx.send(change).is_ok();
        if let Some(metrics) = &self.metrics {
            if delivered {
                metrics.record_state_broadcast();
            } else {
                metrics.record_state_broadcast_unobserved();
            }
        }
    }

    // Publishing methods used by the scheduler

    /// Mark a run of `total` units as started
    ///
    /// Returns `None` without touching anything if a run is already loading.
    /// The check and the transition happen under one write lock.
    pub fn try_begin_run(&self, total: u64) -> Option<Vec<StateChange>> {
        let mut busy = false;
        let changes = self.update(|state| {
            if state.loading {
                busy = true;
                return;
            }
            state.total = total;
            state.progress = 0;
            state.loading = true;
            state.phase = RunPhase::Running;
            state.last_error = None;
        });

        (!busy).then_some(changes)
    }

    /// Publish a checkpoint or completion report
    pub fn publish_progress(&self, report: &ProgressReport) -> Vec<StateChange> {
        let mut changes = self.update(|state| {
            state.progress = report.percent;
        });

        let event = StateChange::ProgressPublished {
            percent: report.percent,
            iteration: report.iteration,
        };
        self.emit(event.clone());
        changes.push(event);

        changes
    }

    /// Store a freshly queried boundary status
    pub fn set_inside_boundary(&self, inside: bool) -> Vec<StateChange> {
        self.update(|state| {
            state.inside_boundary = inside;
        })
    }

    /// Move the run into a terminal phase and clear the loading indicator
    pub fn finish_run(&self, phase: RunPhase, error: Option<String>) -> Vec<StateChange> {
        debug_assert!(phase.is_terminal(), "finish_run needs a terminal phase");
        self.update(|state| {
            state.loading = false;
            state.phase = phase;
            state.last_error = error;
        })
    }

    /// Reset everything a previous run published
    pub fn reset(&self) -> Vec<StateChange> {
        let mut changes = self.update(ViewState::reset);

        let reset_event = StateChange::StateReset;
        self.emit(reset_event.clone());
        changes.push(reset_event);

        changes
    }

    /// Whether a run currently holds the loading indicator
    pub fn is_loading(&self) -> bool {
        self.read(|state| state.loading)
    }
}

impl Default for StateManager {
    fn default() -> Self {
        Self::new()
    }
}

// Make StateManager cloneable for sharing across tasks
impl Clone for StateManager {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
            state_tx: self.state_tx.clone(),
            metrics: self.metrics.clone(),
        }
    }
}
