//! Data models for zonepace.
//!
//! - [`TaskState`]: iteration counter of one run, owned by the scheduler
//! - [`ProgressReport`]: percent published at checkpoints and at completion
//! - [`ViewState`] / [`RunPhase`]: observable outputs exposed to a view
//! - [`AppConfig`], [`SchedulerConfig`], [`LoggingSettings`]: YAML configuration
//!
//! # Architecture Note
//!
//! `TaskState` and `ViewState` are separate types. The scheduler mutates
//! `TaskState` on every unit of work without notifying anyone, while `ViewState`
//! only changes through [`StateManager`](crate::state::StateManager) calls made
//! at checkpoints, at completion and when the boundary status flips.

pub mod config;
pub mod task_state;
pub mod view_state;

pub use config::{AppConfig, LoggingSettings, SchedulerConfig};
pub use task_state::{ProgressReport, TaskState};
pub use view_state::{RunPhase, ViewState};
