// zonepace - frame-paced chunked execution across a UI synchronization boundary
//
// This is the library crate containing the boundary controller, the chunked
// scheduler and the observable state they publish into.
// The binary crate (main.rs) drives one run in the terminal.

pub mod boundary;
pub mod config;
pub mod host;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod scheduler;
pub mod state;

// Re-export commonly used types for convenience
pub use boundary::{BoundaryController, HookId, SyncEvent, SyncHook};
pub use config::ConfigManager;
pub use metrics::Metrics;
pub use models::{AppConfig, ProgressReport, RunPhase, SchedulerConfig, TaskState, ViewState};
pub use scheduler::{ChunkedScheduler, RunOutcome, SchedulerError, StepOutcome};
pub use state::{StateChange, StateManager};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
