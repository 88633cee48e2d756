use std::fmt;

/// Lifecycle of a run as seen by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunPhase {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl RunPhase {
    /// Completed, cancelled and failed runs never advance again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Observable outputs consumed by a view layer.
///
/// The iteration counter is not part of it: it lives in
/// [`TaskState`](crate::models::TaskState), which only the scheduler touches.
/// Everything here changes through the explicit
/// [`StateManager`](crate::state::StateManager) publishing methods.
///
/// # Fields
///
/// - `progress`: percent, updated only at checkpoints and at completion
/// - `loading`: true from run start until the run reaches a terminal phase
/// - `inside_boundary`: last recomputed boundary status, inside until a run
///   first leaves the boundary
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    pub total: u64,
    pub progress: u8,
    pub loading: bool,
    pub inside_boundary: bool,
    pub phase: RunPhase,
    pub last_error: Option<String>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            total: 0,
            progress: 0,
            loading: false,
            inside_boundary: true,
            phase: RunPhase::Idle,
            last_error: None,
        }
    }
}

impl ViewState {
    /// Reset everything a previous run published.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
