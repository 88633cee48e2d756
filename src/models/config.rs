use crate::scheduler::SchedulerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Top level configuration loaded from `zonepace.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scheduler: SchedulerConfig,
    pub logging: LoggingSettings,
}

/// Workload shape and pacing for the chunked scheduler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Units of work in one run
    pub total: u64,

    /// Publish progress every N units
    pub checkpoint_every: u64,

    /// Units of work per second when paced by display frames
    pub frame_rate: u32,

    /// Artificial pause after each checkpoint, 0 disables it
    pub checkpoint_pause_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            total: default_total(),
            checkpoint_every: default_checkpoint_every(),
            frame_rate: default_frame_rate(),
            checkpoint_pause_ms: 0,
        }
    }
}

impl SchedulerConfig {
    pub fn new(total: u64, checkpoint_every: u64) -> Self {
        Self {
            total,
            checkpoint_every,
            ..Self::default()
        }
    }

    /// Reject configurations a run could never finish correctly with.
    pub fn validate(&self) -> Result<(), SchedulerError> {
        if self.total == 0 {
            return Err(SchedulerError::InvalidConfig(
                "total must be greater than zero".to_string(),
            ));
        }
        if self.checkpoint_every == 0 {
            return Err(SchedulerError::InvalidConfig(
                "checkpoint_every must be greater than zero".to_string(),
            ));
        }
        if self.frame_rate == 0 {
            return Err(SchedulerError::InvalidConfig(
                "frame_rate must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Time between two units of work.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.frame_rate.max(1)
    }

    pub fn checkpoint_pause(&self) -> Option<Duration> {
        (self.checkpoint_pause_ms > 0).then(|| Duration::from_millis(self.checkpoint_pause_ms))
    }
}

/// Where and how verbosely to log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub log_dir: String,
    pub log_prefix: String,
    pub debug_mode: bool,
    pub console: bool,

    /// Write the log file as JSON lines instead of plain text
    pub json_file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            log_dir: "logs".to_string(),
            log_prefix: "zonepace".to_string(),
            debug_mode: false,
            console: true,
            json_file: false,
        }
    }
}

fn default_total() -> u64 {
    3000
}

fn default_checkpoint_every() -> u64 {
    500
}

fn default_frame_rate() -> u32 {
    60
}
