//! Integration tests for layered configuration loading
//!
//! Each test uses its own environment prefix so tests running in parallel do
//! not see each other's variables.

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;
use zonepace::models::{AppConfig, SchedulerConfig};
use zonepace::{ConfigManager, SchedulerError};

fn manager(prefix: &str) -> (ConfigManager, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let dir = Utf8PathBuf::try_from(temp_dir.path().join("zonepace-data")).unwrap();
    let manager = ConfigManager::new(&dir).unwrap().with_env_prefix(prefix);
    (manager, temp_dir)
}

#[test]
fn test_config_dir_created() {
    let (manager, _temp_dir) = manager("ZONEPACE_IT_DIR");
    assert!(manager.config_dir().exists());
    assert!(!manager.config_path().exists());
}

#[test]
fn test_partial_file_keeps_defaults() {
    let (manager, _temp_dir) = manager("ZONEPACE_IT_PARTIAL");
    fs::write(
        manager.config_path(),
        "scheduler:\n  total: 1200\nlogging:\n  console: false\n",
    )
    .unwrap();

    let config = manager.load_app_config().unwrap();

    assert_eq!(config.scheduler.total, 1200);
    assert_eq!(config.scheduler.checkpoint_every, 500);
    assert_eq!(config.scheduler.frame_rate, 60);
    assert!(!config.logging.console);
    assert_eq!(config.logging.log_prefix, "zonepace");
}

#[test]
fn test_environment_overrides_file() {
    let (manager, _temp_dir) = manager("ZONEPACE_IT_ENV");
    fs::write(
        manager.config_path(),
        "scheduler:\n  total: 1200\n  checkpoint_every: 100\n",
    )
    .unwrap();

    // SAFETY: the variables use a prefix no other test reads
    unsafe {
        std::env::set_var("ZONEPACE_IT_ENV_SCHEDULER__CHECKPOINT_EVERY", "300");
        std::env::set_var("ZONEPACE_IT_ENV_LOGGING__DEBUG_MODE", "true");
    }

    let config = manager.load_app_config().unwrap();

    assert_eq!(config.scheduler.total, 1200);
    assert_eq!(config.scheduler.checkpoint_every, 300);
    assert!(config.logging.debug_mode);
}

#[test]
fn test_saved_config_round_trips_through_loader() {
    let (manager, _temp_dir) = manager("ZONEPACE_IT_SAVE");

    let config = AppConfig {
        scheduler: SchedulerConfig {
            frame_rate: 120,
            checkpoint_pause_ms: 300,
            ..SchedulerConfig::new(42, 7)
        },
        ..AppConfig::default()
    };
    manager.save_app_config(&config).unwrap();

    assert!(manager.config_path().exists());
    assert_eq!(manager.load_app_config().unwrap(), config);
}

#[test]
fn test_loaded_config_still_validated() {
    let (manager, _temp_dir) = manager("ZONEPACE_IT_INVALID");
    fs::write(manager.config_path(), "scheduler:\n  checkpoint_every: 0\n").unwrap();

    // Loading accepts the value, the scheduler rejects it
    let config = manager.load_app_config().unwrap();

    assert!(matches!(
        config.scheduler.validate(),
        Err(SchedulerError::InvalidConfig(_))
    ));
}
