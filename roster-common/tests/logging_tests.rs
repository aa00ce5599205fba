//! Tracing initialization tests
//!
//! The global subscriber can be installed once per process, so this file
//! holds a single test.

use roster_common::config::LoggingConfig;
use roster_common::logging::init_tracing;
use tempfile::TempDir;

#[test]
fn test_file_logging_installs_once() {
    let dir = TempDir::new().unwrap();
    let config = LoggingConfig {
        level: "debug".to_string(),
        file: Some(dir.path().join("roster.log")),
    };

    init_tracing(&config).unwrap();
    tracing::info!(test = "logging", "written to file");
    assert!(dir.path().join("roster.log").exists());

    // A second install is reported, not panicked on
    assert!(init_tracing(&LoggingConfig::default()).is_err());
}
