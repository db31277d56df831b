// tests/config_loading.rs

use std::error::Error;
use std::fs;
use std::time::Duration;

use tempfile::tempdir;

use taskgraph::{Executor, ExecutorConfig};
use taskgraph::config::{from_toml_str, load_and_validate, load_from_path};
use taskgraph::errors::TaskGraphError;
use taskgraph::logging::LogLevel;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn loads_a_full_config_file() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("taskgraph.toml");
    fs::write(
        &path,
        r#"
[executor]
event_buffer = 16
timeout_ms = 2500

[logging]
level = "debug"
"#,
    )?;

    let cfg = load_and_validate(&path)?;

    assert_eq!(cfg.executor.event_buffer, 16);
    assert_eq!(cfg.executor.timeout_ms, Some(2500));
    assert_eq!(cfg.logging.level, Some(LogLevel::Debug));

    let exec = ExecutorConfig::from(&cfg);
    assert_eq!(exec.event_buffer, 16);
    assert_eq!(exec.timeout, Some(Duration::from_millis(2500)));

    let executor = Executor::new(exec.clone());
    assert_eq!(executor.config(), &exec);
    Ok(())
}

#[test]
fn empty_file_uses_defaults() -> TestResult {
    let cfg = from_toml_str("")?;

    assert_eq!(cfg.executor.event_buffer, 64);
    assert_eq!(cfg.executor.timeout_ms, None);
    assert_eq!(cfg.logging.level, None);
    assert_eq!(ExecutorConfig::from(&cfg), ExecutorConfig::default());
    Ok(())
}

#[test]
fn zero_event_buffer_is_rejected() {
    let err = from_toml_str("[executor]\nevent_buffer = 0\n").unwrap_err();

    match err {
        TaskGraphError::ConfigError(msg) => assert!(msg.contains("event_buffer"), "{msg}"),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_timeout_is_rejected() {
    let err = from_toml_str("[executor]\ntimeout_ms = 0\n").unwrap_err();

    assert!(matches!(err, TaskGraphError::ConfigError(ref msg) if msg.contains("timeout_ms")));
}

#[test]
fn unknown_keys_are_rejected() {
    let err = from_toml_str("[executor]\nworkers = 4\n").unwrap_err();
    assert!(matches!(err, TaskGraphError::TomlError(_)), "{err:?}");

    let err = from_toml_str("[scheduler]\n").unwrap_err();
    assert!(matches!(err, TaskGraphError::TomlError(_)), "{err:?}");
}

#[test]
fn unknown_log_level_is_rejected() {
    let err = from_toml_str("[logging]\nlevel = \"loud\"\n").unwrap_err();
    assert!(matches!(err, TaskGraphError::TomlError(_)), "{err:?}");
}

#[test]
fn raw_load_skips_validation() -> TestResult {
    let dir = tempdir()?;
    let path = dir.path().join("raw.toml");
    fs::write(&path, "[executor]\nevent_buffer = 0\n")?;

    let raw = load_from_path(&path)?;
    assert_eq!(raw.executor.event_buffer, 0);
    assert!(load_and_validate(&path).is_err());
    Ok(())
}

#[test]
fn missing_file_is_an_io_error() -> TestResult {
    let dir = tempdir()?;
    let err = load_and_validate(dir.path().join("nope.toml")).unwrap_err();

    assert!(matches!(err, TaskGraphError::IoError(_)), "{err:?}");
    Ok(())
}
