//! Unit tests for configuration loading and graceful degradation
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate PHOTOBLUR_CONFIG are marked with #[serial].

use photoblur_common::config::{TomlConfig, CONFIG_ENV_VAR};
use photoblur_common::{Error, Intensity};
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp config");
    file.write_all(content.as_bytes()).expect("write temp config");
    file
}

#[test]
fn test_defaults() {
    let config = TomlConfig::default();
    assert_eq!(config.debounce_ms, 1000);
    assert_eq!(config.background_intensity, Intensity::saturating(40));
    assert_eq!(config.initial_intensity, Intensity::ZERO);
    assert_eq!(config.logging.level, "info");
    assert!(config.logging.file.is_none());
    config.validate().expect("defaults are valid");
}

#[test]
fn test_partial_file_keeps_defaults() {
    let config = TomlConfig::parse(
        r#"
        debounce_ms = 250

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.debounce_ms, 250);
    assert_eq!(config.background_intensity.value(), 40);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_rejects_out_of_range_intensity() {
    let result = TomlConfig::parse("background_intensity = 140");
    assert!(matches!(result, Err(Error::Toml(_))));
}

#[test]
fn test_rejects_zero_debounce() {
    let result = TomlConfig::parse("debounce_ms = 0");
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
fn test_rejects_unknown_keys() {
    assert!(TomlConfig::parse("blur_radius = 3").is_err());
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    let cli = write_config("debounce_ms = 10");
    let from_env = write_config("debounce_ms = 20");
    env::set_var(CONFIG_ENV_VAR, from_env.path());

    let config = TomlConfig::resolve(Some(cli.path()), CONFIG_ENV_VAR).unwrap();
    assert_eq!(config.debounce_ms, 10);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    let from_env = write_config("background_intensity = 55");
    env::set_var(CONFIG_ENV_VAR, from_env.path());

    let config = TomlConfig::resolve(None, CONFIG_ENV_VAR).unwrap();
    assert_eq!(config.background_intensity.value(), 55);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_env_file_degrades() {
    env::set_var(CONFIG_ENV_VAR, "/nonexistent/photoblur/config.toml");

    // Falls through to the user config dir or defaults; must not fail
    assert!(TomlConfig::resolve(None, CONFIG_ENV_VAR).is_ok());

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_cli_file_is_error() {
    let result = TomlConfig::resolve(
        Some(std::path::Path::new("/nonexistent/photoblur.toml")),
        CONFIG_ENV_VAR,
    );
    assert!(matches!(result, Err(Error::Config(_))));
}
