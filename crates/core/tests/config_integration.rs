//! Config loading against real files and the process environment.

use std::fs;

use shelfshare_core::config::ShelfShareConfig;
use shelfshare_core::error::{ConfigError, ShelfShareError};
use tempfile::TempDir;

// =============================================================================
// file loading
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_full_config_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("shelfshare.toml");
    fs::write(
        &path,
        r#"
[general]
log_level = "debug"
log_format = "json"

[remote]
base_url = "https://shelfshare.example/api"
timeout_secs = 5
user_agent = "shelfshare-test"

[cache]
enabled = true
dir = "/tmp/shelfshare-cache"
"#,
    )
    .expect("should write config");

    let config = ShelfShareConfig::load(&path).await.expect("should load");
    assert_eq!(config.general.log_level, "debug");
    assert_eq!(config.general.log_format, "json");
    assert_eq!(config.remote.base_url, "https://shelfshare.example/api");
    assert_eq!(config.remote.timeout_secs, 5);
    assert_eq!(config.cache.dir, "/tmp/shelfshare-cache");
}

#[tokio::test]
async fn load_missing_file_is_file_not_found() {
    let err = ShelfShareConfig::load("/nonexistent/shelfshare.toml")
        .await
        .expect_err("missing file should fail");
    assert!(matches!(
        err,
        ShelfShareError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_or_default_falls_back_when_missing() {
    let config = ShelfShareConfig::load_or_default("/nonexistent/shelfshare.toml")
        .await
        .expect("missing file should yield defaults");
    assert_eq!(config.remote.timeout_secs, 10);
}

#[tokio::test]
async fn load_or_default_still_rejects_malformed_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[remote\nbase_url = ").expect("should write config");

    let result = ShelfShareConfig::load_or_default(&path).await;
    assert!(result.is_err(), "malformed file must not fall back to defaults");
}

#[tokio::test]
#[serial_test::serial]
async fn load_invalid_value_reports_field() {
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("shelfshare.toml");
    fs::write(&path, "[remote]\ntimeout_secs = 0\n").expect("should write config");

    let err = ShelfShareConfig::load(&path)
        .await
        .expect_err("zero timeout should fail");
    assert!(err.to_string().contains("remote.timeout_secs"));
}

// =============================================================================
// environment overrides
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let toml = r#"
[remote]
base_url = "http://from-file:5000/api"
"#;

    let original = std::env::var("SHELFSHARE_REMOTE_BASE_URL").ok();
    // SAFETY: serialized with serial_test, so no other test touches the environment.
    unsafe {
        std::env::set_var("SHELFSHARE_REMOTE_BASE_URL", "http://from-env:5000/api");
    }

    let mut config = ShelfShareConfig::parse(toml).expect("should parse");
    config.apply_env_overrides();
    let result = config.remote.base_url.clone();

    // SAFETY: restore
    unsafe {
        match original {
            Some(val) => std::env::set_var("SHELFSHARE_REMOTE_BASE_URL", val),
            None => std::env::remove_var("SHELFSHARE_REMOTE_BASE_URL"),
        }
    }

    assert_eq!(result, "http://from-env:5000/api");
}

#[test]
#[serial_test::serial]
fn env_override_unparsable_value_is_ignored() {
    let original = std::env::var("SHELFSHARE_REMOTE_TIMEOUT_SECS").ok();
    // SAFETY: serialized with serial_test, so no other test touches the environment.
    unsafe {
        std::env::set_var("SHELFSHARE_REMOTE_TIMEOUT_SECS", "soon");
    }

    let mut config = ShelfShareConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.remote.timeout_secs;

    // SAFETY: restore
    unsafe {
        match original {
            Some(val) => std::env::set_var("SHELFSHARE_REMOTE_TIMEOUT_SECS", val),
            None => std::env::remove_var("SHELFSHARE_REMOTE_TIMEOUT_SECS"),
        }
    }

    assert_eq!(result, 10);
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let original = std::env::var("SHELFSHARE_CACHE_ENABLED").ok();
    // SAFETY: serialized with serial_test, so no other test touches the environment.
    unsafe {
        std::env::set_var("SHELFSHARE_CACHE_ENABLED", "false");
    }

    let mut config = ShelfShareConfig::parse("").expect("should parse");
    config.apply_env_overrides();
    let result = config.cache.enabled;

    // SAFETY: restore
    unsafe {
        match original {
            Some(val) => std::env::set_var("SHELFSHARE_CACHE_ENABLED", val),
            None => std::env::remove_var("SHELFSHARE_CACHE_ENABLED"),
        }
    }

    assert!(!result);
}
