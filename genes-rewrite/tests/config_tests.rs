//! Credential resolution tests
//!
//! Tests that manipulate ANTHROPIC_API_KEY are marked with #[serial]
//! so they run sequentially, not in parallel.

use genes_common::config::{parse_toml_config, TomlConfig};
use genes_rewrite::config::{resolve_api_key, resolve_settings, CliOverrides, API_KEY_ENV_VAR};
use genes_rewrite::RewriteError;
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn toml_with_key(key: &str) -> TomlConfig {
    parse_toml_config(&format!("[rewrite]\napi_key = \"{}\"\n", key)).unwrap()
}

#[test]
#[serial]
fn test_cli_key_wins_over_env_and_toml() {
    env::set_var(API_KEY_ENV_VAR, "env-key");

    let key = resolve_api_key(Some("cli-key"), &toml_with_key("toml-key"));
    assert_eq!(key.as_deref(), Some("cli-key"));

    env::remove_var(API_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_env_key_wins_over_toml() {
    env::set_var(API_KEY_ENV_VAR, "env-key");

    let key = resolve_api_key(None, &toml_with_key("toml-key"));
    assert_eq!(key.as_deref(), Some("env-key"));

    env::remove_var(API_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_toml_key_used_last() {
    env::remove_var(API_KEY_ENV_VAR);

    let key = resolve_api_key(None, &toml_with_key("toml-key"));
    assert_eq!(key.as_deref(), Some("toml-key"));
}

#[test]
#[serial]
fn test_blank_keys_skipped() {
    env::set_var(API_KEY_ENV_VAR, "   ");

    let key = resolve_api_key(Some(""), &toml_with_key("toml-key"));
    assert_eq!(key.as_deref(), Some("toml-key"));

    let none = resolve_api_key(Some(" "), &TomlConfig::default());
    assert_eq!(none, None);

    env::remove_var(API_KEY_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_key_is_missing_credential() {
    env::remove_var(API_KEY_ENV_VAR);

    let settings = resolve_settings(
        &CliOverrides::default(),
        &TomlConfig::default(),
        PathBuf::from("/srv/genes/genes.db"),
    )
    .unwrap();

    assert!(!settings.has_api_key());
    assert!(matches!(
        settings.require_api_key(),
        Err(RewriteError::MissingCredential(_))
    ));
}

#[test]
#[serial]
fn test_dry_run_settings_resolve_without_key() {
    env::remove_var(API_KEY_ENV_VAR);

    let cli = CliOverrides {
        dry_run: true,
        limit: Some(0),
        ..Default::default()
    };
    let settings =
        resolve_settings(&cli, &TomlConfig::default(), PathBuf::from("genes.db")).unwrap();

    assert!(settings.pipeline.dry_run);
    assert_eq!(settings.pipeline.limit, Some(0));
    assert_eq!(settings.warning_log, PathBuf::from("rewrite_warnings.log"));
}
