//! Run settings resolution
//!
//! Every setting resolves as: command-line flag → environment variable (where
//! one exists) → `[rewrite]` table of the TOML file → built-in default.

use crate::error::{RewriteError, RewriteResult};
use crate::models::CultivarId;
use crate::services::content_client::{
    RetryPolicy, DEFAULT_BASE_BACKOFF, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use crate::services::pipeline::{PipelineConfig, DEFAULT_BATCH_DELAY};
use crate::services::prompt_builder::PromptConfig;
use crate::services::validator::DEFAULT_CATEGORY_KEYWORDS;
use crate::services::DEFAULT_BATCH_SIZE;
use genes_common::config::TomlConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable holding the generator API key
pub const API_KEY_ENV_VAR: &str = "ANTHROPIC_API_KEY";

/// Warning log file name, placed next to the store by default
pub const DEFAULT_WARNING_LOG_NAME: &str = "rewrite_warnings.log";

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub dry_run: bool,
    pub batch_size: Option<usize>,
    pub limit: Option<usize>,
    pub start_id: Option<CultivarId>,
    pub model: Option<String>,
    pub delay_secs: Option<f64>,
    pub api_key: Option<String>,
    pub warning_log: Option<PathBuf>,
    pub max_tokens: Option<u32>,
    pub max_attempts: Option<u32>,
    pub no_examples: bool,
}

/// Fully resolved settings for one invocation
#[derive(Debug, Clone)]
pub struct RewriteSettings {
    pub database_path: PathBuf,
    pub warning_log: PathBuf,
    pub pipeline: PipelineConfig,
    pub retry: RetryPolicy,
    api_key: Option<String>,
}

impl RewriteSettings {
    /// Credential for a live run
    pub fn require_api_key(&self) -> RewriteResult<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            RewriteError::MissingCredential(format!(
                "set {} or pass --api-key (or api_key in the [rewrite] config table)",
                API_KEY_ENV_VAR
            ))
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Resolve and validate settings
pub fn resolve_settings(
    cli: &CliOverrides,
    toml_config: &TomlConfig,
    database_path: PathBuf,
) -> RewriteResult<RewriteSettings> {
    let rewrite = &toml_config.rewrite;

    let batch_size = cli
        .batch_size
        .or(rewrite.batch_size)
        .unwrap_or(DEFAULT_BATCH_SIZE);
    if batch_size == 0 {
        return Err(RewriteError::Config("batch size must be at least 1".to_string()));
    }

    let max_attempts = cli
        .max_attempts
        .or(rewrite.max_attempts)
        .unwrap_or(DEFAULT_MAX_ATTEMPTS);
    if max_attempts == 0 {
        return Err(RewriteError::Config("max attempts must be at least 1".to_string()));
    }

    let max_tokens = cli
        .max_tokens
        .or(rewrite.max_tokens)
        .unwrap_or(DEFAULT_MAX_TOKENS);
    if max_tokens == 0 {
        return Err(RewriteError::Config("max tokens must be at least 1".to_string()));
    }

    let delay_between_batches = match cli.delay_secs.or(rewrite.delay_secs) {
        Some(secs) => seconds_to_duration(secs)?,
        None => DEFAULT_BATCH_DELAY,
    };

    let base_delay = rewrite
        .base_backoff_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_BASE_BACKOFF);

    let model = cli
        .model
        .clone()
        .or_else(|| rewrite.model.clone())
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let category_keywords = rewrite
        .category_keywords
        .clone()
        .unwrap_or_else(|| DEFAULT_CATEGORY_KEYWORDS.iter().map(|k| k.to_string()).collect());

    let warning_log = cli
        .warning_log
        .clone()
        .or_else(|| rewrite.warning_log.clone())
        .unwrap_or_else(|| default_warning_log(&database_path));

    let api_key = resolve_api_key(cli.api_key.as_deref(), toml_config);

    let pipeline = PipelineConfig {
        batch_size,
        start_id: cli.start_id,
        limit: cli.limit,
        model,
        max_tokens,
        delay_between_batches,
        dry_run: cli.dry_run,
        prompt: PromptConfig {
            include_examples: !cli.no_examples,
        },
        category_keywords,
        ..PipelineConfig::default()
    };

    Ok(RewriteSettings {
        database_path,
        warning_log,
        pipeline,
        retry: RetryPolicy {
            max_attempts,
            base_delay,
        },
        api_key,
    })
}

/// API key: `--api-key` → `ANTHROPIC_API_KEY` → TOML `api_key`
///
/// Blank values are skipped at every tier.
pub fn resolve_api_key(cli_arg: Option<&str>, toml_config: &TomlConfig) -> Option<String> {
    let env_key = std::env::var(API_KEY_ENV_VAR).ok();
    let toml_key = toml_config.rewrite.api_key.as_deref();

    let candidates = [
        ("command line", cli_arg),
        ("environment", env_key.as_deref()),
        ("TOML config", toml_key),
    ];
    let mut valid = candidates
        .into_iter()
        .filter(|(_, key)| key.is_some_and(is_valid_key));

    let (source, key) = valid.next()?;
    let shadowed: Vec<&str> = valid.map(|(s, _)| s).collect();
    if !shadowed.is_empty() {
        warn!(
            "API key also set in {}; using {} (highest priority)",
            shadowed.join(", "),
            source
        );
    }
    info!("API key loaded from {}", source);

    key.map(|k| k.trim().to_string())
}

/// Non-empty, non-whitespace
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

fn default_warning_log(database_path: &Path) -> PathBuf {
    database_path
        .parent()
        .map(|dir| dir.join(DEFAULT_WARNING_LOG_NAME))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_WARNING_LOG_NAME))
}

fn seconds_to_duration(secs: f64) -> RewriteResult<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        return Err(RewriteError::Config(format!(
            "delay must be a finite number of seconds >= 0, got {}",
            secs
        )));
    }
    Duration::try_from_secs_f64(secs)
        .map_err(|e| RewriteError::Config(format!("delay {} out of range: {}", secs, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(cli: &CliOverrides, toml: &TomlConfig) -> RewriteResult<RewriteSettings> {
        resolve_settings(cli, toml, PathBuf::from("/srv/genes/genes.db"))
    }

    #[test]
    fn test_defaults() {
        let settings = resolve(&CliOverrides::default(), &TomlConfig::default()).unwrap();

        assert_eq!(settings.pipeline.batch_size, 5);
        assert_eq!(settings.pipeline.model, DEFAULT_MODEL);
        assert_eq!(settings.pipeline.max_tokens, 4096);
        assert_eq!(settings.pipeline.delay_between_batches, Duration::from_secs(2));
        assert!(settings.pipeline.prompt.include_examples);
        assert_eq!(settings.retry, RetryPolicy::default());
        assert_eq!(
            settings.warning_log,
            PathBuf::from("/srv/genes/rewrite_warnings.log")
        );
    }

    #[test]
    fn test_cli_beats_toml() {
        let toml = genes_common::config::parse_toml_config(
            r#"
            [rewrite]
            model = "toml-model"
            batch_size = 8
            delay_secs = 0.5
            max_attempts = 5
            base_backoff_ms = 100
            warning_log = "/var/log/genes/warnings.log"
            category_keywords = ["higo"]
            "#,
        )
        .unwrap();

        let from_toml = resolve(&CliOverrides::default(), &toml).unwrap();
        assert_eq!(from_toml.pipeline.model, "toml-model");
        assert_eq!(from_toml.pipeline.batch_size, 8);
        assert_eq!(from_toml.pipeline.delay_between_batches, Duration::from_millis(500));
        assert_eq!(from_toml.retry.max_attempts, 5);
        assert_eq!(from_toml.retry.base_delay, Duration::from_millis(100));
        assert_eq!(from_toml.pipeline.category_keywords, vec!["higo".to_string()]);
        assert_eq!(from_toml.warning_log, PathBuf::from("/var/log/genes/warnings.log"));

        let cli = CliOverrides {
            model: Some("cli-model".to_string()),
            batch_size: Some(2),
            delay_secs: Some(0.0),
            max_attempts: Some(1),
            no_examples: true,
            ..Default::default()
        };
        let from_cli = resolve(&cli, &toml).unwrap();
        assert_eq!(from_cli.pipeline.model, "cli-model");
        assert_eq!(from_cli.pipeline.batch_size, 2);
        assert!(from_cli.pipeline.delay_between_batches.is_zero());
        assert_eq!(from_cli.retry.max_attempts, 1);
        assert!(!from_cli.pipeline.prompt.include_examples);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let toml = TomlConfig::default();
        for cli in [
            CliOverrides {
                batch_size: Some(0),
                ..Default::default()
            },
            CliOverrides {
                max_attempts: Some(0),
                ..Default::default()
            },
            CliOverrides {
                max_tokens: Some(0),
                ..Default::default()
            },
            CliOverrides {
                delay_secs: Some(-1.0),
                ..Default::default()
            },
            CliOverrides {
                delay_secs: Some(f64::NAN),
                ..Default::default()
            },
            CliOverrides {
                delay_secs: Some(f64::INFINITY),
                ..Default::default()
            },
        ] {
            assert!(
                matches!(resolve(&cli, &toml), Err(RewriteError::Config(_))),
                "{:?} should be rejected",
                cli
            );
        }
    }

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("sk-ant-123"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key("   "));
    }
}
