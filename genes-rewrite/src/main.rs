//! genes-rewrite - regenerate cultivar prose fields
//!
//! Selects cultivars whose tagline is still empty, asks the generator for a
//! tagline, description and notes in batches, and commits each batch in one
//! transaction. Re-running always resumes at the first incomplete record.

use anyhow::Result;
use clap::Parser;
use genes_common::config::{load_toml_config, resolve_database_path};
use genes_common::db::{init_database, OpenMode};
use genes_rewrite::config::{resolve_settings, CliOverrides};
use genes_rewrite::services::{AnthropicApi, ContentApi, ContentClient, WarningSink};
use genes_rewrite::{RewriteError, RewritePipeline, RunContext};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};

/// Command-line arguments for genes-rewrite
#[derive(Parser, Debug)]
#[command(name = "genes-rewrite")]
#[command(about = "Rewrite cultivar tagline, description and notes with a generative model")]
#[command(version)]
struct Args {
    /// Build prompts and show them without calling the API or writing
    #[arg(long)]
    dry_run: bool,

    /// Cultivars per API call (default 5)
    #[arg(long)]
    batch_size: Option<usize>,

    /// Process at most N cultivars (0 = all)
    #[arg(long)]
    limit: Option<usize>,

    /// Start from this cultivar id
    #[arg(long)]
    start_id: Option<i64>,

    /// Generator model identifier
    #[arg(long)]
    model: Option<String>,

    /// Seconds to wait between API calls (default 2)
    #[arg(long)]
    delay: Option<f64>,

    /// API key (otherwise ANTHROPIC_API_KEY, then the config file)
    #[arg(long)]
    api_key: Option<String>,

    /// Path to genes.db (otherwise GENES_DATABASE, then the config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Bootstrap TOML file (default ~/.config/genes/genes.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Warning log file (default rewrite_warnings.log next to the database)
    #[arg(long)]
    warning_log: Option<PathBuf>,

    /// Maximum output tokens per API call (default 4096)
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Attempts per batch on transient API errors (default 3)
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Leave the built-in reference examples out of the prompt
    #[arg(long)]
    no_examples: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            dry_run: self.dry_run,
            batch_size: self.batch_size,
            limit: self.limit,
            start_id: self.start_id,
            model: self.model.clone(),
            delay_secs: self.delay,
            api_key: self.api_key.clone(),
            warning_log: self.warning_log.clone(),
            max_tokens: self.max_tokens,
            max_attempts: self.max_attempts,
            no_examples: self.no_examples,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let toml_config = load_toml_config(args.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .init();

    info!("Starting genes-rewrite {}", genes_rewrite::build_info());

    let database_path = resolve_database_path(args.database.as_deref(), &toml_config);
    let settings = resolve_settings(&args.overrides(), &toml_config, database_path)?;
    info!("Database: {}", settings.database_path.display());

    let client = if settings.pipeline.dry_run {
        info!("Dry run: no API calls, no writes");
        None
    } else {
        let api = AnthropicApi::new(settings.require_api_key()?)?;
        info!(
            model = %settings.pipeline.model,
            max_attempts = settings.retry.max_attempts,
            "Using {} API",
            api.provider_name()
        );
        Some(ContentClient::new(Arc::new(api), settings.retry))
    };

    let pool = init_database(&settings.database_path, OpenMode::ReadWrite)
        .await
        .map_err(RewriteError::store)?;

    let mut ctx = RunContext::new(WarningSink::to_file(settings.warning_log.clone()));
    let pipeline = RewritePipeline::new(pool.clone(), settings.pipeline.clone(), client)?;

    let result = pipeline.run(&mut ctx).await;
    pool.close().await;

    match result {
        Ok(summary) => {
            println!();
            for line in summary.lines() {
                println!("{}", line);
            }
            info!(run_id = %summary.run_id, "Run complete");
            Ok(())
        }
        Err(e) => {
            error!(run_id = %ctx.run_id, error = %e, "Run aborted");
            println!();
            for line in ctx.summary(settings.pipeline.dry_run, false).lines() {
                println!("{}", line);
            }
            if let Some(cursor) = ctx.resume_cursor {
                println!(
                    "Batches up to id {} are committed. Resume with --start-id {}",
                    cursor,
                    cursor + 1
                );
            }
            Err(e.into())
        }
    }
}
