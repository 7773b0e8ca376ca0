//! Sequential batch driver
//!
//! One batch is selected, prompted, fetched, parsed, matched, validated and
//! committed before the next one starts. The resume cursor moves only after a
//! batch has finished (committed or skipped), so an interrupted run restarts
//! at the first record that is still pending.

use crate::error::{RewriteError, RewriteResult};
use crate::models::{Batch, CultivarId, RunContext, RunSummary};
use crate::services::batcher::{partition, DEFAULT_BATCH_SIZE};
use crate::services::content_client::{
    ContentClient, FetchOutcome, GenerationRequest, DEFAULT_MAX_TOKENS, DEFAULT_MODEL,
};
use crate::services::persistence_writer::{PendingWrite, PersistenceWriter};
use crate::services::prompt_builder::{Prompt, PromptBuilder, PromptConfig};
use crate::services::record_matcher::match_blocks;
use crate::services::response_parser::{parse_blocks, split_segments};
use crate::services::validator::{Validator, DEFAULT_CATEGORY_KEYWORDS};
use crate::services::work_selector::WorkSelector;
use crate::utils::db_retry::DEFAULT_MAX_LOCK_WAIT;
use sqlx::SqlitePool;
use std::time::Duration;

/// Characters of the prompt shown by a dry run
const DRY_RUN_PREVIEW_CHARS: usize = 500;

/// Default pause between consecutive API calls
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_secs(2);

/// Resolved settings for one run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub batch_size: usize,
    pub start_id: Option<CultivarId>,
    /// `None` or `Some(0)` processes every pending record
    pub limit: Option<usize>,
    pub model: String,
    pub max_tokens: u32,
    pub delay_between_batches: Duration,
    /// Build prompts only: no API calls, no writes, no delay
    pub dry_run: bool,
    pub prompt: PromptConfig,
    pub category_keywords: Vec<String>,
    pub max_lock_wait: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            start_id: None,
            limit: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            delay_between_batches: DEFAULT_BATCH_DELAY,
            dry_run: false,
            prompt: PromptConfig::default(),
            category_keywords: DEFAULT_CATEGORY_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
            max_lock_wait: DEFAULT_MAX_LOCK_WAIT,
        }
    }
}

/// Rewrite pipeline over one store
pub struct RewritePipeline {
    config: PipelineConfig,
    selector: WorkSelector,
    builder: PromptBuilder,
    client: Option<ContentClient>,
    validator: Validator,
    writer: PersistenceWriter,
}

impl RewritePipeline {
    /// `client` may be `None` only for a dry run
    pub fn new(
        db: SqlitePool,
        config: PipelineConfig,
        client: Option<ContentClient>,
    ) -> RewriteResult<Self> {
        if !config.dry_run && client.is_none() {
            return Err(RewriteError::MissingCredential(
                "a content client is required unless running dry".to_string(),
            ));
        }

        Ok(Self {
            selector: WorkSelector::new(db.clone()),
            builder: PromptBuilder::new(config.prompt.clone()),
            validator: Validator::new(config.category_keywords.clone()),
            writer: PersistenceWriter::new(db, config.max_lock_wait),
            client,
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process every pending record in the selection
    ///
    /// Returns `Err` only for run-ending conditions (`StoreUnavailable`,
    /// `FatalApi`); by then every earlier batch is already committed and
    /// `ctx.resume_cursor` names the last finished record.
    pub async fn run(&self, ctx: &mut RunContext) -> RewriteResult<RunSummary> {
        let limit = self.config.limit.filter(|l| *l > 0);
        let items = self.selector.select(self.config.start_id, limit).await?;
        ctx.stats.selected = items.len();

        tracing::info!(
            run_id = %ctx.run_id,
            selected = items.len(),
            start_id = ?self.config.start_id,
            limit = ?limit,
            dry_run = self.config.dry_run,
            "Selected cultivars needing rewrite"
        );

        if items.is_empty() {
            println!("No cultivars need rewriting.");
            return Ok(ctx.summary(self.config.dry_run, false));
        }

        let batches = partition(items, self.config.batch_size);
        println!(
            "{} cultivars to process in {} batches of {}",
            ctx.stats.selected,
            batches.len(),
            self.config.batch_size.max(1)
        );

        for (index, batch) in batches.iter().enumerate() {
            println!(
                "\nBatch {}/{}: {}",
                batch.number,
                batch.total,
                batch.names().join(", ")
            );
            ctx.stats.batches += 1;

            let prompt = self.builder.build(batch);

            match &self.client {
                Some(client) if !self.config.dry_run => {
                    self.process_batch(client, batch, prompt, ctx).await?;
                }
                _ => {
                    print_dry_run(batch, &prompt);
                    ctx.stats.processed += batch.len();
                }
            }

            if let Some(last_id) = batch.last_id() {
                ctx.advance_cursor(last_id);
            }

            let is_last = index + 1 == batches.len();
            if !is_last && !self.config.dry_run && !self.config.delay_between_batches.is_zero() {
                tokio::time::sleep(self.config.delay_between_batches).await;
            }
        }

        let stopped_early = limit.is_some_and(|l| ctx.stats.selected >= l);
        Ok(ctx.summary(self.config.dry_run, stopped_early))
    }

    async fn process_batch(
        &self,
        client: &ContentClient,
        batch: &Batch,
        prompt: Prompt,
        ctx: &mut RunContext,
    ) -> RewriteResult<()> {
        let request = GenerationRequest {
            model: self.config.model.clone(),
            max_tokens: self.config.max_tokens,
            system: prompt.system,
            prompt: prompt.user,
        };

        let text = match client.fetch(&request).await? {
            FetchOutcome::Completed(text) => text,
            FetchOutcome::Exhausted {
                attempts,
                last_reason,
                ..
            } => {
                println!(
                    "  Batch failed after {} attempts ({}), skipping",
                    attempts, last_reason
                );
                tracing::error!(
                    batch = batch.number,
                    attempts,
                    reason = %last_reason,
                    "Batch skipped, records remain pending"
                );
                ctx.stats.batches_failed += 1;
                return Ok(());
            }
        };

        let (blocks, failures) = split_segments(parse_blocks(&text));
        for failure in &failures {
            tracing::warn!(
                batch = batch.number,
                line = failure.line,
                marker = %failure.marker,
                reason = %failure.reason,
                "Unparseable block marker"
            );
        }
        ctx.stats.parse_failures += failures.len();

        if blocks.is_empty() {
            tracing::warn!(
                batch = batch.number,
                response_chars = text.len(),
                "Response contained no usable blocks"
            );
        }

        let report = match_blocks(batch, blocks);
        ctx.stats.ambiguous_matches += report.ambiguous_count();

        for unmatched in &report.unmatched {
            let hint = match &unmatched.closest {
                Some((name, score)) => format!(" (closest: '{}', similarity {:.2})", name, score),
                None => String::new(),
            };
            println!("  ✗ {}: no matching output", unmatched.name);
            ctx.warnings.record(
                unmatched.item_id,
                &unmatched.name,
                format!("No matching block in response{}", hint),
            );
        }
        ctx.stats.unmatched += report.unmatched.len();

        let mut writes = Vec::with_capacity(report.matched.len());
        let mut outcomes = Vec::with_capacity(report.matched.len());
        for decision in &report.matched {
            let Some(item) = batch.items.iter().find(|i| i.id == decision.item_id) else {
                continue;
            };
            let outcome = self
                .validator
                .validate(item, &decision.block, decision.ambiguous);
            writes.push(PendingWrite::from_block(item.id, &decision.block));
            outcomes.push((item, outcome));
        }

        let commit = self.writer.commit_batch(&writes).await?;
        ctx.stats.fields_written += commit.fields_written;

        for ((item, outcome), write) in outcomes.into_iter().zip(&writes) {
            let persisted = !write.fields.is_empty() && !commit.missing.contains(&item.id);
            if persisted {
                ctx.stats.processed += 1;
            }

            if outcome.is_clean() {
                println!("  ✓ {}", item.name);
                continue;
            }

            if persisted {
                ctx.stats.warned += 1;
            }
            println!("  ⚠ {}: {}", item.name, outcome.warnings.join("; "));
            for warning in outcome.warnings {
                ctx.warnings.record(item.id, &item.name, warning);
            }
        }

        tracing::info!(
            batch = batch.number,
            matched = writes.len(),
            unmatched = report.unmatched.len(),
            records_written = commit.records_updated,
            "Batch committed"
        );

        Ok(())
    }
}

fn print_dry_run(batch: &Batch, prompt: &Prompt) {
    for item in &batch.items {
        println!("  - {} (id={})", item.name, item.id);
    }
    println!("  Prompt length: {} chars", prompt.user.chars().count());
    let preview: String = prompt.user.chars().take(DRY_RUN_PREVIEW_CHARS).collect();
    println!("  Prompt preview:\n{}", preview);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_live_run_requires_client() {
        let pool = sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let result = RewritePipeline::new(pool, PipelineConfig::default(), None);
        assert!(matches!(result, Err(RewriteError::MissingCredential(_))));
    }

    #[tokio::test]
    async fn test_dry_run_needs_no_client() {
        let pool = sqlx::SqlitePool::connect_lazy("sqlite::memory:").unwrap();
        let config = PipelineConfig {
            dry_run: true,
            ..Default::default()
        };
        assert!(RewritePipeline::new(pool, config, None).is_ok());
    }
}
