//! Block-to-record matching under name drift
//!
//! Three whole-batch passes in priority order: exact, case-insensitive, then
//! containment. A block consumed by any pass leaves the candidate pool, so no
//! two items can share a block. Item names are compared in their
//! delimiter-safe form, which is what the prompt showed the generator.

use crate::models::{Batch, CultivarId, GeneratedBlock, MatchDecision, MatchStrategy};
use crate::services::prompt_builder::delimiter_safe_name;

/// Item with no block after all passes
#[derive(Debug, Clone, PartialEq)]
pub struct UnmatchedRecord {
    pub item_id: CultivarId,
    pub name: String,
    /// Closest leftover block name and its Jaro-Winkler similarity
    pub closest: Option<(String, f64)>,
}

/// Matcher output for one batch
#[derive(Debug, Clone, Default)]
pub struct MatchReport {
    /// Decisions in batch order
    pub matched: Vec<MatchDecision>,
    /// Unmatched items in batch order
    pub unmatched: Vec<UnmatchedRecord>,
    /// Blocks no item claimed, in response order
    pub leftover: Vec<GeneratedBlock>,
}

impl MatchReport {
    pub fn ambiguous_count(&self) -> usize {
        self.matched.iter().filter(|d| d.ambiguous).count()
    }
}

struct Assignment {
    block_index: usize,
    strategy: MatchStrategy,
    ambiguous: bool,
}

/// Bind each batch item to at most one block
pub fn match_blocks(batch: &Batch, blocks: Vec<GeneratedBlock>) -> MatchReport {
    let keys: Vec<String> = batch
        .items
        .iter()
        .map(|item| delimiter_safe_name(&item.name))
        .collect();
    let lower_keys: Vec<String> = keys.iter().map(|k| k.to_lowercase()).collect();
    let lower_names: Vec<String> = blocks.iter().map(|b| b.name.to_lowercase()).collect();

    let mut available = vec![true; blocks.len()];
    let mut assigned: Vec<Option<Assignment>> = batch.items.iter().map(|_| None).collect();

    // Exact
    for (i, key) in keys.iter().enumerate() {
        if let Some(j) = (0..blocks.len()).find(|&j| available[j] && blocks[j].name == *key) {
            available[j] = false;
            assigned[i] = Some(Assignment {
                block_index: j,
                strategy: MatchStrategy::Exact,
                ambiguous: false,
            });
        }
    }

    // Case-insensitive
    for (i, key) in lower_keys.iter().enumerate() {
        if assigned[i].is_some() {
            continue;
        }
        if let Some(j) = (0..blocks.len()).find(|&j| available[j] && lower_names[j] == *key) {
            available[j] = false;
            assigned[i] = Some(Assignment {
                block_index: j,
                strategy: MatchStrategy::CaseInsensitive,
                ambiguous: false,
            });
        }
    }

    // Containment
    for i in 0..keys.len() {
        if assigned[i].is_some() {
            continue;
        }
        let key = &lower_keys[i];
        let Some(j) =
            (0..blocks.len()).find(|&j| available[j] && contains_either(key, &lower_names[j]))
        else {
            continue;
        };

        let rival = (i + 1..keys.len())
            .find(|&k| assigned[k].is_none() && contains_either(&lower_keys[k], &lower_names[j]));
        if let Some(k) = rival {
            tracing::warn!(
                block = %blocks[j].name,
                winner = %keys[i],
                rival = %keys[k],
                "Ambiguous containment match, first record in batch order wins"
            );
        }

        available[j] = false;
        assigned[i] = Some(Assignment {
            block_index: j,
            strategy: MatchStrategy::Containment,
            ambiguous: rival.is_some(),
        });
    }

    let mut slots: Vec<Option<GeneratedBlock>> = blocks.into_iter().map(Some).collect();
    let mut report = MatchReport::default();

    for (i, item) in batch.items.iter().enumerate() {
        let Some(assignment) = &assigned[i] else {
            continue;
        };
        if let Some(block) = slots[assignment.block_index].take() {
            tracing::debug!(
                cultivar_id = item.id,
                block = %block.name,
                strategy = %assignment.strategy,
                "Matched block"
            );
            report.matched.push(MatchDecision {
                item_id: item.id,
                block,
                strategy: assignment.strategy,
                ambiguous: assignment.ambiguous,
            });
        }
    }

    report.leftover = slots.into_iter().flatten().collect();

    for (i, item) in batch.items.iter().enumerate() {
        if assigned[i].is_none() {
            report.unmatched.push(UnmatchedRecord {
                item_id: item.id,
                name: item.name.clone(),
                closest: closest_leftover(&lower_keys[i], &report.leftover),
            });
        }
    }

    report
}

/// Shorter-in-longer, case already folded; empty names never match
fn contains_either(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    a.contains(b) || b.contains(a)
}

fn closest_leftover(key: &str, leftover: &[GeneratedBlock]) -> Option<(String, f64)> {
    leftover
        .iter()
        .map(|b| (b.name.clone(), strsim::jaro_winkler(key, &b.name.to_lowercase())))
        .max_by(|a, b| a.1.total_cmp(&b.1))
}
