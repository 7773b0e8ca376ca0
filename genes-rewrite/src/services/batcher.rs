//! Fixed-size batching
//!
//! Pure partition of the selection. Order is preserved end to end so log
//! lines can say "item N of batch M"; the tail batch may be short.

use crate::models::{Batch, WorkItem};

/// Default records per API call
pub const DEFAULT_BATCH_SIZE: usize = 5;

/// Split `items` into consecutive batches of `batch_size` (minimum 1)
pub fn partition(items: Vec<WorkItem>, batch_size: usize) -> Vec<Batch> {
    let size = batch_size.max(1);
    let total = items.len().div_ceil(size);

    let mut batches = Vec::with_capacity(total);
    let mut iter = items.into_iter().peekable();
    let mut number = 0;

    while iter.peek().is_some() {
        number += 1;
        let chunk: Vec<WorkItem> = iter.by_ref().take(size).collect();
        batches.push(Batch {
            number,
            total,
            items: chunk,
        });
    }

    batches
}
