use std::collections::BTreeMap;

use crate::types::{Result, StreamError};

/// Writer-side buffer that releases items strictly in index order.
///
/// Items land in a `BTreeMap` until the next expected index arrives; then the
/// whole contiguous run starting at that index is released.
#[derive(Debug)]
pub struct ReorderBuffer<T> {
    next_index: u64,
    pending: BTreeMap<u64, T>,
}

impl<T> Default for ReorderBuffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ReorderBuffer<T> {
    pub fn new() -> Self {
        Self { next_index: 0, pending: BTreeMap::new() }
    }

    /// Accepts `item` for `index` and returns every item now ready, in order.
    ///
    /// # Errors
    /// `StreamError::Pipeline` if `index` was already released or is already pending.
    pub fn push(&mut self, index: u64, item: T) -> Result<Vec<T>> {
        if index < self.next_index {
            return Err(StreamError::Pipeline(format!(
                "block {} arrived after it was written (next is {})",
                index, self.next_index
            )));
        }
        if self.pending.contains_key(&index) {
            return Err(StreamError::Pipeline(format!("duplicate block {}", index)));
        }

        self.pending.insert(index, item);

        let mut ready = Vec::new();
        while let Some(item) = self.pending.remove(&self.next_index) {
            ready.push(item);
            self.next_index += 1;
        }
        Ok(ready)
    }

    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Lowest index still waiting, if any.
    pub fn first_pending(&self) -> Option<u64> {
        self.pending.keys().next().copied()
    }
}
