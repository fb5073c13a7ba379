use std::time::Duration;

use crate::constants::{
    DEFAULT_BLOCK_SIZE, DEFAULT_COMPRESSION_LEVEL, DEFAULT_IDLE_WAIT, DEFAULT_JOIN_TIMEOUT,
    DEFAULT_MAX_FALLBACK_BLOCK, MAX_BLOCK_SIZE,
};
use crate::stream::parallelism::ParallelismProfile;
use crate::types::StreamError;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Raw chunk size when compressing, scan window and output chunk size when decompressing.
    pub block_size: usize,
    /// Overrides the detected core count.
    pub workers: Option<usize>,
    /// Overrides the memory-derived queue high-water mark.
    pub queue_high_water: Option<usize>,
    /// Bounded wait used at every suspension point before re-checking the stop flag.
    pub idle_wait: Duration,
    pub compression_level: u32,
    /// Largest untagged tail block; scanned blocks are also capped by it.
    pub max_fallback_block: usize,
    /// How long `dispose` waits for the pipeline threads.
    pub join_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            workers: None,
            queue_high_water: None,
            idle_wait: DEFAULT_IDLE_WAIT,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            max_fallback_block: DEFAULT_MAX_FALLBACK_BLOCK,
            join_timeout: DEFAULT_JOIN_TIMEOUT,
        }
    }
}

impl PipelineConfig {
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = Some(workers);
        self
    }

    pub fn with_queue_high_water(mut self, high: usize) -> Self {
        self.queue_high_water = Some(high);
        self
    }

    pub fn with_idle_wait(mut self, idle_wait: Duration) -> Self {
        self.idle_wait = idle_wait;
        self
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.block_size == 0 || self.block_size > MAX_BLOCK_SIZE {
            return Err(StreamError::Validation(format!(
                "block_size {} outside 1..={}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if self.workers == Some(0) {
            return Err(StreamError::Validation("workers must be at least 1".into()));
        }
        if self.queue_high_water == Some(0) {
            return Err(StreamError::Validation("queue_high_water must be at least 1".into()));
        }
        if self.idle_wait.is_zero() {
            return Err(StreamError::Validation("idle_wait must be non-zero".into()));
        }
        if self.compression_level > 9 {
            return Err(StreamError::Validation(format!(
                "compression_level {} outside 0..=9",
                self.compression_level
            )));
        }
        if self.max_fallback_block < self.block_size {
            return Err(StreamError::Validation(format!(
                "max_fallback_block {} smaller than block_size {}",
                self.max_fallback_block, self.block_size
            )));
        }
        Ok(())
    }

    /// Machine profile with this config's overrides applied.
    pub fn profile(&self) -> ParallelismProfile {
        let detected = ParallelismProfile::for_block_size(self.block_size);
        ParallelismProfile::with_limits(
            self.workers.unwrap_or(detected.worker_count),
            self.queue_high_water.unwrap_or(detected.high_water),
        )
    }
}
