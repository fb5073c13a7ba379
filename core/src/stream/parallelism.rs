use tracing::debug;

use crate::constants::{INFLIGHT_MEM_FRACTION, MAX_INFLIGHT_BLOCKS};

/// Worker count and queue water marks for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelismProfile {
    pub worker_count: usize,
    /// Queue depth at which producers back off.
    pub high_water: usize,
    /// Queue depth at which a suspended reader resumes.
    pub low_water: usize,
}

impl ParallelismProfile {
    /// Explicit worker count and high-water mark; low-water is half the high mark.
    pub fn with_limits(worker_count: usize, high_water: usize) -> Self {
        let high_water = high_water.max(1);
        Self {
            worker_count: worker_count.max(1),
            high_water,
            low_water: high_water / 2,
        }
    }

    /// Sized from the machine: one worker per core, and as many in-flight
    /// blocks as fit in `mem_fraction` of available memory, capped at
    /// `2 × cores` and `hard_cap`.
    pub fn dynamic(max_block_size: usize, mem_fraction: f64, hard_cap: usize) -> Self {
        let cores = num_cpus::get().max(1);

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();
        let budget = (sys.available_memory() as f64 * mem_fraction) as u64;
        let by_memory = (budget / max_block_size.max(1) as u64).max(1);

        let high = by_memory.min((2 * cores) as u64).min(hard_cap as u64) as usize;
        debug!(cores, by_memory, high, "parallelism profile");

        Self::with_limits(cores, high)
    }

    pub fn for_block_size(block_size: usize) -> Self {
        Self::dynamic(block_size, INFLIGHT_MEM_FRACTION, MAX_INFLIGHT_BLOCKS)
    }
}
