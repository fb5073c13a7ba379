//! telemetry/counters.rs
//! Per-task counters.
//!
//! Each reader, worker and writer owns its own `TelemetryCounters` and hands it
//! back when it exits; the coordinator merges them once. No atomics on the hot path.

use std::ops::AddAssign;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelemetryCounters {
    /// Blocks pulled from the source.
    pub blocks_read: u64,
    /// Blocks transformed by workers.
    pub blocks_processed: u64,
    /// Blocks emitted by the writer, in order.
    pub blocks_written: u64,
    /// Bytes pulled from the input stream.
    pub bytes_in: u64,
    /// Bytes written to the output stream.
    pub bytes_out: u64,
    /// Blocks that sat in the reorder buffer before their turn.
    pub blocks_reordered: u64,
}

impl TelemetryCounters {
    pub fn add_read(&mut self, len: usize) {
        self.blocks_read += 1;
        self.bytes_in += len as u64;
    }

    pub fn add_processed(&mut self) {
        self.blocks_processed += 1;
    }

    pub fn add_written(&mut self, len: usize) {
        self.blocks_written += 1;
        self.bytes_out += len as u64;
    }

    pub fn add_reordered(&mut self) {
        self.blocks_reordered += 1;
    }

    pub fn merge(&mut self, other: &TelemetryCounters) {
        *self += other.clone();
    }
}

impl AddAssign for TelemetryCounters {
    fn add_assign(&mut self, rhs: Self) {
        self.blocks_read      += rhs.blocks_read;
        self.blocks_processed += rhs.blocks_processed;
        self.blocks_written   += rhs.blocks_written;
        self.bytes_in         += rhs.bytes_in;
        self.bytes_out        += rhs.bytes_out;
        self.blocks_reordered += rhs.blocks_reordered;
    }
}
