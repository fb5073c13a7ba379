//! telemetry/snapshot.rs
//!
//! Immutable end-of-run snapshot returned by `PipelineHandle::wait`.
//!
//! Design notes:
//! - `compression_ratio` is always compressed / uncompressed, whichever
//!   direction the pipeline ran in. It is not clamped: incompressible input
//!   legitimately grows.
//! - `output` is populated only when the sink was an in-memory buffer.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::stream::types::{DecodeStrategy, Mode};
use crate::telemetry::counters::TelemetryCounters;
use crate::telemetry::timers::{Stage, StageTimes, TelemetryTimer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub mode: Mode,
    pub blocks_read: u64,
    pub blocks_written: u64,
    pub blocks_reordered: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub compression_ratio: f64,
    pub throughput_bytes_per_sec: f64,
    pub elapsed: Duration,
    pub stage_times: StageTimes,
    pub workers_used: usize,
    /// `None` for compression.
    pub decode_strategy: Option<DecodeStrategy>,
    #[serde(skip)]
    pub output: Option<Vec<u8>>,
}

impl TelemetrySnapshot {
    pub fn from(
        mode: Mode,
        counters: &TelemetryCounters,
        timer: &TelemetryTimer,
        workers_used: usize,
        decode_strategy: Option<DecodeStrategy>,
    ) -> Self {
        let elapsed = timer.elapsed();

        let (compressed, uncompressed) = match mode {
            Mode::Compress => (counters.bytes_out, counters.bytes_in),
            Mode::Decompress => (counters.bytes_in, counters.bytes_out),
        };
        let compression_ratio = if uncompressed > 0 {
            compressed as f64 / uncompressed as f64
        } else {
            0.0
        };

        let throughput = if elapsed.as_secs_f64() > 0.0 {
            counters.bytes_in as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        Self {
            mode,
            blocks_read: counters.blocks_read,
            blocks_written: counters.blocks_written,
            blocks_reordered: counters.blocks_reordered,
            bytes_in: counters.bytes_in,
            bytes_out: counters.bytes_out,
            compression_ratio,
            throughput_bytes_per_sec: throughput,
            elapsed,
            stage_times: timer.stage_times.clone(),
            workers_used,
            decode_strategy,
            output: None,
        }
    }

    pub fn attach_output(&mut self, out: Vec<u8>) {
        self.output = Some(out);
    }

    pub fn has_all_stages(&self, expected: &[Stage]) -> bool {
        self.stage_times.has_all(expected)
    }

    /// JSON rendering of everything except the captured output.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
