//! stream/types.rs
//! Values exchanged between the pipeline roles.

use std::fmt;

use bytes::Bytes;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use serde::{Deserialize, Serialize};

/// Direction of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Compress,
    Decompress,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Compress => "compress",
            Mode::Decompress => "decompress",
        })
    }
}

/// How a decompression run was scheduled, decided from block 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeStrategy {
    /// Members carry their size; each block decodes independently.
    Parallel,
    /// Foreign input; one worker feeds every block into one decode stream.
    Sequential,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive, Serialize, Deserialize)]
pub enum PipelineStatus {
    Idle      = 0,
    Running   = 1,
    Completed = 2,
    Failed    = 3,
}

impl PipelineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, PipelineStatus::Completed | PipelineStatus::Failed)
    }
}

/// Unit of work. Indices are assigned by the source in emission order,
/// starting at 0, and never reused.
#[derive(Debug, Clone)]
pub struct Block {
    pub index: u64,
    pub payload: Bytes,
    /// Valid byte count at the front of `payload`.
    pub effective_size: usize,
}

impl Block {
    pub fn new(index: u64, payload: Bytes) -> Self {
        let effective_size = payload.len();
        Self { index, payload, effective_size }
    }

    /// The `effective_size` valid bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.payload[..self.effective_size]
    }

    pub fn is_empty(&self) -> bool {
        self.effective_size == 0
    }
}
