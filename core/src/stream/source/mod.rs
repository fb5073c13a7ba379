//! stream/source
//!
//! Block sources: where the reader gets its blocks from.
//!
//! - [`RawChunkSource`]: fixed-size slices of uncompressed input.
//! - [`MemberSource`]: one gzip member per block when members carry their size,
//!   signature scanning otherwise.
//!
//! Sources are shared by reference and serialize concurrent callers internally;
//! every caller gets a distinct, strictly increasing index.

pub mod raw;
pub mod member;
pub mod scan;

use std::io::Read;

pub use member::MemberSource;
pub use raw::RawChunkSource;
pub use scan::{find_signature, SignatureScanner};

use crate::stream::config::PipelineConfig;
use crate::stream::types::{Block, Mode};
use crate::types::Result;

pub trait BlockSource: Send + Sync {
    /// Next block, or `None` once the input is exhausted.
    fn produce_next_block(&self) -> Result<Option<Block>>;

    /// Total input length, when the underlying stream exposes one.
    fn bytes_total(&self) -> Option<u64>;

    /// Input bytes handed out in blocks so far.
    fn bytes_provided(&self) -> u64;
}

/// Source matching the run direction.
pub fn source_for(
    mode: Mode,
    reader: Box<dyn Read + Send>,
    total: Option<u64>,
    config: &PipelineConfig,
) -> Box<dyn BlockSource> {
    match mode {
        Mode::Compress => Box::new(RawChunkSource::new(reader, config.block_size, total)),
        Mode::Decompress => Box::new(MemberSource::new(
            reader,
            config.block_size,
            config.max_fallback_block,
            total,
        )),
    }
}
