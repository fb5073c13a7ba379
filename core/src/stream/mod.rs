//! stream: block-parallel gzip pipeline.
//!
//! One reader pulls blocks from a [`source::BlockSource`], a worker pool
//! transforms them, and one writer emits results in strict index order.
//! Queues are bounded; every wait is bounded and re-checks a shared stop flag.

pub mod api;
pub mod config;
pub mod io;
pub mod parallelism;
pub mod pipeline;
pub mod reorder;
pub mod signal;
pub mod source;
pub mod state;
pub mod types;
pub mod worker;

pub use api::{
    begin, compress_bytes, compress_stream, decompress_bytes, decompress_stream, PipelineBuilder,
    PipelineHandle,
};
pub use config::PipelineConfig;
pub use io::{InputSource, OutputSink};
pub use parallelism::ParallelismProfile;
pub use types::{Block, DecodeStrategy, Mode, PipelineStatus};
