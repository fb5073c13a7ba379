//! gzblock-core
//!
//! Block-parallel gzip: a self-describing multi-member container plus the
//! reader / worker pool / ordered writer pipeline that produces and consumes it.
//! Output of the decompressor is byte-identical to the original input, and any
//! standard gzip file decodes too (sequentially).

#![forbid(unsafe_code)]

// Shared and top level
pub mod constants;
pub mod types;

pub mod compression;
pub mod headers;
pub mod telemetry;

// Stream layer
pub mod stream;

// -----------------------------------------------------------------------------
// Prelude (Rust users)
// -----------------------------------------------------------------------------
pub mod prelude {
    pub use crate::headers::MemberHeader;
    pub use crate::stream::{
        begin, compress_bytes, decompress_bytes, InputSource, Mode, OutputSink, PipelineBuilder,
        PipelineConfig, PipelineHandle, PipelineStatus,
    };
    pub use crate::telemetry::TelemetrySnapshot;
    pub use crate::types::{Result, StreamError};
}
