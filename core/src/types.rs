use std::io;
use thiserror::Error;

use crate::{compression::CompressionError, headers::HeaderError};

pub type Result<T> = std::result::Result<T, StreamError>;

/// Unified stream error covering header surgery, block sources, codec and pipeline failures.
/// - Ergonomic `From<T>` impls enable `?` across the pipeline.
/// - The pipeline stores the first one raised and surfaces it through the handle.
#[derive(Debug, Error)]
pub enum StreamError {
    /// Magic/method mismatch, truncated preamble, or an impossible declared member size.
    #[error("malformed member header: {0}")]
    MalformedHeader(String),

    /// Extension length bookkeeping does not match the subfields actually present.
    #[error("invalid extension layout: {0}")]
    InvalidExtensionLayout(String),

    /// The input stream failed or ended inside a declared member.
    #[error("source read failure: {0}")]
    SourceReadFailure(#[source] io::Error),

    /// The output stream rejected a write or flush.
    #[error("sink write failure: {0}")]
    SinkWriteFailure(#[source] io::Error),

    /// A fallback block grew past the configured limit.
    #[error("unsupported fallback: {0}")]
    UnsupportedFallback(String),

    /// Zero-length input, rejected before the pipeline starts.
    #[error("input is empty")]
    EmptyInput,

    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    /// Internal ordering invariant broken (duplicate or missing block index).
    #[error("pipeline error: {0}")]
    Pipeline(String),

    /// Rejected configuration.
    #[error("validation error: {0}")]
    Validation(String),

    /// The pipeline was disposed before it finished.
    #[error("pipeline stopped before completion")]
    Stopped,
}

impl From<HeaderError> for StreamError {
    fn from(e: HeaderError) -> Self {
        match e {
            HeaderError::Io(e) => StreamError::SourceReadFailure(e),
            HeaderError::InvalidExtensionLayout(msg) => StreamError::InvalidExtensionLayout(msg),
            HeaderError::ExtensionOverflow { .. } => StreamError::InvalidExtensionLayout(e.to_string()),
            other => StreamError::MalformedHeader(other.to_string()),
        }
    }
}
