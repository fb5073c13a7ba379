//! compression/types.rs
//! Codec error type and the per-block transform traits.

use std::fmt;

use crate::headers::HeaderError;

#[derive(Debug)]
pub enum CompressionError {
    CodecProcessFailed { codec: &'static str, msg: String },
    /// Header rewrite on a freshly encoded member failed.
    Header(HeaderError),
    /// Member would not fit the 32-bit size subfield.
    MemberTooLarge { have: usize, max: usize },
    InvalidLevel { have: u32 },
}

impl From<HeaderError> for CompressionError {
    fn from(e: HeaderError) -> Self {
        CompressionError::Header(e)
    }
}

impl fmt::Display for CompressionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use CompressionError::*;
        match self {
            CodecProcessFailed { codec, msg } =>
                write!(f, "codec {} process failed: {}", codec, msg),
            Header(e) =>
                write!(f, "member header rewrite failed: {}", e),
            MemberTooLarge { have, max } =>
                write!(f, "member too large: {} > {}", have, max),
            InvalidLevel { have } =>
                write!(f, "invalid compression level: {} (expected 0..=9)", have),
        }
    }
}

impl std::error::Error for CompressionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CompressionError::Header(e) => Some(e),
            _ => None,
        }
    }
}

// Require Send so boxed transforms can move into worker threads.
pub trait BlockCompressor: Send {
    /// Encode `input` as one complete, size-tagged member appended to `out`.
    fn compress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
}

pub trait BlockDecompressor: Send {
    /// Decode one or more complete members in `input`, appending plaintext to `out`.
    fn decompress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError>;
}
