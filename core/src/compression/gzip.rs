//! gzip members via flate2, with the member-size subfield written in two passes.

use std::io::{Read, Write};

use flate2::{read::MultiGzDecoder, write::GzEncoder, Compression};

use crate::compression::types::{BlockCompressor, BlockDecompressor, CompressionError};
use crate::headers::parse_from_buffer;

const CODEC: &str = "gzip";

fn codec_err(e: std::io::Error) -> CompressionError {
    CompressionError::CodecProcessFailed { codec: CODEC, msg: e.to_string() }
}

pub struct GzipMemberCompressor {
    level: Compression,
}

impl GzipMemberCompressor {
    pub fn new(level: u32) -> Result<Self, CompressionError> {
        if level > 9 {
            return Err(CompressionError::InvalidLevel { have: level });
        }
        Ok(Self { level: Compression::new(level) })
    }

    pub fn boxed(level: u32) -> Result<Box<dyn BlockCompressor>, CompressionError> {
        Ok(Box::new(Self::new(level)?))
    }
}

impl BlockCompressor for GzipMemberCompressor {
    fn compress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        compress_member_into(input, self.level, out)
    }
}

pub struct GzipMemberDecompressor;

impl GzipMemberDecompressor {
    pub fn boxed() -> Box<dyn BlockDecompressor> {
        Box::new(Self)
    }
}

impl BlockDecompressor for GzipMemberDecompressor {
    fn decompress_block(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
        decode_members_into(input, out)
    }
}

/// Encodes `input` as a single member whose header carries its own total length.
pub fn compress_member(input: &[u8], level: u32) -> Result<Vec<u8>, CompressionError> {
    let mut out = Vec::new();
    GzipMemberCompressor::new(level)?.compress_block(input, &mut out)?;
    Ok(out)
}

fn compress_member_into(input: &[u8], level: Compression, out: &mut Vec<u8>) -> Result<(), CompressionError> {
    // Pass 1: plain member from the codec.
    let mut enc = GzEncoder::new(Vec::with_capacity(input.len() / 2 + 64), level);
    enc.write_all(input).map_err(codec_err)?;
    let plain = enc.finish().map_err(codec_err)?;

    // Pass 2: reserve the subfield, measure, then fill in the real size.
    let mut header = parse_from_buffer(&plain)?;
    let plain_header_len = header.encoded_len();
    header.set_member_size(0)?;

    let total = header.encoded_len() + plain.len() - plain_header_len;
    let size = u32::try_from(total)
        .map_err(|_| CompressionError::MemberTooLarge { have: total, max: u32::MAX as usize })?;
    header.set_member_size(size)?;

    out.reserve(total);
    header.encode_into(out);
    out.extend_from_slice(&plain[plain_header_len..]);
    Ok(())
}

/// Decodes every member in `input` back to back.
pub fn decode_members(input: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let mut out = Vec::new();
    decode_members_into(input, &mut out)?;
    Ok(out)
}

fn decode_members_into(input: &[u8], out: &mut Vec<u8>) -> Result<(), CompressionError> {
    let mut dec = MultiGzDecoder::new(input);
    dec.read_to_end(out).map_err(codec_err)?;
    Ok(())
}

/// Continuing decode over a byte stream that may be cut at arbitrary points,
/// yielding plaintext chunks of at most `chunk_size` bytes.
pub fn decode_stream<R: Read>(
    r: R,
    chunk_size: usize,
) -> impl Iterator<Item = Result<Vec<u8>, CompressionError>> {
    let mut dec = MultiGzDecoder::new(r);
    let mut done = false;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        let mut buf = vec![0u8; chunk_size];
        let mut filled = 0;
        while filled < chunk_size {
            match dec.read(&mut buf[filled..]) {
                Ok(0) => {
                    done = true;
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    done = true;
                    return Some(Err(codec_err(e)));
                }
            }
        }
        if filled == 0 {
            return None;
        }
        buf.truncate(filled);
        Some(Ok(buf))
    })
}
