//! constants.rs
//! Wire constants for the blocked-gzip container and pipeline defaults.

use std::time::Duration;

/// gzip member magic bytes (RFC 1952 ID1, ID2).
pub const GZIP_ID1: u8 = 0x1f;
pub const GZIP_ID2: u8 = 0x8b;

/// Compression method byte for DEFLATE, the only method defined by RFC 1952.
pub const GZIP_METHOD_DEFLATE: u8 = 0x08;

/// Three-byte signature marking the start of a member, used by the scanning fallback.
pub const MEMBER_SIGNATURE: [u8; 3] = [GZIP_ID1, GZIP_ID2, GZIP_METHOD_DEFLATE];

/// Fixed member preamble: ID1 ID2 CM FLG MTIME(4) XFL OS.
pub const PREAMBLE_LEN: usize = 10;

/// Width of the XLEN field that follows the preamble when FEXTRA is set.
pub const XLEN_FIELD_LEN: usize = 2;

/// Subfield header: SI1 SI2 LEN(2).
pub const SUBFIELD_HEADER_LEN: usize = 4;

/// Subfield ids of the "member size" tag written by this container.
pub const MEMBER_SIZE_SI1: u8 = 1;
pub const MEMBER_SIZE_SI2: u8 = 4;

/// Value width of the member size subfield (u32, little-endian).
pub const MEMBER_SIZE_LEN: usize = 4;

/// OS byte written into fresh preambles ("unknown").
pub const OS_UNKNOWN: u8 = 0xff;

/// Defaults when `Option<T>` is `None`.
pub const DEFAULT_BLOCK_SIZE: usize = 1024 * 1024; // 1 MiB
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;
pub const DEFAULT_IDLE_WAIT: Duration = Duration::from_millis(500);
pub const DEFAULT_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Max block size sanity bound (32 MiB).
pub const MAX_BLOCK_SIZE: usize = 32 * 1024 * 1024;

/// Largest member the compressor can emit: a `MAX_BLOCK_SIZE` block that deflate
/// could not shrink, plus stored-block framing, header and trailer.
pub const MAX_MEMBER_SIZE: usize = MAX_BLOCK_SIZE + MAX_BLOCK_SIZE / 8 + 1024;

/// Scanned blocks are cut at this many scan windows.
pub const SCAN_BLOCK_FACTOR: usize = 4;

/// Largest untagged tail (one block) the fallback paths will assemble before failing.
pub const DEFAULT_MAX_FALLBACK_BLOCK: usize = 512 * 1024 * 1024;

/// Hard cap on in-flight blocks per queue, regardless of memory.
pub const MAX_INFLIGHT_BLOCKS: usize = 256;

/// Fraction of available memory the in-flight blocks may occupy.
pub const INFLIGHT_MEM_FRACTION: f64 = 0.25;
