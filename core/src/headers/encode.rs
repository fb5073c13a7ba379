//! headers/encode.rs
//!
//! Fresh header construction.
//!
//! Design notes:
//! - A fresh header is the bare 10-byte preamble; subfields are added through
//!   `set_extension`, which owns the FEXTRA/XLEN bookkeeping.
//! - Field order follows RFC 1952: ID1 ID2 CM FLG MTIME XFL OS.

use crate::constants::{GZIP_ID1, GZIP_ID2, OS_UNKNOWN, PREAMBLE_LEN};
use crate::headers::types::{CompressionMethod, MemberFlags, MemberHeader};

impl MemberHeader {
    /// Preamble-only header with the given timestamp and OS byte.
    pub fn new(mtime: u32, os: u8) -> Self {
        let mut buf = Vec::with_capacity(PREAMBLE_LEN);
        buf.push(GZIP_ID1);
        buf.push(GZIP_ID2);
        buf.push(CompressionMethod::Deflate as u8);
        buf.push(MemberFlags::empty().bits());
        buf.extend_from_slice(&mtime.to_le_bytes());
        buf.push(0); // XFL
        buf.push(os);
        Self { buf }
    }

    /// Writes the header bytes to `out`, returning the number written.
    pub fn encode_into(&self, out: &mut Vec<u8>) -> usize {
        out.extend_from_slice(&self.buf);
        self.buf.len()
    }
}

impl Default for MemberHeader {
    fn default() -> Self {
        Self::new(0, OS_UNKNOWN)
    }
}
