//! headers/decode.rs
//!
//! Header parsing from a stream or from a buffer holding an unknown-length member.
//!
//! Design notes:
//! - Only the preamble and the extension area are consumed. The caller's reader
//!   is left positioned at the first byte after the extension area.
//! - The extension area is kept as raw bytes. RFC 1952 only requires XLEN
//!   bytes to follow; an area that is not a clean run of subfields parses fine
//!   and simply carries no subfields (see `MemberHeader::has_subfield_layout`).

use std::io::{self, Read};

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{GZIP_ID1, GZIP_ID2, PREAMBLE_LEN, XLEN_FIELD_LEN};
use crate::headers::types::{CompressionMethod, HeaderError, MemberFlags, MemberHeader};

/// Reads one header from `r`.
///
/// # Returns
/// - `Ok(header)` on success
/// - `Err(HeaderError::Truncated)` if the stream ends inside the header,
///   including at its very first byte
pub fn parse<R: Read>(r: &mut R) -> Result<MemberHeader, HeaderError> {
    read_header_or_eof(r)?.ok_or(HeaderError::Truncated { have: 0, need: PREAMBLE_LEN })
}

/// Like [`parse`], but a stream already at EOF yields `Ok(None)`.
/// Used by block sources to tell "no more members" apart from a torn header.
pub fn read_header_or_eof<R: Read>(r: &mut R) -> Result<Option<MemberHeader>, HeaderError> {
    let mut preamble = [0u8; PREAMBLE_LEN];
    let n = read_full(r, &mut preamble)?;
    if n == 0 {
        return Ok(None);
    }
    if n < PREAMBLE_LEN {
        return Err(HeaderError::Truncated { have: n, need: PREAMBLE_LEN });
    }
    check_preamble(&preamble)?;

    let mut buf = preamble.to_vec();
    if MemberFlags::from_bits_retain(preamble[MemberHeader::FLG_OFFSET]).contains(MemberFlags::FEXTRA) {
        let mut xlen_raw = [0u8; XLEN_FIELD_LEN];
        let got = read_full(r, &mut xlen_raw)?;
        if got < XLEN_FIELD_LEN {
            return Err(HeaderError::Truncated { have: PREAMBLE_LEN + got, need: MemberHeader::EXTRA_OFFSET });
        }
        let xlen = LittleEndian::read_u16(&xlen_raw) as usize;
        buf.extend_from_slice(&xlen_raw);

        let start = buf.len();
        buf.resize(start + xlen, 0);
        let got = read_full(r, &mut buf[start..])?;
        if got < xlen {
            return Err(HeaderError::Truncated { have: start + got, need: start + xlen });
        }
    }

    Ok(Some(MemberHeader { buf }))
}

/// Parses the leading header of `bytes`, which may continue with payload and trailer.
pub fn parse_from_buffer(bytes: &[u8]) -> Result<MemberHeader, HeaderError> {
    if bytes.len() < PREAMBLE_LEN {
        return Err(HeaderError::Truncated { have: bytes.len(), need: PREAMBLE_LEN });
    }
    check_preamble(&bytes[..PREAMBLE_LEN])?;

    let flags = MemberFlags::from_bits_retain(bytes[MemberHeader::FLG_OFFSET]);
    if !flags.contains(MemberFlags::FEXTRA) {
        return Ok(MemberHeader { buf: bytes[..PREAMBLE_LEN].to_vec() });
    }

    let extra_at = MemberHeader::EXTRA_OFFSET;
    if bytes.len() < extra_at {
        return Err(HeaderError::Truncated { have: bytes.len(), need: extra_at });
    }
    let xlen = LittleEndian::read_u16(&bytes[PREAMBLE_LEN..extra_at]) as usize;
    let end = extra_at + xlen;
    if bytes.len() < end {
        return Err(HeaderError::Truncated { have: bytes.len(), need: end });
    }

    Ok(MemberHeader { buf: bytes[..end].to_vec() })
}

fn check_preamble(p: &[u8]) -> Result<(), HeaderError> {
    if p[0] != GZIP_ID1 || p[1] != GZIP_ID2 {
        return Err(HeaderError::InvalidMagic { have: [p[0], p[1]] });
    }
    if p[2] != CompressionMethod::Deflate as u8 {
        return Err(HeaderError::UnsupportedMethod { raw: p[2] });
    }
    Ok(())
}

/// Fills `buf` until it is full or the reader hits EOF; returns bytes read.
fn read_full<R: Read>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
