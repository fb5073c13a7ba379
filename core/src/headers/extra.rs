//! headers/extra.rs
//!
//! Extension area surgery: lookup, in-place overwrite, resize-and-splice, append.
//!
//! Every path keeps three things in agreement: the FEXTRA bit, the XLEN field,
//! and the sum of `4 + LEN` over the subfields. Nothing else in the crate writes
//! to the extension area directly.
//!
//! Parsed headers may carry an opaque area that does not split into subfields.
//! Such a header reads as having none, and refuses edits.

use byteorder::{ByteOrder, LittleEndian};

use crate::constants::{
    MEMBER_SIZE_LEN, MEMBER_SIZE_SI1, MEMBER_SIZE_SI2, PREAMBLE_LEN, SUBFIELD_HEADER_LEN,
};
use crate::headers::types::{HeaderError, MemberFlags, MemberHeader, Subfield};

/// Iterator over the subfields of a validated extension area.
pub struct Subfields<'a> {
    area: &'a [u8],
    pos: usize,
}

impl<'a> Iterator for Subfields<'a> {
    type Item = Subfield<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = &self.area[self.pos..];
        if rest.len() < SUBFIELD_HEADER_LEN {
            return None;
        }
        let len = LittleEndian::read_u16(&rest[2..4]) as usize;
        let end = SUBFIELD_HEADER_LEN + len;
        if rest.len() < end {
            return None;
        }
        self.pos += end;
        Some(Subfield { si1: rest[0], si2: rest[1], data: &rest[SUBFIELD_HEADER_LEN..end] })
    }
}

/// Checks that subfields tile `area` back-to-back with nothing left over.
pub fn validate_extension_layout(area: &[u8]) -> Result<(), HeaderError> {
    let mut pos = 0usize;
    while pos < area.len() {
        let rest = &area[pos..];
        if rest.len() < SUBFIELD_HEADER_LEN {
            return Err(HeaderError::InvalidExtensionLayout(format!(
                "{} trailing bytes at offset {} cannot hold a subfield header",
                rest.len(),
                pos
            )));
        }
        let len = LittleEndian::read_u16(&rest[2..4]) as usize;
        if rest.len() < SUBFIELD_HEADER_LEN + len {
            return Err(HeaderError::InvalidExtensionLayout(format!(
                "subfield ({}, {}) at offset {} declares {} bytes, {} available",
                rest[0],
                rest[1],
                pos,
                len,
                rest.len() - SUBFIELD_HEADER_LEN
            )));
        }
        pos += SUBFIELD_HEADER_LEN + len;
    }
    Ok(())
}

fn checked_u16(n: usize) -> Result<u16, HeaderError> {
    u16::try_from(n).map_err(|_| HeaderError::ExtensionOverflow { have: n, max: u16::MAX as usize })
}

impl MemberHeader {
    /// Subfields in wire order. Empty unless [`Self::has_subfield_layout`].
    pub fn subfields(&self) -> Subfields<'_> {
        let area = if self.has_subfield_layout() { self.extension() } else { &[] };
        Subfields { area, pos: 0 }
    }

    /// True when the extension area (possibly empty) is a clean run of subfields.
    pub fn has_subfield_layout(&self) -> bool {
        validate_extension_layout(self.extension()).is_ok()
    }

    /// Value of the first subfield tagged `(si1, si2)`.
    pub fn get_extension(&self, si1: u8, si2: u8) -> Option<&[u8]> {
        self.subfields().find(|s| s.si1 == si1 && s.si2 == si2).map(|s| s.data)
    }

    /// Inserts or replaces the subfield tagged `(si1, si2)`.
    ///
    /// - same length: value overwritten in place
    /// - different length: subfield resized, XLEN adjusted
    /// - absent: subfield appended, FEXTRA/XLEN created on first use
    pub fn set_extension(&mut self, si1: u8, si2: u8, value: &[u8]) -> Result<(), HeaderError> {
        let value_len = checked_u16(value.len())?;
        validate_extension_layout(self.extension())?;

        match self.locate(si1, si2) {
            Some((data_at, old_len)) if old_len == value.len() => {
                self.buf[data_at..data_at + old_len].copy_from_slice(value);
            }
            Some((data_at, old_len)) => {
                let xlen = checked_u16(self.extension_len() - old_len + value.len())?;
                LittleEndian::write_u16(&mut self.buf[data_at - 2..data_at], value_len);
                self.buf.splice(data_at..data_at + old_len, value.iter().copied());
                self.write_xlen(xlen);
            }
            None => {
                let xlen = checked_u16(self.extension_len() + SUBFIELD_HEADER_LEN + value.len())?;
                if !self.has_extension() {
                    let flags = self.flags() | MemberFlags::FEXTRA;
                    self.buf[Self::FLG_OFFSET] = flags.bits();
                    self.buf.truncate(PREAMBLE_LEN);
                    self.buf.extend_from_slice(&[0, 0]);
                }
                self.buf.push(si1);
                self.buf.push(si2);
                self.buf.extend_from_slice(&value_len.to_le_bytes());
                self.buf.extend_from_slice(value);
                self.write_xlen(xlen);
            }
        }
        Ok(())
    }

    /// Declared member size, if the `(1, 4)` subfield is present and well-formed.
    pub fn member_size(&self) -> Option<u32> {
        self.get_extension(MEMBER_SIZE_SI1, MEMBER_SIZE_SI2)
            .filter(|v| v.len() == MEMBER_SIZE_LEN)
            .map(LittleEndian::read_u32)
    }

    pub fn set_member_size(&mut self, size: u32) -> Result<(), HeaderError> {
        self.set_extension(MEMBER_SIZE_SI1, MEMBER_SIZE_SI2, &size.to_le_bytes())
    }

    /// Absolute offset and length of the data of subfield `(si1, si2)`.
    fn locate(&self, si1: u8, si2: u8) -> Option<(usize, usize)> {
        let mut at = Self::EXTRA_OFFSET;
        for s in self.subfields() {
            if s.si1 == si1 && s.si2 == si2 {
                return Some((at + SUBFIELD_HEADER_LEN, s.data.len()));
            }
            at += s.wire_len();
        }
        None
    }

    fn write_xlen(&mut self, xlen: u16) {
        LittleEndian::write_u16(&mut self.buf[PREAMBLE_LEN..Self::EXTRA_OFFSET], xlen);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum_of_subfields(h: &MemberHeader) -> usize {
        h.subfields().map(|s| s.wire_len()).sum()
    }

    #[test]
    fn resize_keeps_neighbours_intact() {
        let mut h = MemberHeader::default();
        h.set_extension(b'A', b'B', b"first").unwrap();
        h.set_extension(1, 4, &[0; 4]).unwrap();
        h.set_extension(b'Z', b'Z', b"last").unwrap();

        h.set_extension(1, 4, b"a much longer value").unwrap();
        assert_eq!(h.get_extension(b'A', b'B'), Some(&b"first"[..]));
        assert_eq!(h.get_extension(1, 4), Some(&b"a much longer value"[..]));
        assert_eq!(h.get_extension(b'Z', b'Z'), Some(&b"last"[..]));
        assert_eq!(h.extension_len(), sum_of_subfields(&h));

        h.set_extension(1, 4, b"").unwrap();
        assert_eq!(h.get_extension(1, 4), Some(&b""[..]));
        assert_eq!(h.extension_len(), sum_of_subfields(&h));
    }

    #[test]
    fn trailing_garbage_is_rejected() {
        assert!(validate_extension_layout(&[1, 4, 0]).is_err());
        assert!(validate_extension_layout(&[1, 4, 5, 0, 1]).is_err());
        assert!(validate_extension_layout(&[]).is_ok());
    }

    #[test]
    fn opaque_area_has_no_subfields_and_refuses_edits() {
        // FEXTRA, XLEN = 3, "abc"
        let mut raw = vec![0x1f, 0x8b, 8, MemberFlags::FEXTRA.bits(), 0, 0, 0, 0, 0, 255];
        raw.extend_from_slice(&[3, 0, b'a', b'b', b'c']);
        let mut h = crate::headers::parse_from_buffer(&raw).unwrap();

        assert_eq!(h.extension(), b"abc");
        assert!(!h.has_subfield_layout());
        assert_eq!(h.subfields().count(), 0);
        assert_eq!(h.member_size(), None);
        assert!(matches!(h.set_member_size(7), Err(HeaderError::InvalidExtensionLayout(_))));
        assert_eq!(h.as_bytes(), &raw[..]);
    }
}
