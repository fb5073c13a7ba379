//! headers/types.rs
//! gzip member header and typed views over its fields.
//!
//! Notes:
//! - The header keeps its raw wire bytes (preamble, then XLEN and the extension
//!   area when FEXTRA is set). All edits go through methods that keep XLEN and
//!   the FEXTRA bit consistent with the subfields actually present.
//! - Multi-byte fields are little-endian per RFC 1952.
//! - Optional FNAME/FCOMMENT/FHCRC fields are not part of this view; they travel
//!   with the compressed payload and are handled by the codec.

use std::{fmt, io};

use byteorder::{ByteOrder, LittleEndian};
use num_enum::TryFromPrimitive;
use thiserror::Error;

use crate::constants::{PREAMBLE_LEN, XLEN_FIELD_LEN};

bitflags::bitflags! {
    /// FLG byte of the member preamble.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MemberFlags: u8 {
        const FTEXT    = 0b0000_0001;
        const FHCRC    = 0b0000_0010;
        /// Extension area (XLEN + subfields) follows the preamble.
        const FEXTRA   = 0b0000_0100;
        const FNAME    = 0b0000_1000;
        const FCOMMENT = 0b0001_0000;
    }
}

/// Compression method byte (CM). DEFLATE is the only registered value.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum CompressionMethod {
    Deflate = 0x08,
}

/// Operating system byte (OS), used for diagnostics only.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, TryFromPrimitive)]
pub enum OsId {
    Fat     = 0,
    Amiga   = 1,
    Vms     = 2,
    Unix    = 3,
    VmCms   = 4,
    AtariTos = 5,
    Hpfs    = 6,
    Macintosh = 7,
    ZSystem = 8,
    CpM     = 9,
    Tops20  = 10,
    Ntfs    = 11,
    Qdos    = 12,
    AcornRiscos = 13,
    Unknown = 255,
}

/// One tagged record inside the extension area.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subfield<'a> {
    pub si1: u8,
    pub si2: u8,
    pub data: &'a [u8],
}

impl Subfield<'_> {
    /// Bytes this subfield occupies on the wire (SI1 SI2 LEN + data).
    pub fn wire_len(&self) -> usize {
        crate::constants::SUBFIELD_HEADER_LEN + self.data.len()
    }
}

/// Parsed member header: preamble plus optional extension area.
#[derive(Clone, PartialEq, Eq)]
pub struct MemberHeader {
    pub(crate) buf: Vec<u8>,
}

impl MemberHeader {
    pub(crate) const FLG_OFFSET: usize = 3;
    pub(crate) const MTIME_OFFSET: usize = 4;
    pub(crate) const XFL_OFFSET: usize = 8;
    pub(crate) const OS_OFFSET: usize = 9;
    pub(crate) const EXTRA_OFFSET: usize = PREAMBLE_LEN + XLEN_FIELD_LEN;

    pub fn flags(&self) -> MemberFlags {
        MemberFlags::from_bits_retain(self.buf[Self::FLG_OFFSET])
    }

    pub fn mtime(&self) -> u32 {
        LittleEndian::read_u32(&self.buf[Self::MTIME_OFFSET..Self::MTIME_OFFSET + 4])
    }

    pub fn xfl(&self) -> u8 {
        self.buf[Self::XFL_OFFSET]
    }

    pub fn os(&self) -> u8 {
        self.buf[Self::OS_OFFSET]
    }

    pub fn has_extension(&self) -> bool {
        self.flags().contains(MemberFlags::FEXTRA)
    }

    /// Value of the XLEN field, 0 when FEXTRA is clear.
    pub fn extension_len(&self) -> usize {
        if self.has_extension() {
            LittleEndian::read_u16(&self.buf[PREAMBLE_LEN..Self::EXTRA_OFFSET]) as usize
        } else {
            0
        }
    }

    /// Raw extension area (without the XLEN field).
    pub fn extension(&self) -> &[u8] {
        if self.has_extension() {
            &self.buf[Self::EXTRA_OFFSET..]
        } else {
            &[]
        }
    }

    /// Number of header bytes on the wire.
    pub fn encoded_len(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

impl fmt::Debug for MemberHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemberHeader")
            .field("flags", &self.flags())
            .field("mtime", &self.mtime())
            .field("xfl", &self.xfl())
            .field("os", &enum_name_or_hex::<OsId>(self.os()))
            .field("extension", &fmt_bytes(self.extension()))
            .finish()
    }
}

pub fn enum_name_or_hex<T>(raw: T::Primitive) -> String
where
    T: TryFromPrimitive + fmt::Debug,
    T::Primitive: fmt::LowerHex,
{
    match T::try_from_primitive(raw) {
        Ok(variant) => format!("{:?}", variant),
        Err(_) => format!("0x{:x}", raw),
    }
}

fn method_name(raw: &u8) -> String {
    enum_name_or_hex::<CompressionMethod>(*raw)
}

pub fn fmt_bytes(b: &[u8]) -> String {
    if b.is_empty() {
        return "[]".into();
    }
    format!("0x{}", hex::encode(b))
}

#[derive(Debug, Error)]
pub enum HeaderError {
    /// Buffer ends before the preamble or the declared extension area.
    #[error("header truncated: {have} < {need}")]
    Truncated { have: usize, need: usize },

    #[error("invalid magic: expected 0x1f8b, got {}", fmt_bytes(.have))]
    InvalidMagic { have: [u8; 2] },

    #[error("unsupported compression method: {}", method_name(.raw))]
    UnsupportedMethod { raw: u8 },

    /// Subfields do not tile the extension area exactly.
    #[error("{0}")]
    InvalidExtensionLayout(String),

    /// An edit would push XLEN or a subfield length past 16 bits.
    #[error("extension overflow: {have} > {max}")]
    ExtensionOverflow { have: usize, max: usize },

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}
