//! compression/mod.rs
//! Block transforms over the gzip codec.
//!
//! Notes:
//! - Compression is per block: every block becomes one independent member,
//!   which is what makes parallel decoding possible later.
//! - Decoding accepts any number of concatenated members, so a block carrying
//!   the tail of a foreign file still decodes in one call.

pub mod types;
pub mod gzip;

pub use types::*;
pub use gzip::*;
