//! headers/mod.rs
//! gzip member header codec.
//!
//! Notes:
//! - Members produced here carry one extension subfield tagged `(1, 4)` whose
//!   4-byte little-endian value is the total member length, header through trailer.
//! - Members without that subfield are still valid gzip; readers fall back to
//!   sequential decoding for them.

pub mod types;
pub mod encode;
pub mod decode;
pub mod extra;

pub use types::*;
pub use decode::*;
pub use extra::*;
