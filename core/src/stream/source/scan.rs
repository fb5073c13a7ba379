//! Member boundary scanning for input without size tags.
//!
//! Boundary arithmetic:
//! - the block being assembled starts with a signature at offset 0 (or is the
//!   continuation of a block that was cut at the size cap);
//! - the next signature is searched at offsets >= 1;
//! - after each extra read window, the search resumes at `max(1, len - 2)` so a
//!   signature straddling two windows is seen exactly once;
//! - a block ends right before the next signature, at the cap, or at EOF.
//!
//! Compressed payload bytes can look like a signature. Such false splits only
//! move block boundaries; the sequential decoder concatenates blocks, so output
//! is unaffected.

use std::io::{self, Read};

use crate::constants::MEMBER_SIGNATURE;
use crate::stream::io::read_exact_or_eof;

/// First offset `>= from` where the member signature starts.
pub fn find_signature(buf: &[u8], from: usize) -> Option<usize> {
    if from >= buf.len() {
        return None;
    }
    buf[from..]
        .windows(MEMBER_SIGNATURE.len())
        .position(|w| w == MEMBER_SIGNATURE)
        .map(|p| p + from)
}

pub struct SignatureScanner {
    window: usize,
    cap: usize,
    pending: Vec<u8>,
    eof: bool,
}

impl SignatureScanner {
    /// `seed` holds bytes already consumed from the stream (usually the first header).
    pub fn new(seed: Vec<u8>, window: usize, cap: usize) -> Self {
        Self { window: window.max(1), cap: cap.max(1), pending: seed, eof: false }
    }

    /// Next block of raw member bytes, or `None` when the stream is drained.
    pub fn next_block<R: Read + ?Sized>(&mut self, r: &mut R) -> io::Result<Option<Vec<u8>>> {
        let mut from = 1usize;
        loop {
            match find_signature(&self.pending, from) {
                Some(at) if at <= self.cap => return Ok(Some(self.pending.drain(..at).collect())),
                _ => {}
            }
            if self.pending.len() >= self.cap {
                return Ok(Some(self.pending.drain(..self.cap).collect()));
            }
            if self.eof {
                if self.pending.is_empty() {
                    return Ok(None);
                }
                return Ok(Some(std::mem::take(&mut self.pending)));
            }

            let chunk = read_exact_or_eof(r, self.window)?;
            if chunk.is_empty() {
                self.eof = true;
                continue;
            }
            from = self.pending.len().saturating_sub(MEMBER_SIGNATURE.len() - 1).max(1);
            self.pending.extend_from_slice(&chunk);
        }
    }
}
