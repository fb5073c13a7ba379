//! Container-member source.
//!
//! The first header decides the phase:
//! - size subfield present and positive: `Delimited`, one member per block,
//!   read in one go from the declared length;
//! - otherwise: `Scanning`, blocks cut at member signatures.
//!
//! A delimited stream that later hits an untagged member ends with a tail:
//! the rest of the stream becomes one final block, bounded by `max_fallback_block`.
//!
//! Scanned blocks are cut at `SCAN_BLOCK_FACTOR × window` (or `max_fallback_block`
//! if smaller) so a large single-member file still streams in window-sized pieces.

use std::io::{self, Read};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;
use tracing::{debug, warn};

use crate::constants::{MAX_MEMBER_SIZE, SCAN_BLOCK_FACTOR};
use crate::headers::{read_header_or_eof, MemberHeader};
use crate::stream::io::read_exact_or_eof;
use crate::stream::source::scan::SignatureScanner;
use crate::stream::source::BlockSource;
use crate::stream::types::Block;
use crate::types::{Result, StreamError};

enum Phase {
    Probing,
    Delimited,
    Scanning(SignatureScanner),
    Done,
}

struct MemberState {
    reader: Box<dyn Read + Send>,
    next_index: u64,
    phase: Phase,
}

pub struct MemberSource {
    state: Mutex<MemberState>,
    window: usize,
    max_fallback_block: usize,
    total: Option<u64>,
    provided: AtomicU64,
}

impl MemberSource {
    pub fn new(
        reader: Box<dyn Read + Send>,
        window: usize,
        max_fallback_block: usize,
        total: Option<u64>,
    ) -> Self {
        Self {
            state: Mutex::new(MemberState { reader, next_index: 0, phase: Phase::Probing }),
            window,
            max_fallback_block,
            total,
            provided: AtomicU64::new(0),
        }
    }

    /// Largest block the scanner assembles.
    pub fn scan_cap(&self) -> usize {
        self.window.saturating_mul(SCAN_BLOCK_FACTOR).min(self.max_fallback_block)
    }

    /// True once the first header showed a size tag.
    pub fn is_delimited(&self) -> bool {
        matches!(self.state.lock().unwrap_or_else(PoisonError::into_inner).phase, Phase::Delimited)
    }

    fn next_bytes(&self, st: &mut MemberState) -> Result<Option<Vec<u8>>> {
        loop {
            match &mut st.phase {
                Phase::Done => return Ok(None),

                Phase::Probing => {
                    let Some(header) = read_header_or_eof(&mut st.reader)? else {
                        st.phase = Phase::Done;
                        return Ok(None);
                    };
                    if tagged_size(&header).is_some() {
                        debug!("member size tags present, delimited mode");
                        st.phase = Phase::Delimited;
                        return self.read_member(&mut st.reader, header, st.next_index).map(Some);
                    }
                    warn!("first member carries no size tag, scanning for member signatures");
                    st.phase = Phase::Scanning(SignatureScanner::new(
                        header.into_bytes(),
                        self.window,
                        self.scan_cap(),
                    ));
                }

                Phase::Delimited => {
                    let Some(header) = read_header_or_eof(&mut st.reader)? else {
                        st.phase = Phase::Done;
                        return Ok(None);
                    };
                    if tagged_size(&header).is_some() {
                        return self.read_member(&mut st.reader, header, st.next_index).map(Some);
                    }
                    warn!(index = st.next_index, "untagged member after delimited ones, reading tail as one block");
                    st.phase = Phase::Done;
                    return self.read_tail(&mut st.reader, header).map(Some);
                }

                Phase::Scanning(scanner) => {
                    return scanner.next_block(&mut st.reader).map_err(StreamError::SourceReadFailure);
                }
            }
        }
    }

    fn read_member(&self, r: &mut dyn Read, header: MemberHeader, index: u64) -> Result<Vec<u8>> {
        let declared = tagged_size(&header).unwrap_or(0) as usize;
        let header_len = header.encoded_len();
        if declared < header_len {
            return Err(StreamError::MalformedHeader(format!(
                "member {} declares {} bytes but its header alone is {}",
                index, declared, header_len
            )));
        }
        if declared > MAX_MEMBER_SIZE {
            return Err(StreamError::MalformedHeader(format!(
                "member {} declares {} bytes, limit is {}",
                index, declared, MAX_MEMBER_SIZE
            )));
        }

        let body = read_exact_or_eof(r, declared - header_len).map_err(StreamError::SourceReadFailure)?;
        if body.len() < declared - header_len {
            return Err(StreamError::SourceReadFailure(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!(
                    "stream ended inside member {}: {} of {} bytes",
                    index,
                    header_len + body.len(),
                    declared
                ),
            )));
        }

        let mut member = header.into_bytes();
        member.extend_from_slice(&body);
        Ok(member)
    }

    fn read_tail(&self, r: &mut dyn Read, header: MemberHeader) -> Result<Vec<u8>> {
        let mut tail = header.into_bytes();
        let limit = self.max_fallback_block.saturating_sub(tail.len()) as u64;
        r.take(limit + 1)
            .read_to_end(&mut tail)
            .map_err(StreamError::SourceReadFailure)?;
        if tail.len() > self.max_fallback_block {
            return Err(StreamError::UnsupportedFallback(format!(
                "untagged tail exceeds {} bytes",
                self.max_fallback_block
            )));
        }
        Ok(tail)
    }
}

/// Declared member size, ignoring a zero tag.
fn tagged_size(header: &MemberHeader) -> Option<u32> {
    header.member_size().filter(|&n| n > 0)
}

impl BlockSource for MemberSource {
    fn produce_next_block(&self) -> Result<Option<Block>> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(bytes) = self.next_bytes(&mut st)? else {
            return Ok(None);
        };

        let index = st.next_index;
        st.next_index += 1;
        self.provided.fetch_add(bytes.len() as u64, Ordering::Relaxed);
        Ok(Some(Block::new(index, Bytes::from(bytes))))
    }

    fn bytes_total(&self) -> Option<u64> {
        self.total
    }

    fn bytes_provided(&self) -> u64 {
        self.provided.load(Ordering::Relaxed)
    }
}
