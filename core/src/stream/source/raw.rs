use std::io::Read;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::stream::io::read_exact_or_eof;
use crate::stream::source::BlockSource;
use crate::stream::types::Block;
use crate::types::{Result, StreamError};

struct RawState {
    reader: Box<dyn Read + Send>,
    next_index: u64,
    eof: bool,
}

/// Fixed-size chunks of an uncompressed stream.
pub struct RawChunkSource {
    state: Mutex<RawState>,
    block_size: usize,
    total: Option<u64>,
    provided: AtomicU64,
}

impl RawChunkSource {
    pub fn new(reader: Box<dyn Read + Send>, block_size: usize, total: Option<u64>) -> Self {
        Self {
            state: Mutex::new(RawState { reader, next_index: 0, eof: false }),
            block_size,
            total,
            provided: AtomicU64::new(0),
        }
    }
}

impl BlockSource for RawChunkSource {
    fn produce_next_block(&self) -> Result<Option<Block>> {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if st.eof {
            return Ok(None);
        }

        let buf = read_exact_or_eof(&mut st.reader, self.block_size)
            .map_err(StreamError::SourceReadFailure)?;
        if buf.is_empty() {
            st.eof = true;
            return Ok(None);
        }
        // Short read means EOF; skip the extra zero-length read next time.
        if buf.len() < self.block_size {
            st.eof = true;
        }

        let index = st.next_index;
        st.next_index += 1;
        self.provided.fetch_add(buf.len() as u64, Ordering::Relaxed);
        Ok(Some(Block::new(index, buf)))
    }

    fn bytes_total(&self) -> Option<u64> {
        self.total
    }

    fn bytes_provided(&self) -> u64 {
        self.provided.load(Ordering::Relaxed)
    }
}
