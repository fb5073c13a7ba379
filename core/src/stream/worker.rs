//! stream/worker.rs
//!
//! Worker loops.
//!
//! - `run_block_worker`: one block in, one block out, same index. Used for
//!   compression and for delimited decompression.
//! - `run_sequential_worker`: the only worker of a fallback run. Every input
//!   block is fed into one continuing decoder; output blocks get their own
//!   fresh indices.
//!
//! Both gate on the writer before taking new work: when the out-queue plus the
//! reorder buffer hold `high_water` blocks, they wait for the writer instead of
//! pulling. A block already in hand is always delivered.

use std::io::{self, Read};
use std::time::{Duration, Instant};

use bytes::Bytes;
use crossbeam::channel::{Receiver, RecvTimeoutError, SendTimeoutError, Sender};
use tracing::{debug, trace};

use crate::compression::{decode_stream, BlockCompressor, BlockDecompressor};
use crate::stream::state::PipelineState;
use crate::stream::types::Block;
use crate::telemetry::{Stage, StageTimes, TelemetryCounters};
use crate::types::StreamError;

/// Per-block transform owned by one worker.
pub enum Transform {
    Compress(Box<dyn BlockCompressor>),
    Decompress(Box<dyn BlockDecompressor>),
}

impl Transform {
    fn stage(&self) -> Stage {
        match self {
            Transform::Compress(_) => Stage::Compress,
            Transform::Decompress(_) => Stage::Decompress,
        }
    }

    fn apply(&mut self, input: &[u8]) -> Result<Vec<u8>, StreamError> {
        let mut out = Vec::new();
        match self {
            Transform::Compress(c) => c.compress_block(input, &mut out)?,
            Transform::Decompress(d) => d.decompress_block(input, &mut out)?,
        }
        Ok(out)
    }
}

/// Queue ends and limits shared by all workers of a run.
pub struct WorkerPorts<'a> {
    pub state: &'a PipelineState,
    pub in_rx: Receiver<Block>,
    pub out_tx: Sender<Block>,
    pub high_water: usize,
    pub low_water: usize,
    pub idle_wait: Duration,
}

/// What a worker hands back when it exits.
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub counters: TelemetryCounters,
    pub stage_times: StageTimes,
}

impl WorkerPorts<'_> {
    /// Blocks until the writer has room, or the run stops. False on stop.
    fn wait_for_writer(&self) -> bool {
        use std::sync::atomic::Ordering;
        loop {
            if self.state.is_stopped() {
                return false;
            }
            let backlog = self.out_tx.len() + self.state.reorder_pending.load(Ordering::Acquire);
            if backlog < self.high_water {
                return true;
            }
            self.state.out_drained.wait(self.idle_wait);
        }
    }

    fn note_dequeue(&self) {
        if self.in_rx.len() <= self.low_water {
            self.state.in_low_water.set();
        }
    }
}

/// Sends `item`, retrying every idle period until it fits or the run stops.
pub fn send_until_stopped<T>(tx: &Sender<T>, mut item: T, state: &PipelineState, idle: Duration) -> bool {
    loop {
        match tx.send_timeout(item, idle) {
            Ok(()) => return true,
            Err(SendTimeoutError::Timeout(back)) => {
                if state.is_stopped() {
                    return false;
                }
                item = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => return false,
        }
    }
}

pub fn run_block_worker(id: usize, ports: WorkerPorts<'_>, mut transform: Transform) -> WorkerReport {
    let mut report = WorkerReport::default();
    let stage = transform.stage();
    debug!(worker = id, %stage, "worker started");

    loop {
        if !ports.wait_for_writer() {
            break;
        }
        let block = match ports.in_rx.recv_timeout(ports.idle_wait) {
            Ok(block) => block,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        ports.note_dequeue();

        let t = Instant::now();
        let out = match transform.apply(block.bytes()) {
            Ok(out) => out,
            Err(e) => {
                ports.state.fail(e);
                break;
            }
        };
        report.stage_times.add(stage, t.elapsed());
        report.counters.add_processed();
        trace!(worker = id, index = block.index, in_len = block.effective_size, out_len = out.len(), "block done");

        if !send_until_stopped(&ports.out_tx, Block::new(block.index, Bytes::from(out)), ports.state, ports.idle_wait) {
            break;
        }
    }

    debug!(worker = id, processed = report.counters.blocks_processed, "worker finished");
    report
}

/// `Read` over the payloads of an in-queue, in arrival order.
/// Reports EOF when the reader hangs up and an error once the run is stopped.
struct BlockFeed<'p, 'a> {
    ports: &'p WorkerPorts<'a>,
    current: Bytes,
    pos: usize,
}

impl Read for BlockFeed<'_, '_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.current.len() {
            if self.ports.state.is_stopped() {
                return Err(io::Error::new(io::ErrorKind::Other, "pipeline stopped"));
            }
            match self.ports.in_rx.recv_timeout(self.ports.idle_wait) {
                Ok(block) => {
                    self.ports.note_dequeue();
                    self.current = block.payload.slice(..block.effective_size);
                    self.pos = 0;
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(0),
            }
        }
        let n = buf.len().min(self.current.len() - self.pos);
        buf[..n].copy_from_slice(&self.current[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

pub fn run_sequential_worker(ports: WorkerPorts<'_>, chunk_size: usize) -> WorkerReport {
    let mut report = WorkerReport::default();
    debug!("sequential worker started");

    let feed = BlockFeed { ports: &ports, current: Bytes::new(), pos: 0 };
    let mut chunks = decode_stream(feed, chunk_size);
    let mut index = 0u64;

    loop {
        if !ports.wait_for_writer() {
            break;
        }
        let t = Instant::now();
        let next = chunks.next();
        report.stage_times.add(Stage::Decompress, t.elapsed());

        let chunk = match next {
            None => break,
            Some(Ok(chunk)) => chunk,
            Some(Err(e)) => {
                if !ports.state.is_stopped() {
                    ports.state.fail(e.into());
                }
                break;
            }
        };
        report.counters.add_processed();

        if !send_until_stopped(&ports.out_tx, Block::new(index, Bytes::from(chunk)), ports.state, ports.idle_wait) {
            break;
        }
        index += 1;
    }

    debug!(blocks = index, "sequential worker finished");
    report
}
