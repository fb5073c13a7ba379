// ## Pipeline coordinator: reader, worker pool, ordered writer

use std::io::Write;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{debug, info, trace, warn};

use crate::compression::{GzipMemberCompressor, GzipMemberDecompressor};
use crate::headers::parse_from_buffer;
use crate::stream::config::PipelineConfig;
use crate::stream::parallelism::ParallelismProfile;
use crate::stream::reorder::ReorderBuffer;
use crate::stream::source::BlockSource;
use crate::stream::state::PipelineState;
use crate::stream::types::{Block, DecodeStrategy, Mode, PipelineStatus};
use crate::stream::worker::{
    run_block_worker, run_sequential_worker, send_until_stopped, Transform, WorkerPorts, WorkerReport,
};
use crate::telemetry::{Stage, TelemetryCounters, TelemetryTimer};
use crate::types::StreamError;

/// Everything the coordinator learned by the time all roles exited.
#[derive(Debug)]
pub struct RunOutcome {
    pub counters: TelemetryCounters,
    pub timer: TelemetryTimer,
    pub workers_used: usize,
    pub strategy: Option<DecodeStrategy>,
}

/// Scale-out decision taken once, from block 0.
fn classify(mode: Mode, first: &Block, profile: &ParallelismProfile) -> (usize, Option<DecodeStrategy>) {
    match mode {
        Mode::Compress => (profile.worker_count, None),
        Mode::Decompress => {
            let tagged = parse_from_buffer(first.bytes())
                .ok()
                .and_then(|h| h.member_size())
                .is_some_and(|n| n > 0);
            if tagged {
                (profile.worker_count, Some(DecodeStrategy::Parallel))
            } else {
                warn!("block 0 carries no member size, decoding sequentially on one worker");
                (1, Some(DecodeStrategy::Sequential))
            }
        }
    }
}

fn wait_for_first_block(first_rx: &Receiver<Block>, state: &PipelineState, idle: Duration) -> Option<Block> {
    loop {
        if state.is_stopped() {
            return None;
        }
        match first_rx.recv_timeout(idle) {
            Ok(block) => return Some(block),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return None,
        }
    }
}

fn run_reader(
    source: &dyn BlockSource,
    in_tx: Sender<Block>,
    first_tx: Sender<Block>,
    state: &PipelineState,
    profile: &ParallelismProfile,
    idle: Duration,
) -> WorkerReport {
    let mut report = WorkerReport::default();
    let mut first = Some(first_tx);

    loop {
        if state.is_stopped() {
            break;
        }
        if in_tx.len() >= profile.high_water {
            trace!(queued = in_tx.len(), "reader suspended on high water");
            while in_tx.len() > profile.low_water && !state.is_stopped() {
                state.in_low_water.wait(idle);
            }
            continue;
        }

        let t = Instant::now();
        let block = match source.produce_next_block() {
            Ok(Some(block)) => block,
            Ok(None) => {
                debug!(blocks = report.counters.blocks_read, "source exhausted");
                break;
            }
            Err(e) => {
                state.fail(e);
                break;
            }
        };
        report.stage_times.add(Stage::Read, t.elapsed());
        report.counters.add_read(block.effective_size);
        state.next_read_index.store(block.index + 1, Ordering::Release);

        if let Some(first) = first.take() {
            // Bytes clone: shares the buffer.
            let _ = first.send(block.clone());
        }
        if !send_until_stopped(&in_tx, block, state, idle) {
            break;
        }
    }
    report
}

fn run_writer(
    out_rx: Receiver<Block>,
    sink: &mut (dyn Write + Send),
    state: &PipelineState,
    idle: Duration,
) -> WorkerReport {
    let mut report = WorkerReport::default();
    let mut reorder = ReorderBuffer::new();

    loop {
        if state.is_stopped() {
            break;
        }
        let block = match out_rx.recv_timeout(idle) {
            Ok(block) => block,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        let ready = match reorder.push(block.index, block) {
            Ok(ready) => ready,
            Err(e) => {
                state.fail(e);
                break;
            }
        };
        if ready.is_empty() {
            report.counters.add_reordered();
        }

        for b in ready {
            let t = Instant::now();
            if let Err(e) = sink.write_all(b.bytes()) {
                state.fail(StreamError::SinkWriteFailure(e));
                return report;
            }
            report.stage_times.add(Stage::Write, t.elapsed());
            report.counters.add_written(b.effective_size);
        }
        state.next_write_index.store(reorder.next_index(), Ordering::Release);
        state.reorder_pending.store(reorder.pending_len(), Ordering::Release);
        state.out_drained.set();
    }

    if state.is_stopped() {
        // Partial output stays where it is.
        if let Err(e) = sink.flush() {
            warn!(error = %e, "flush of partial output failed after stop");
        }
        return report;
    }
    if !reorder.is_empty() {
        state.fail(StreamError::Pipeline(format!(
            "{} blocks left in reorder buffer, block {} never arrived",
            reorder.pending_len(),
            reorder.next_index()
        )));
    } else if let Err(e) = sink.flush() {
        state.fail(StreamError::SinkWriteFailure(e));
    }
    report
}

fn make_transform(mode: Mode, config: &PipelineConfig) -> Result<Transform, StreamError> {
    Ok(match mode {
        Mode::Compress => Transform::Compress(GzipMemberCompressor::boxed(config.compression_level)?),
        Mode::Decompress => Transform::Decompress(GzipMemberDecompressor::boxed()),
    })
}

fn join_report(handle: thread::ScopedJoinHandle<'_, WorkerReport>, role: &str, state: &PipelineState) -> WorkerReport {
    handle.join().unwrap_or_else(|_| {
        state.fail(StreamError::Pipeline(format!("{} thread panicked", role)));
        WorkerReport::default()
    })
}

/// Runs one pipeline to completion on the calling thread's scope and returns its telemetry.
/// Failures are recorded in `state`, never returned.
pub fn run_pipeline(
    mode: Mode,
    source: &dyn BlockSource,
    sink: &mut (dyn Write + Send),
    config: &PipelineConfig,
    profile: &ParallelismProfile,
    state: &PipelineState,
) -> RunOutcome {
    let mut timer = TelemetryTimer::new();
    let mut counters = TelemetryCounters::default();
    let idle = config.idle_wait;

    state.set_status(PipelineStatus::Running);
    info!(%mode, max_workers = profile.worker_count, high_water = profile.high_water, "pipeline started");

    let (in_tx, in_rx) = bounded::<Block>(profile.high_water);
    let (out_tx, out_rx) = bounded::<Block>(profile.high_water);
    let (first_tx, first_rx) = bounded::<Block>(1);

    let (workers_used, strategy) = thread::scope(|scope| {
        let reader = scope.spawn(move || run_reader(source, in_tx, first_tx, state, profile, idle));
        let writer = scope.spawn(move || run_writer(out_rx, sink, state, idle));

        // ---- One-shot scale-out from block 0 ----
        let (n, strategy) = match wait_for_first_block(&first_rx, state, idle) {
            Some(first) => classify(mode, &first, profile),
            None => (0, None),
        };
        if let Some(s) = strategy {
            state.set_strategy(s);
        }

        let mut workers = Vec::with_capacity(n);
        for id in 0..n {
            let ports = WorkerPorts {
                state,
                in_rx: in_rx.clone(),
                out_tx: out_tx.clone(),
                high_water: profile.high_water,
                low_water: profile.low_water,
                idle_wait: idle,
            };
            if strategy == Some(DecodeStrategy::Sequential) {
                let chunk = config.block_size;
                workers.push(scope.spawn(move || run_sequential_worker(ports, chunk)));
                continue;
            }
            match make_transform(mode, config) {
                Ok(transform) => workers.push(scope.spawn(move || run_block_worker(id, ports, transform))),
                Err(e) => {
                    state.fail(e);
                    break;
                }
            }
        }
        state.workers_spawned.store(workers.len(), Ordering::Release);
        debug!(workers = workers.len(), ?strategy, "workers spawned");

        drop(in_rx);
        drop(out_tx);

        let mut reports = vec![join_report(reader, "reader", state)];
        for w in workers {
            reports.push(join_report(w, "worker", state));
        }
        reports.push(join_report(writer, "writer", state));

        for r in &reports {
            counters.merge(&r.counters);
            timer.stage_times.merge(&r.stage_times);
        }
        (reports.len().saturating_sub(2), strategy)
    });
    timer.finish();

    if !state.has_error() {
        if state.is_stopped() {
            state.fail(StreamError::Stopped);
        } else {
            state.set_status(PipelineStatus::Completed);
        }
    }
    info!(
        status = ?state.status(),
        blocks_in = counters.blocks_read,
        blocks_out = counters.blocks_written,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "pipeline finished"
    );

    RunOutcome { counters, timer, workers_used, strategy }
}
