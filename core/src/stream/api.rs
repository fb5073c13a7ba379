// ## Public API: begin a run, observe it, dispose of it

use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::stream::config::PipelineConfig;
use crate::stream::io::{open_input, open_output, InputSource, OutputSink};
use crate::stream::pipeline::{run_pipeline, RunOutcome};
use crate::stream::source::{source_for, BlockSource};
use crate::stream::state::{ErrorCallback, PipelineState};
use crate::stream::types::{DecodeStrategy, Mode, PipelineStatus};
use crate::telemetry::TelemetrySnapshot;
use crate::types::{Result, StreamError};

const JOIN_POLL: Duration = Duration::from_millis(5);

pub struct PipelineBuilder {
    mode: Mode,
    config: PipelineConfig,
    on_error: Option<ErrorCallback>,
}

impl PipelineBuilder {
    pub fn new(mode: Mode) -> Self {
        Self { mode, config: PipelineConfig::default(), on_error: None }
    }

    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Called once, with the first error of the run, on the thread that raised it.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&StreamError) + Send + Sync + 'static,
    {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Validates, opens both ends and starts the pipeline in the background.
    ///
    /// # Errors
    /// - `Validation` for a bad config
    /// - `EmptyInput` when the input is known to be zero-length; the output is not created
    /// - `SourceReadFailure` / `SinkWriteFailure` when an end cannot be opened
    pub fn begin(self, input: InputSource, output: OutputSink) -> Result<PipelineHandle> {
        self.config.validate()?;

        let opened = open_input(input)?;
        if opened.len == Some(0) {
            return Err(StreamError::EmptyInput);
        }
        let (mut sink, captured) = open_output(output)?;

        let mode = self.mode;
        let config = self.config;
        let profile = config.profile();
        let source: Arc<dyn BlockSource> = Arc::from(source_for(mode, opened.reader, opened.len, &config));
        let state = Arc::new(PipelineState::new(self.on_error));
        state.set_status(PipelineStatus::Running);

        let join_timeout = config.join_timeout;
        let run_source = source.clone();
        let run_state = state.clone();
        let supervisor = thread::Builder::new()
            .name(format!("gzblock-{}", mode))
            .spawn(move || {
                run_pipeline(mode, run_source.as_ref(), sink.as_mut(), &config, &profile, &run_state)
            })
            .map_err(|e| StreamError::Pipeline(format!("failed to spawn pipeline thread: {}", e)))?;

        Ok(PipelineHandle {
            mode,
            state,
            source,
            supervisor: Mutex::new(Some(supervisor)),
            captured,
            join_timeout,
        })
    }
}

/// Starts a run with the default configuration.
pub fn begin(input: InputSource, output: OutputSink, mode: Mode) -> Result<PipelineHandle> {
    PipelineBuilder::new(mode).begin(input, output)
}

/// Caller's view of a running pipeline.
pub struct PipelineHandle {
    mode: Mode,
    state: Arc<PipelineState>,
    source: Arc<dyn BlockSource>,
    supervisor: Mutex<Option<JoinHandle<RunOutcome>>>,
    captured: Option<Arc<Mutex<Vec<u8>>>>,
    join_timeout: Duration,
}

impl PipelineHandle {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn status(&self) -> PipelineStatus {
        self.state.status()
    }

    pub fn is_done(&self) -> bool {
        self.status().is_terminal()
    }

    /// Input consumed so far, in percent. Stays at 0.0 when the input length is unknown.
    pub fn percent_done(&self) -> f64 {
        match self.source.bytes_total() {
            Some(total) if total > 0 => {
                (self.source.bytes_provided() as f64 / total as f64 * 100.0).min(100.0)
            }
            _ => 0.0,
        }
    }

    /// Blocks handed to the in-queue so far.
    pub fn blocks_read(&self) -> u64 {
        self.state.next_read_index.load(Ordering::Acquire)
    }

    /// Blocks written to the sink so far, in order.
    pub fn blocks_written(&self) -> u64 {
        self.state.next_write_index.load(Ordering::Acquire)
    }

    pub fn error(&self) -> Option<Arc<StreamError>> {
        self.state.error()
    }

    pub fn workers_spawned(&self) -> usize {
        self.state.workers_spawned.load(Ordering::Acquire)
    }

    pub fn decode_strategy(&self) -> Option<DecodeStrategy> {
        self.state.strategy()
    }

    /// Requests shutdown and waits up to `join_timeout` for the pipeline thread.
    /// Safe to call any number of times.
    pub fn dispose(&self) {
        self.state.request_stop();
        let Some(handle) = self.supervisor.lock().unwrap_or_else(PoisonError::into_inner).take() else {
            return;
        };

        let deadline = Instant::now() + self.join_timeout;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!(timeout_ms = self.join_timeout.as_millis() as u64, "pipeline thread still running after dispose, detaching");
                return;
            }
            thread::sleep(JOIN_POLL);
        }
        let _ = handle.join();
        info!(status = ?self.status(), "pipeline disposed");
    }

    /// Blocks until the run ends.
    ///
    /// # Returns
    /// - `Ok(snapshot)` with the captured output attached for `OutputSink::Memory`
    /// - `Err(e)` with the first error of the run
    pub fn wait(self) -> Result<TelemetrySnapshot> {
        let handle = self.supervisor.lock().unwrap_or_else(PoisonError::into_inner).take();
        let outcome = match handle {
            Some(h) => h.join().map_err(|_| StreamError::Pipeline("pipeline thread panicked".into()))?,
            None => return Err(self.take_error().unwrap_or(StreamError::Stopped)),
        };

        if let Some(e) = self.take_error() {
            return Err(e);
        }

        let mut snapshot = TelemetrySnapshot::from(
            self.mode,
            &outcome.counters,
            &outcome.timer,
            outcome.workers_used,
            outcome.strategy,
        );
        if let Some(buf) = &self.captured {
            let out = std::mem::take(&mut *buf.lock().unwrap_or_else(PoisonError::into_inner));
            snapshot.attach_output(out);
        }
        Ok(snapshot)
    }

    /// Moves the recorded error out; falls back to its message if the caller still holds a clone.
    fn take_error(&self) -> Option<StreamError> {
        self.state
            .take_error()
            .map(|e| Arc::try_unwrap(e).unwrap_or_else(|shared| StreamError::Pipeline(shared.to_string())))
    }
}

impl Drop for PipelineHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// Runs a compression to completion.
pub fn compress_stream(input: InputSource, output: OutputSink, config: &PipelineConfig) -> Result<TelemetrySnapshot> {
    PipelineBuilder::new(Mode::Compress).config(config.clone()).begin(input, output)?.wait()
}

/// Runs a decompression to completion.
pub fn decompress_stream(input: InputSource, output: OutputSink, config: &PipelineConfig) -> Result<TelemetrySnapshot> {
    PipelineBuilder::new(Mode::Decompress).config(config.clone()).begin(input, output)?.wait()
}

fn run_in_memory(mode: Mode, data: &[u8], config: &PipelineConfig) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let snapshot = PipelineBuilder::new(mode)
        .config(config.clone())
        .begin(InputSource::Memory(data.to_vec()), OutputSink::Memory)?
        .wait()?;
    Ok(snapshot.output.unwrap_or_default())
}

/// Compresses a buffer into a size-tagged multi-member container. Empty in, empty out.
pub fn compress_bytes(data: &[u8], config: &PipelineConfig) -> Result<Vec<u8>> {
    run_in_memory(Mode::Compress, data, config)
}

/// Decompresses any gzip data (size-tagged or not). Empty in, empty out.
pub fn decompress_bytes(data: &[u8], config: &PipelineConfig) -> Result<Vec<u8>> {
    run_in_memory(Mode::Decompress, data, config)
}
