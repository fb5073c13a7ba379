//! stream/state.rs
//!
//! Shared pipeline state: one value, created per run, referenced by every role.
//! Each mutable field carries its own synchronization; nothing here is global.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;

use crate::stream::signal::Signal;
use crate::stream::types::{DecodeStrategy, PipelineStatus};
use crate::types::StreamError;

pub type ErrorCallback = Box<dyn Fn(&StreamError) + Send + Sync>;

pub struct PipelineState {
    stop: AtomicBool,
    status: AtomicU8,
    error: Mutex<Option<Arc<StreamError>>>,
    on_error: Option<ErrorCallback>,

    pub next_read_index: AtomicU64,
    pub next_write_index: AtomicU64,
    /// Blocks parked in the writer's reorder buffer.
    pub reorder_pending: AtomicUsize,
    pub workers_spawned: AtomicUsize,
    strategy: Mutex<Option<DecodeStrategy>>,

    /// Workers -> reader: the in-queue dropped to the low-water mark.
    pub in_low_water: Signal,
    /// Writer -> workers: the writer drained something.
    pub out_drained: Signal,
}

impl PipelineState {
    pub fn new(on_error: Option<ErrorCallback>) -> Self {
        Self {
            stop: AtomicBool::new(false),
            status: AtomicU8::new(PipelineStatus::Idle.into()),
            error: Mutex::new(None),
            on_error,
            next_read_index: AtomicU64::new(0),
            next_write_index: AtomicU64::new(0),
            reorder_pending: AtomicUsize::new(0),
            workers_spawned: AtomicUsize::new(0),
            strategy: Mutex::new(None),
            in_low_water: Signal::new(),
            out_drained: Signal::new(),
        }
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus::try_from(self.status.load(Ordering::Acquire)).unwrap_or(PipelineStatus::Failed)
    }

    pub fn set_status(&self, status: PipelineStatus) {
        self.status.store(status.into(), Ordering::Release);
    }

    /// Records `e` if no error was recorded yet, then stops the pipeline.
    /// Returns true for the first error.
    pub fn fail(&self, e: StreamError) -> bool {
        let first = {
            let mut slot = self.error.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_some() {
                None
            } else {
                let shared = Arc::new(e);
                *slot = Some(shared.clone());
                Some(shared)
            }
        };
        self.request_stop();

        match first {
            Some(e) => {
                error!(error = %e, "pipeline failed");
                self.set_status(PipelineStatus::Failed);
                if let Some(cb) = &self.on_error {
                    cb(&e);
                }
                true
            }
            None => false,
        }
    }

    pub fn error(&self) -> Option<Arc<StreamError>> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn take_error(&self) -> Option<Arc<StreamError>> {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).take()
    }

    pub fn has_error(&self) -> bool {
        self.error.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn set_strategy(&self, strategy: DecodeStrategy) {
        *self.strategy.lock().unwrap_or_else(PoisonError::into_inner) = Some(strategy);
    }

    pub fn strategy(&self) -> Option<DecodeStrategy> {
        *self.strategy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
