//! Lock-protected job processor
//!
//! `initialize`, `advance` and `abort` must never interleave, so an abort
//! from another thread waits for the phase call in progress to return.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;

use super::processor::JobProcessor;
use crate::error::JobError;
use crate::model::Job;
use crate::traits::{EventSink, JobListener, Machine};

/// A [`JobProcessor`] behind one blocking mutex
///
/// Use `CriticalSectionRawMutex` when several threads or interrupt levels
/// share the processor, `NoopRawMutex` when only one does.
pub struct SharedJobProcessor<R: RawMutex, M, S = (), L = ()> {
    inner: Mutex<R, RefCell<JobProcessor<M, S, L>>>,
}

impl<R, M, S, L> SharedJobProcessor<R, M, S, L>
where
    R: RawMutex,
    M: Machine,
    S: EventSink,
    L: JobListener,
{
    pub fn new(processor: JobProcessor<M, S, L>) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(processor)),
        }
    }

    pub fn initialize(&self, job: Job) {
        self.inner.lock(|p| p.borrow_mut().initialize(job));
    }

    pub fn advance(&self) -> Result<bool, JobError> {
        self.inner.lock(|p| p.borrow_mut().advance())
    }

    pub fn abort(&self) {
        self.inner.lock(|p| p.borrow_mut().abort());
    }

    /// Read the processor while holding the lock
    pub fn with<T>(&self, f: impl FnOnce(&JobProcessor<M, S, L>) -> T) -> T {
        self.inner.lock(|p| f(&p.borrow()))
    }

    pub fn into_inner(self) -> JobProcessor<M, S, L> {
        self.inner.into_inner().into_inner()
    }
}
