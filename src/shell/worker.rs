//! Runs at most one external command at a time, off the interactive task.

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Condvar, Mutex, MutexGuard, PoisonError,
    },
    time::{Duration, Instant},
};

use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{info, warn};

use super::sink::{EventSender, JobId};
use crate::process::{run_job, Invocation, JobOutcome};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("busy: a command is already running")]
    Busy,
}

/// The one-job slot. Held while a job is live; releasing it wakes anyone
/// waiting in [`JobGate::wait_free`].
#[derive(Debug, Default)]
struct JobGate {
    busy: Mutex<bool>,
    released: Condvar,
}

impl JobGate {
    fn lock(&self) -> MutexGuard<'_, bool> {
        self.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn try_acquire(&self) -> bool {
        let mut busy = self.lock();
        if *busy {
            return false;
        }
        *busy = true;
        true
    }

    fn release(&self) {
        *self.lock() = false;
        self.released.notify_all();
    }

    fn is_busy(&self) -> bool {
        *self.lock()
    }

    fn wait_free(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        let mut busy = self.lock();
        while *busy {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return false;
            }
            busy = match self.released.wait_timeout(busy, remaining) {
                Ok((guard, _)) => guard,
                Err(poisoned) => poisoned.into_inner().0,
            };
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionWorker {
    handle: Handle,
    events: EventSender,
    timeout: Duration,
    gate: Arc<JobGate>,
    next_id: Arc<AtomicU64>,
}

impl ExecutionWorker {
    pub fn new(handle: Handle, events: EventSender, timeout: Duration) -> Self {
        ExecutionWorker {
            handle,
            events,
            timeout,
            gate: Arc::new(JobGate::default()),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_busy(&self) -> bool {
        self.gate.is_busy()
    }

    /// Waits out the gap between a job's `Finished` event and the release of
    /// its slot. Returns false if the worker is still busy after `limit`.
    pub fn settle(&self, limit: Duration) -> bool {
        self.gate.wait_free(limit)
    }

    /// Starts `invocation` on the runtime and returns immediately. A second
    /// submission while a job is live is rejected, never queued.
    pub fn submit(&self, invocation: Invocation) -> Result<JobId, SubmitError> {
        if !self.gate.try_acquire() {
            warn!(program = %invocation.program, "submission rejected, job already running");
            return Err(SubmitError::Busy);
        }

        let job = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut slot = JobSlot {
            job,
            events: self.events.clone(),
            gate: Arc::clone(&self.gate),
            reported: false,
        };
        let timeout = self.timeout;
        info!(job, program = %invocation.program, "job submitted");

        self.handle.spawn(async move {
            let outcome = run_job(job, &invocation, timeout, &slot.events).await;
            slot.finish(outcome);
        });
        Ok(job)
    }
}

/// Holds the gate for one job. `Finished` is always enqueued before the
/// gate is released, so every event of job N precedes any event of job N+1.
struct JobSlot {
    job: JobId,
    events: EventSender,
    gate: Arc<JobGate>,
    reported: bool,
}

impl JobSlot {
    fn finish(&mut self, outcome: JobOutcome) {
        self.events.finished(self.job, outcome);
        self.reported = true;
    }
}

impl Drop for JobSlot {
    fn drop(&mut self) {
        if !self.reported {
            warn!(job = self.job, "job task ended without reporting");
            self.events.finished(self.job, JobOutcome::Aborted);
        }
        self.gate.release();
    }
}
