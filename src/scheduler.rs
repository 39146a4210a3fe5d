//! Job scheduler: the retry state machine driving flush attempts.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use crate::error::EngineResult;

/// Aggregate sync health, published for UI indicators.
///
/// Always derived from the consecutive-failure count and the current
/// execution phase; never set independently of the scheduler's
/// transition rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// No work armed and nothing in flight.
    Idle,
    /// A flush attempt is in flight.
    Running,
    /// Recent attempts failed; retries are scheduled.
    Recovering,
    /// The failure streak passed the escalation threshold.
    Failed,
}

impl SyncStatus {
    /// True when all collected work has been confirmed or aborted.
    pub fn is_settled(&self) -> bool {
        matches!(self, SyncStatus::Idle)
    }

    /// How a UI indicator should render this status.
    pub fn severity(&self) -> StatusSeverity {
        match self {
            SyncStatus::Idle | SyncStatus::Running => StatusSeverity::None,
            SyncStatus::Recovering => StatusSeverity::Soft,
            SyncStatus::Failed => StatusSeverity::Hard,
        }
    }
}

/// Severity of a published status, for sync-health indicators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSeverity {
    /// Nothing to show.
    None,
    /// Soft warning: saves are being retried.
    Soft,
    /// Hard warning: saves have repeatedly failed.
    Hard,
}

/// One schedulable unit of retryable work.
///
/// A job is constructed fresh per flush and is a probe over the shared
/// queues: it reads them at call time and never captures transaction
/// payloads by value, so replacing an unexecuted job loses nothing.
pub trait SyncJob: Send + Sync {
    /// Runs one attempt. A retryable error re-arms the job for the next
    /// recovery tick; any other outcome clears it.
    fn run(&self) -> EngineResult<()>;
}

/// Observer callback invoked on every published status change.
pub type StatusObserver = Box<dyn Fn(SyncStatus) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Start,
    End,
}

/// The retry state machine.
///
/// Owns exactly one "next job" slot (last write wins) and serializes all
/// execution: a call to [`execute`] while another is outstanding is a
/// no-op, so at most one flush is ever in flight.
///
/// [`execute`]: JobScheduler::execute
pub struct JobScheduler {
    slot: Mutex<Option<Arc<dyn SyncJob>>>,
    failed_attempts: AtomicU32,
    status: RwLock<SyncStatus>,
    executing: AtomicBool,
    observers: Mutex<Vec<StatusObserver>>,
    max_retry_recovery: u32,
}

impl JobScheduler {
    /// Creates an idle scheduler that escalates to failed after
    /// `max_retry_recovery` consecutive retryable failures.
    pub fn new(max_retry_recovery: u32) -> Self {
        Self {
            slot: Mutex::new(None),
            failed_attempts: AtomicU32::new(0),
            status: RwLock::new(SyncStatus::Idle),
            executing: AtomicBool::new(false),
            observers: Mutex::new(Vec::new()),
            max_retry_recovery,
        }
    }

    /// Current published status.
    pub fn status(&self) -> SyncStatus {
        *self.status.read()
    }

    /// Consecutive retryable failures of the armed job.
    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts.load(Ordering::SeqCst)
    }

    /// True if a job is armed and waiting to run.
    pub fn has_scheduled_job(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Registers an observer called on every published status change.
    pub fn subscribe(&self, observer: StatusObserver) {
        self.observers.lock().push(observer);
    }

    /// Arms `job` as the next unit of work, replacing whatever was armed
    /// before, and runs it immediately when the machine is idle.
    pub fn schedule(&self, job: Arc<dyn SyncJob>) {
        *self.slot.lock() = Some(job);
        if self.status() == SyncStatus::Idle {
            self.execute();
        }
    }

    /// Takes and runs the armed job, if any.
    ///
    /// A call while another execution is outstanding is a no-op; the
    /// recovery timers re-invoke this later. After a successful run the
    /// slot is drained again, so a job scheduled during the round trip
    /// runs without waiting for a timer. After a retryable failure the
    /// job is re-armed and execution stops: retries are purely
    /// timer-driven.
    pub fn execute(&self) {
        if self
            .executing
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return;
        }

        loop {
            let next = self.slot.lock().take();
            let Some(job) = next else { break };

            self.publish(Phase::Start);

            match job.run() {
                Ok(()) => {
                    self.failed_attempts.store(0, Ordering::SeqCst);
                    self.publish(Phase::End);
                }
                Err(err) if err.is_retryable() => {
                    let attempts = self.failed_attempts.fetch_add(1, Ordering::SeqCst) + 1;
                    tracing::warn!(
                        attempts,
                        error = %err,
                        "flush attempt failed, awaiting recovery tick"
                    );
                    self.publish(Phase::End);
                    let mut slot = self.slot.lock();
                    if slot.is_none() {
                        *slot = Some(job);
                    }
                    break;
                }
                Err(err) => {
                    // Retrying the same job cannot fix this, and the job
                    // has already surfaced it to the user. Reset as if
                    // successful instead of looping forever.
                    tracing::warn!(error = %err, "flush aborted");
                    self.failed_attempts.store(0, Ordering::SeqCst);
                    self.publish(Phase::End);
                }
            }
        }

        self.executing.store(false, Ordering::SeqCst);
    }

    /// Derives the status for `phase`, publishes it, and notifies
    /// observers when it changed.
    fn publish(&self, phase: Phase) {
        let next = derive_status(self.failed_attempts(), phase, self.max_retry_recovery);
        let changed = {
            let mut status = self.status.write();
            if *status == next {
                false
            } else {
                *status = next;
                true
            }
        };
        if changed {
            for observer in self.observers.lock().iter() {
                observer(next);
            }
        }
    }
}

/// Pure status derivation from the failure streak and execution phase.
fn derive_status(failed_attempts: u32, phase: Phase, max_retry_recovery: u32) -> SyncStatus {
    if failed_attempts == 0 {
        if phase == Phase::Start {
            SyncStatus::Running
        } else {
            SyncStatus::Idle
        }
    } else if failed_attempts < max_retry_recovery {
        SyncStatus::Recovering
    } else {
        SyncStatus::Failed
    }
}
