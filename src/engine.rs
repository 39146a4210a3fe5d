//! The sync engine: collection tick, recovery timers, status publishing
//! and the session shutdown guard.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::time::Instant;

use crate::config::SyncConfig;
use crate::flush::FlushJob;
use crate::protocol::Transaction;
use crate::queue::TransactionQueues;
use crate::scheduler::{JobScheduler, StatusObserver, SyncStatus};
use crate::transport::SyncTransport;

/// Source of newly produced local edit transactions.
///
/// Implemented by the mutation-tracking layer and polled once per collect
/// tick. Each call returns the transactions produced since the previous
/// call, in production order; the engine never asks twice for the same
/// transaction.
pub trait MutationSource: Send + Sync {
    /// Returns the transactions produced since the last call.
    fn collect_local_transactions(&self) -> Vec<Transaction>;
}

impl<S: MutationSource + ?Sized> MutationSource for Arc<S> {
    fn collect_local_transactions(&self) -> Vec<Transaction> {
        (**self).collect_local_transactions()
    }
}

/// Blocking user decision point for remote-edit conflicts.
///
/// Invoked at most once per conflicting flush, from the scheduling
/// context. The pending transactions are dropped whatever the answer;
/// the answer only decides whether the surrounding app reloads.
pub trait ConflictPrompt: Send + Sync {
    /// Asks the user whether to reload; returns true if they accepted.
    fn confirm_reload(&self, message: &str) -> bool;
}

impl<P: ConflictPrompt + ?Sized> ConflictPrompt for Arc<P> {
    fn confirm_reload(&self, message: &str) -> bool {
        (**self).confirm_reload(message)
    }
}

/// The optimistic mutation sync engine for one editing session.
///
/// Owns the batching queues, the remote version counter and the job
/// scheduler exclusively. External components only feed transactions in
/// through the [`MutationSource`] and read status out through
/// [`status`]/[`subscribe`].
///
/// [`status`]: SyncEngine::status
/// [`subscribe`]: SyncEngine::subscribe
pub struct SyncEngine<T, S, P> {
    config: SyncConfig,
    transport: Arc<T>,
    source: Arc<S>,
    prompt: Arc<P>,
    queues: Arc<Mutex<TransactionQueues>>,
    version: Arc<AtomicU64>,
    scheduler: Arc<JobScheduler>,
}

impl<T, S, P> SyncEngine<T, S, P>
where
    T: SyncTransport + 'static,
    S: MutationSource,
    P: ConflictPrompt + 'static,
{
    /// Creates an idle engine for one session.
    pub fn new(config: SyncConfig, transport: T, source: S, prompt: P) -> Self {
        let scheduler = Arc::new(JobScheduler::new(config.max_retry_recovery));
        let version = Arc::new(AtomicU64::new(config.initial_version));
        Self {
            config,
            transport: Arc::new(transport),
            source: Arc::new(source),
            prompt: Arc::new(prompt),
            queues: Arc::new(Mutex::new(TransactionQueues::new())),
            version,
            scheduler,
        }
    }

    /// Current published status.
    pub fn status(&self) -> SyncStatus {
        self.scheduler.status()
    }

    /// Registers an observer called on every published status change.
    pub fn subscribe(&self, observer: StatusObserver) {
        self.scheduler.subscribe(observer);
    }

    /// Consecutive retryable failures of the current flush.
    pub fn failed_attempts(&self) -> u32 {
        self.scheduler.failed_attempts()
    }

    /// Version this session believes the server holds.
    pub fn remote_version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Collection tick: pulls newly produced transactions and, if there
    /// are any, schedules a fresh flush over them.
    pub fn tick_collect(&self) {
        let transactions = self.source.collect_local_transactions();
        if transactions.is_empty() {
            return;
        }
        tracing::debug!(count = transactions.len(), "collected local transactions");
        self.queues.lock().collect(transactions);

        let job = FlushJob::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.prompt),
            Arc::clone(&self.queues),
            Arc::clone(&self.version),
            self.config.document_id.clone(),
            self.config.build_id.clone(),
        );
        self.scheduler.schedule(Arc::new(job));
    }

    /// Recovery tick: re-runs the armed job while status is recovering.
    /// A no-op in every other status; never schedules new jobs.
    pub fn tick_recovery(&self) {
        if self.scheduler.status() == SyncStatus::Recovering {
            self.scheduler.execute();
        }
    }

    /// Error tick: re-runs the armed job after escalation to failed.
    /// A no-op in every other status; never schedules new jobs.
    pub fn tick_error(&self) {
        if self.scheduler.status() == SyncStatus::Failed {
            self.scheduler.execute();
        }
    }

    /// True while any collected work has not been confirmed by the server
    /// or aborted on a conflict.
    pub fn has_unsynced_work(&self) -> bool {
        !self.status().is_settled() || !self.queues.lock().is_empty()
    }

    /// Teardown hook: the warning to surface before closing the session,
    /// or `None` when everything is synced.
    pub fn teardown_warning(&self) -> Option<String> {
        self.has_unsynced_work().then(|| {
            "Some changes have not been saved yet. Leaving now may lose them.".to_string()
        })
    }

    /// Drives the engine until `shutdown` receives a message or its
    /// sender is dropped.
    ///
    /// One deadline-based loop stands in for three independent timers:
    /// the collect tick, the recovery tick and the error tick all fire
    /// from here, so queue and scheduler mutation is serialized in a
    /// single cooperative context and at most one flush can be running.
    pub fn run(&self, shutdown: Receiver<()>) {
        let now = Instant::now();
        let mut next_collect = now + self.config.collect_interval;
        let mut next_recovery = now + self.config.recovery_interval;
        let mut next_error = now + self.config.error_interval;

        tracing::info!(
            document_id = %self.config.document_id,
            version = self.remote_version(),
            "sync engine started"
        );

        loop {
            let now = Instant::now();
            if now >= next_collect {
                self.tick_collect();
                next_collect = now + self.config.collect_interval;
            }
            if now >= next_recovery {
                self.tick_recovery();
                next_recovery = now + self.config.recovery_interval;
            }
            if now >= next_error {
                self.tick_error();
                next_error = now + self.config.error_interval;
            }

            let wake = next_collect.min(next_recovery).min(next_error);
            let timeout = wake.saturating_duration_since(Instant::now());
            match shutdown.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }

        tracing::info!(
            unsynced = self.has_unsynced_work(),
            "sync engine stopped"
        );
    }
}
