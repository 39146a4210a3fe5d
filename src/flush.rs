//! The sync protocol client: one flush attempt against the remote document.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::engine::ConflictPrompt;
use crate::error::{EngineError, EngineResult};
use crate::protocol::{PushRequest, PushStatus};
use crate::queue::TransactionQueues;
use crate::scheduler::SyncJob;
use crate::transport::SyncTransport;

/// Message shown when the remote document was edited elsewhere.
pub(crate) const CONFLICT_PROMPT_MESSAGE: &str = "This project was edited somewhere else. \
     Reload to pick up the latest version? \
     Unsaved changes from this session will be discarded either way.";

/// One flush attempt: binds the currently scheduled transactions to a
/// single network round trip and interprets its outcome.
///
/// A `FlushJob` is constructed fresh per collection tick and holds only
/// handles to the shared queues and counters, never transaction payloads,
/// so replacing an unexecuted job in the scheduler slot loses nothing.
///
/// This is the only place the remote version advances and the only place
/// pending transactions are irrecoverably dropped.
pub struct FlushJob<T, P> {
    transport: Arc<T>,
    prompt: Arc<P>,
    queues: Arc<Mutex<TransactionQueues>>,
    version: Arc<AtomicU64>,
    document_id: String,
    build_id: String,
}

impl<T: SyncTransport, P: ConflictPrompt> FlushJob<T, P> {
    /// Creates a flush job over the session's shared state.
    pub fn new(
        transport: Arc<T>,
        prompt: Arc<P>,
        queues: Arc<Mutex<TransactionQueues>>,
        version: Arc<AtomicU64>,
        document_id: impl Into<String>,
        build_id: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            prompt,
            queues,
            version,
            document_id: document_id.into(),
            build_id: build_id.into(),
        }
    }
}

impl<T: SyncTransport, P: ConflictPrompt> SyncJob for FlushJob<T, P> {
    fn run(&self) -> EngineResult<()> {
        // Fix the set of transactions this attempt covers. New collections
        // land in the scheduled queue while the round trip is outstanding.
        let (request, batched) = {
            let mut queues = self.queues.lock();
            queues.drain_to_pending();
            let batched = queues.pending_len();
            if batched == 0 {
                tracing::debug!("nothing pending, skipping flush");
                return Ok(());
            }
            let request = PushRequest {
                transactions: queues.pending().to_vec(),
                build_id: self.build_id.clone(),
                document_id: self.document_id.clone(),
                version: self.version.load(Ordering::SeqCst),
            };
            (request, batched)
        };

        let response = self.transport.push(&request)?;

        match response.status {
            PushStatus::Ok => {
                let confirmed = self.version.fetch_add(1, Ordering::SeqCst) + 1;
                self.queues.lock().clear_pending();
                tracing::debug!(version = confirmed, transactions = batched, "flush applied");
                Ok(())
            }
            PushStatus::VersionMismatched => {
                let version = self.version.load(Ordering::SeqCst);
                let reload = self.prompt.confirm_reload(CONFLICT_PROMPT_MESSAGE);
                // These transactions can never be replayed against a
                // version that has moved, whatever the user chose.
                self.queues.lock().clear_pending();
                tracing::warn!(
                    version,
                    dropped = batched,
                    reload,
                    "remote document moved, pending transactions dropped"
                );
                Err(EngineError::VersionConflict { version })
            }
            PushStatus::Unrecognized => {
                Err(EngineError::Protocol("unrecognized push status".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Transaction;
    use crate::transport::MockTransport;
    use serde_json::json;

    struct RecordingPrompt {
        accept: bool,
        messages: Mutex<Vec<String>>,
    }

    impl RecordingPrompt {
        fn new(accept: bool) -> Self {
            Self {
                accept,
                messages: Mutex::new(Vec::new()),
            }
        }
    }

    impl ConflictPrompt for RecordingPrompt {
        fn confirm_reload(&self, message: &str) -> bool {
            self.messages.lock().push(message.to_string());
            self.accept
        }
    }

    struct Fixture {
        transport: Arc<MockTransport>,
        prompt: Arc<RecordingPrompt>,
        queues: Arc<Mutex<TransactionQueues>>,
        version: Arc<AtomicU64>,
        job: FlushJob<MockTransport, RecordingPrompt>,
    }

    fn fixture(version: u64, accept_reload: bool) -> Fixture {
        let transport = Arc::new(MockTransport::new());
        let prompt = Arc::new(RecordingPrompt::new(accept_reload));
        let queues = Arc::new(Mutex::new(TransactionQueues::new()));
        let version = Arc::new(AtomicU64::new(version));
        let job = FlushJob::new(
            Arc::clone(&transport),
            Arc::clone(&prompt),
            Arc::clone(&queues),
            Arc::clone(&version),
            "doc-1",
            "build-1",
        );
        Fixture {
            transport,
            prompt,
            queues,
            version,
            job,
        }
    }

    fn tx(n: u64) -> Transaction {
        Transaction::new(json!({ "seq": n }))
    }

    #[test]
    fn applied_flush_advances_version_and_clears_pending() {
        let f = fixture(4, false);
        f.transport.script_ok();
        f.queues.lock().collect(vec![tx(1), tx(2)]);

        f.job.run().unwrap();

        assert_eq!(f.version.load(Ordering::SeqCst), 5);
        assert!(f.queues.lock().is_empty());
        let requests = f.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].version, 4);
        assert_eq!(requests[0].document_id, "doc-1");
        assert_eq!(requests[0].transactions.len(), 2);
    }

    #[test]
    fn transactions_from_consecutive_collections_flush_in_one_ordered_request() {
        let f = fixture(0, false);
        f.transport.script_ok();
        {
            let mut queues = f.queues.lock();
            queues.collect(vec![tx(1), tx(2)]);
            queues.collect(vec![tx(3)]);
            queues.collect(vec![tx(4), tx(5)]);
        }

        f.job.run().unwrap();

        let requests = f.transport.requests();
        assert_eq!(requests.len(), 1);
        let seqs: Vec<u64> = requests[0]
            .transactions
            .iter()
            .map(|t| t.payload()["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn transient_failure_keeps_pending_and_version() {
        let f = fixture(2, false);
        f.transport.script_http_error(503);
        f.queues.lock().collect(vec![tx(1)]);

        let err = f.job.run().unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.version.load(Ordering::SeqCst), 2);
        assert_eq!(f.queues.lock().pending_len(), 1);
    }

    #[test]
    fn retry_resends_kept_pending_ahead_of_new_transactions() {
        let f = fixture(0, false);
        f.transport.script_transport_error("offline");
        f.transport.script_ok();
        f.queues.lock().collect(vec![tx(1)]);

        f.job.run().unwrap_err();
        f.queues.lock().collect(vec![tx(2)]);
        f.job.run().unwrap();

        let requests = f.transport.requests();
        assert_eq!(requests.len(), 2);
        let seqs: Vec<u64> = requests[1]
            .transactions
            .iter()
            .map(|t| t.payload()["seq"].as_u64().unwrap())
            .collect();
        assert_eq!(seqs, vec![1, 2]);
    }

    #[test]
    fn version_conflict_prompts_and_drops_pending() {
        let f = fixture(6, false);
        f.transport.script_version_mismatched();
        f.queues.lock().collect(vec![tx(1), tx(2)]);

        let err = f.job.run().unwrap_err();

        assert!(matches!(err, EngineError::VersionConflict { version: 6 }));
        assert!(!err.is_retryable());
        // Pending dropped even though the user declined the reload.
        assert!(f.queues.lock().is_empty());
        assert_eq!(f.version.load(Ordering::SeqCst), 6);
        let messages = f.prompt.messages.lock();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("Reload"));
    }

    #[test]
    fn version_conflict_drops_pending_when_reload_accepted_too() {
        let f = fixture(6, true);
        f.transport.script_version_mismatched();
        f.queues.lock().collect(vec![tx(1)]);

        f.job.run().unwrap_err();

        assert!(f.queues.lock().is_empty());
        assert_eq!(f.prompt.messages.lock().len(), 1);
    }

    #[test]
    fn unrecognized_status_is_retryable_and_keeps_pending() {
        let f = fixture(0, false);
        f.transport.script_unrecognized_status();
        f.queues.lock().collect(vec![tx(1)]);

        let err = f.job.run().unwrap_err();

        assert!(err.is_retryable());
        assert_eq!(f.queues.lock().pending_len(), 1);
    }

    #[test]
    fn empty_queues_skip_the_round_trip() {
        let f = fixture(0, false);

        f.job.run().unwrap();

        assert_eq!(f.transport.request_count(), 0);
        assert_eq!(f.version.load(Ordering::SeqCst), 0);
    }
}
