//! Batching queues for collected transactions.

use crate::protocol::Transaction;

/// The two ordered batching queues of the engine.
///
/// Newly collected transactions land in the scheduled queue. A flush
/// attempt drains them into the pending queue, which stays bound to that
/// attempt until the server confirms the apply or the attempt is aborted
/// on a version conflict. Producers only ever append to the scheduled
/// queue, so an outstanding flush never has its pending set grow under it.
///
/// # Invariants
///
/// - No operation reorders entries.
/// - Pending transactions are only dropped by [`clear_pending`], after a
///   terminal outcome.
///
/// [`clear_pending`]: TransactionQueues::clear_pending
#[derive(Debug, Default)]
pub struct TransactionQueues {
    scheduled: Vec<Transaction>,
    pending: Vec<Transaction>,
}

impl TransactionQueues {
    /// Creates an empty pair of queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly collected transactions, preserving production order.
    pub fn collect<I>(&mut self, transactions: I)
    where
        I: IntoIterator<Item = Transaction>,
    {
        self.scheduled.extend(transactions);
    }

    /// Moves every scheduled transaction to the end of the pending queue,
    /// leaving the scheduled queue empty.
    pub fn drain_to_pending(&mut self) {
        self.pending.append(&mut self.scheduled);
    }

    /// Drops the pending set after a terminal outcome (confirmed apply or
    /// version-conflict abort).
    pub fn clear_pending(&mut self) {
        self.pending.clear();
    }

    /// Transactions bound to the current (or most recent) flush attempt.
    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Number of transactions awaiting the next drain.
    pub fn scheduled_len(&self) -> usize {
        self.scheduled.len()
    }

    /// Number of transactions bound to the current flush attempt.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// True when no transaction is awaiting transmission.
    pub fn is_empty(&self) -> bool {
        self.scheduled.is_empty() && self.pending.is_empty()
    }
}
