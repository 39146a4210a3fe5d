//! # Studio Sync
//!
//! Client-side optimistic mutation synchronization engine for a visual
//! editing session.
//!
//! This crate provides:
//! - Batching queues that coalesce fine-grained local edits into single
//!   network round trips
//! - A job scheduler with a well-defined, observable retry state machine
//!   (idle → running → recovering → failed)
//! - A sync protocol client against a version-numbered remote document,
//!   with coarse conflict detection
//! - Status publishing for UI indicators and a session shutdown guard
//! - HTTP transport abstraction
//!
//! ## Architecture
//!
//! A collection tick pulls newly produced transactions from the external
//! mutation-tracking layer into the scheduled queue and arms a fresh
//! flush job. The job drains the scheduled queue into the pending queue,
//! performs exactly one round trip over it, and reports back to the
//! scheduler, which escalates failure streaks through `recovering` into
//! `failed` and re-arms the job for the recovery timers.
//!
//! ## Key invariants
//!
//! - Pending transactions are only dropped on a confirmed apply or a
//!   confirmed version conflict
//! - Exactly one round trip is outstanding at any instant
//! - The remote version only advances by 1, in lock-step with a
//!   server-confirmed apply of exactly that version
//! - Transactions are transmitted in production order, never reordered
//!
//! Conflict resolution is deliberately coarse: a server-detected version
//! mismatch surfaces one blocking reload decision and invalidates the
//! pending edits. There is no field-level merging.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod flush;
mod http;
mod protocol;
mod queue;
mod scheduler;
mod transport;

pub use config::SyncConfig;
pub use engine::{ConflictPrompt, MutationSource, SyncEngine};
pub use error::{EngineError, EngineResult};
pub use flush::FlushJob;
pub use http::{HttpClient, HttpResponse, HttpTransport};
pub use protocol::{PushRequest, PushResponse, PushStatus, Transaction};
pub use queue::TransactionQueues;
pub use scheduler::{JobScheduler, StatusObserver, StatusSeverity, SyncJob, SyncStatus};
pub use transport::{MockTransport, SyncTransport};
