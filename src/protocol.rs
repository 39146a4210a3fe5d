//! Wire types for the save protocol.
//!
//! One flush is one `POST` carrying the pending transactions, the session
//! identifiers and the version the client believes the server holds. The
//! server answers with a status string; anything it reports beyond `ok`
//! and `version_mismatched` is treated as transient by the caller.

use serde::{Deserialize, Serialize};

/// One opaque batch of local edits.
///
/// Produced by the external mutation-tracking layer and applied remotely
/// in production order. The engine never looks inside; queue position is
/// the only identity a transaction has.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Transaction(serde_json::Value);

impl Transaction {
    /// Wraps a serialized mutation payload.
    pub fn new(payload: serde_json::Value) -> Self {
        Self(payload)
    }

    /// Returns the underlying payload.
    pub fn payload(&self) -> &serde_json::Value {
        &self.0
    }
}

/// Request body for one flush attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushRequest {
    /// Pending transactions, in production order.
    pub transactions: Vec<Transaction>,
    /// Build identifier of the editor.
    pub build_id: String,
    /// Identifier of the document being edited.
    pub document_id: String,
    /// Version the client believes the server holds.
    pub version: u64,
}

/// Status reported by the server for a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushStatus {
    /// Transactions were applied against exactly the submitted version.
    Ok,
    /// The server's version has moved; the document was edited elsewhere.
    VersionMismatched,
    /// Any status this client does not recognize.
    #[serde(other)]
    Unrecognized,
}

/// Response body for a flush attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushResponse {
    /// Outcome of the flush.
    pub status: PushStatus,
}

impl PushResponse {
    /// Creates an applied response.
    pub fn ok() -> Self {
        Self {
            status: PushStatus::Ok,
        }
    }

    /// Creates a version-mismatch response.
    pub fn version_mismatched() -> Self {
        Self {
            status: PushStatus::VersionMismatched,
        }
    }
}
