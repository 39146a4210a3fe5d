//! Transport seam between the engine and the save endpoint.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::error::{EngineError, EngineResult};
use crate::protocol::{PushRequest, PushResponse, PushStatus};

/// A sync transport performs the single network round trip of a flush.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, an in-process test double, etc.). The scheduler
/// guarantees that exactly one call is outstanding at any instant.
pub trait SyncTransport: Send + Sync {
    /// Transmits one batch of transactions against the submitted version.
    ///
    /// Failures that say nothing definitive about the outcome (connection
    /// errors, bad gateways, garbled bodies) must be retryable errors so
    /// the pending set is kept and retried.
    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse>;
}

impl<T: SyncTransport + ?Sized> SyncTransport for Arc<T> {
    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse> {
        (**self).push(request)
    }
}

/// One scripted reply of a [`MockTransport`].
#[derive(Debug, Clone)]
enum Scripted {
    Ok,
    VersionMismatched,
    UnrecognizedStatus,
    TransportError(String),
    HttpError(u16),
}

impl Scripted {
    fn into_result(self) -> EngineResult<PushResponse> {
        match self {
            Scripted::Ok => Ok(PushResponse::ok()),
            Scripted::VersionMismatched => Ok(PushResponse::version_mismatched()),
            Scripted::UnrecognizedStatus => Ok(PushResponse {
                status: PushStatus::Unrecognized,
            }),
            Scripted::TransportError(message) => Err(EngineError::transport_retryable(message)),
            Scripted::HttpError(status) => Err(EngineError::Http { status }),
        }
    }
}

/// A scripted transport for tests.
///
/// Replies are consumed in order; once the script runs dry the most
/// recently served reply repeats, so a persistent outage or a
/// steady-state success needs to be scripted only once, and a reply
/// scripted later (an outage being "fixed") takes effect immediately.
/// Every request is recorded for inspection.
#[derive(Debug, Default)]
pub struct MockTransport {
    script: Mutex<VecDeque<Scripted>>,
    last_served: Mutex<Option<Scripted>>,
    requests: Mutex<Vec<PushRequest>>,
}

impl MockTransport {
    /// Creates a mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts an applied reply.
    pub fn script_ok(&self) {
        self.script.lock().push_back(Scripted::Ok);
    }

    /// Scripts a version-mismatch reply.
    pub fn script_version_mismatched(&self) {
        self.script.lock().push_back(Scripted::VersionMismatched);
    }

    /// Scripts a reply with a status this client does not know.
    pub fn script_unrecognized_status(&self) {
        self.script.lock().push_back(Scripted::UnrecognizedStatus);
    }

    /// Scripts a transport-level failure.
    pub fn script_transport_error(&self, message: impl Into<String>) {
        self.script
            .lock()
            .push_back(Scripted::TransportError(message.into()));
    }

    /// Scripts a non-2xx HTTP reply.
    pub fn script_http_error(&self, status: u16) {
        self.script.lock().push_back(Scripted::HttpError(status));
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<PushRequest> {
        self.requests.lock().clone()
    }

    /// Number of round trips performed.
    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl SyncTransport for MockTransport {
    fn push(&self, request: &PushRequest) -> EngineResult<PushResponse> {
        self.requests.lock().push(request.clone());

        let mut last_served = self.last_served.lock();
        let reply = self
            .script
            .lock()
            .pop_front()
            .or_else(|| last_served.clone());
        match reply {
            Some(scripted) => {
                *last_served = Some(scripted.clone());
                scripted.into_result()
            }
            None => Err(EngineError::transport_retryable("no scripted reply")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(version: u64) -> PushRequest {
        PushRequest {
            transactions: Vec::new(),
            build_id: "build-1".into(),
            document_id: "doc-1".into(),
            version,
        }
    }

    #[test]
    fn replies_are_consumed_in_order_and_last_repeats() {
        let transport = MockTransport::new();
        transport.script_transport_error("offline");
        transport.script_ok();

        assert!(transport.push(&request(0)).is_err());
        assert_eq!(
            transport.push(&request(0)).unwrap().status,
            PushStatus::Ok
        );
        // Last reply repeats.
        assert_eq!(
            transport.push(&request(1)).unwrap().status,
            PushStatus::Ok
        );
    }

    #[test]
    fn later_scripted_reply_takes_effect_immediately() {
        let transport = MockTransport::new();
        transport.script_transport_error("offline");

        assert!(transport.push(&request(0)).is_err());
        assert!(transport.push(&request(0)).is_err());

        // The outage is "fixed".
        transport.script_ok();
        assert_eq!(
            transport.push(&request(0)).unwrap().status,
            PushStatus::Ok
        );
    }

    #[test]
    fn requests_are_recorded() {
        let transport = MockTransport::new();
        transport.script_ok();

        transport.push(&request(7)).unwrap();

        assert_eq!(transport.request_count(), 1);
        assert_eq!(transport.requests()[0].version, 7);
    }

    #[test]
    fn empty_script_is_a_retryable_failure() {
        let transport = MockTransport::new();
        let err = transport.push(&request(0)).unwrap_err();
        assert!(err.is_retryable());
    }
}
