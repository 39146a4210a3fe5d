//! Configuration for a sync session.

use std::time::Duration;

/// Configuration for one editing session's sync engine.
///
/// Identifiers are supplied once at session start and never change for the
/// session's lifetime. The intervals drive the cooperative timer loop in
/// [`crate::SyncEngine::run`].
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Identifier of the remote document this session edits.
    pub document_id: String,
    /// Build identifier of the editor serving this session.
    pub build_id: String,
    /// Document version the session started from.
    pub initial_version: u64,
    /// How often the mutation-tracking layer is polled for new transactions.
    pub collect_interval: Duration,
    /// How often the armed job is re-run while status is recovering.
    pub recovery_interval: Duration,
    /// How often the armed job is re-run after escalating to failed.
    pub error_interval: Duration,
    /// Consecutive retryable failures before recovering escalates to failed.
    pub max_retry_recovery: u32,
}

impl SyncConfig {
    /// Creates a configuration with default intervals (collect every 1s,
    /// recovery retry every 2s, error retry every 5s, escalation after 5
    /// consecutive failures).
    pub fn new(
        document_id: impl Into<String>,
        build_id: impl Into<String>,
        initial_version: u64,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            build_id: build_id.into(),
            initial_version,
            collect_interval: Duration::from_secs(1),
            recovery_interval: Duration::from_secs(2),
            error_interval: Duration::from_secs(5),
            max_retry_recovery: 5,
        }
    }

    /// Sets the mutation collection interval.
    pub fn with_collect_interval(mut self, interval: Duration) -> Self {
        self.collect_interval = interval;
        self
    }

    /// Sets the recovery retry interval.
    pub fn with_recovery_interval(mut self, interval: Duration) -> Self {
        self.recovery_interval = interval;
        self
    }

    /// Sets the error retry interval.
    pub fn with_error_interval(mut self, interval: Duration) -> Self {
        self.error_interval = interval;
        self
    }

    /// Sets the failure streak length at which recovering becomes failed.
    pub fn with_max_retry_recovery(mut self, max: u32) -> Self {
        self.max_retry_recovery = max;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new("", "", 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = SyncConfig::new("doc-1", "build-7", 12);

        assert_eq!(config.document_id, "doc-1");
        assert_eq!(config.build_id, "build-7");
        assert_eq!(config.initial_version, 12);
        assert_eq!(config.collect_interval, Duration::from_secs(1));
        assert_eq!(config.recovery_interval, Duration::from_secs(2));
        assert_eq!(config.error_interval, Duration::from_secs(5));
        assert_eq!(config.max_retry_recovery, 5);
    }

    #[test]
    fn config_builder() {
        let config = SyncConfig::new("doc-1", "build-7", 0)
            .with_collect_interval(Duration::from_millis(250))
            .with_recovery_interval(Duration::from_millis(500))
            .with_error_interval(Duration::from_secs(10))
            .with_max_retry_recovery(3);

        assert_eq!(config.collect_interval, Duration::from_millis(250));
        assert_eq!(config.recovery_interval, Duration::from_millis(500));
        assert_eq!(config.error_interval, Duration::from_secs(10));
        assert_eq!(config.max_retry_recovery, 3);
    }
}
