//! Waiting strategies for external job stabilization.
//!
//! This module defines the [`WaitStrategy`] enum which controls how the
//! controller waits for an external deployment job. Different invocation
//! environments allow different amounts of blocking, so the choice is made
//! per deployment target rather than fixed in code.

use serde::{Deserialize, Serialize};

/// Strategy for waiting on an external deployment job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaitStrategy {
    /// One service call per invocation.
    ///
    /// While the job runs, the invocation returns `IN_PROGRESS` with a
    /// re-invocation delay and a callback context carrying the `DeployId`.
    /// The platform calls again later and the job is polled once more.
    ///
    /// **Use when:** the invocation environment has a short time budget.
    Resumable,

    /// Poll inside the invocation until the job is terminal.
    ///
    /// The invocation sleeps between polls and never returns `IN_PROGRESS`.
    /// It occupies its caller for the whole job duration and can only be
    /// cut short by the caller's own deadline.
    ///
    /// **Use when:** the caller can wait for the full deployment.
    Blocking,
}

impl WaitStrategy {
    /// Get the strategy name as a static string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Resumable => "resumable",
            Self::Blocking => "blocking",
        }
    }
}

impl std::fmt::Display for WaitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Handling of a job status that is neither running, failed nor succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownStatusPolicy {
    /// Fail the operation with an unknown-status error.
    #[default]
    Reject,

    /// Treat the status as terminal success.
    Succeed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_from_string() {
        let resumable: WaitStrategy = serde_json::from_str(r#""resumable""#).unwrap();
        assert_eq!(resumable, WaitStrategy::Resumable);

        let blocking: WaitStrategy = serde_json::from_str(r#""blocking""#).unwrap();
        assert_eq!(blocking, WaitStrategy::Blocking);

        assert!(serde_json::from_str::<WaitStrategy>(r#""eventual""#).is_err());
    }

    #[test]
    fn display_uses_config_name() {
        assert_eq!(WaitStrategy::Resumable.to_string(), "resumable");
        assert_eq!(WaitStrategy::Blocking.to_string(), "blocking");
    }

    #[test]
    fn unknown_status_defaults_to_reject() {
        assert_eq!(UnknownStatusPolicy::default(), UnknownStatusPolicy::Reject);
        let succeed: UnknownStatusPolicy = serde_json::from_str(r#""succeed""#).unwrap();
        assert_eq!(succeed, UnknownStatusPolicy::Succeed);
    }
}
