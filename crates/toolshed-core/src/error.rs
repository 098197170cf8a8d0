//! Error taxonomy shared by the executors, the orchestrator, and the HTTP layer.
//!
//! `ExecError` is what an external call reports. `JobError` is what a caller
//! sees. Conversion happens exactly once, in `JobError::from_exec`, at the
//! orchestrator boundary; the HTTP layer only maps `JobError` to status codes.

use std::time::Duration;

/// Failure reported by a job executor (subprocess or remote API).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    /// Network or DNS failure reaching the external dependency.
    #[error("external service unreachable: {0}")]
    Unreachable(String),
    /// The dependency signalled rate limiting or overload (e.g. HTTP 429).
    #[error("external service overloaded: {0}")]
    Overloaded(String),
    /// A single attempt ran past its timeout.
    #[error("external call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    /// The dependency rejected the parameters (bad URL, unsupported format).
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The call reported success but the expected output is missing.
    #[error("expected output missing: {0}")]
    NotFound(String),
    /// Anything else the dependency reported.
    #[error("external call failed: {0}")]
    Failed(String),
}

impl ExecError {
    /// Transient errors are worth retrying: overload and timeouts only.
    pub fn is_transient(&self) -> bool {
        matches!(self, ExecError::Overloaded(_) | ExecError::Timeout(_))
    }
}

/// Why a retry loop stopped with an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GiveUpReason {
    /// The error was permanent; no further attempt was made.
    Permanent,
    /// The error was transient but the attempt budget ran out.
    Exhausted,
}

/// Error returned to callers of the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    /// Client error. Never retried, never charged against the rate limit
    /// when detected before execution.
    #[error("{0}")]
    InvalidInput(String),
    /// The caller must wait `retry_after` before trying again.
    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after: Duration,
    },
    /// Transient failures persisted past the retry budget.
    #[error("external service unavailable: {0}")]
    ExternalServiceUnavailable(String),
    /// The external call failed in a way retrying cannot fix.
    #[error("external call failed: {0}")]
    PermanentFailure(String),
    /// The external tool reported success but produced no output.
    #[error("output artifact missing: {0}")]
    ArtifactMissing(String),
    /// The overall job deadline expired across all attempts.
    #[error("job exceeded its {}s deadline", .0.as_secs())]
    DeadlineExceeded(Duration),
    /// Local failure unrelated to the external dependency.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Rejection by the local fixed-window limiter.
    pub fn local_rate_limit(retry_after: Duration) -> Self {
        JobError::RateLimited {
            message: format!(
                "Rate limit exceeded. Please wait {} seconds before trying again.",
                retry_after.as_secs()
            ),
            retry_after,
        }
    }

    /// Classify an executor failure once the retry loop has given up.
    ///
    /// Exhausted overload becomes `RateLimited` carrying `upstream_retry_after`;
    /// exhausted timeouts become `ExternalServiceUnavailable`.
    pub fn from_exec(err: ExecError, reason: GiveUpReason, upstream_retry_after: Duration) -> Self {
        match (err, reason) {
            (ExecError::InvalidInput(msg), _) => JobError::InvalidInput(msg),
            (ExecError::NotFound(msg), _) => JobError::ArtifactMissing(msg),
            (ExecError::Overloaded(_), GiveUpReason::Exhausted) => JobError::RateLimited {
                message: "API rate limit exceeded. Please try again in a minute.".to_string(),
                retry_after: upstream_retry_after,
            },
            (err @ ExecError::Timeout(_), GiveUpReason::Exhausted) => {
                JobError::ExternalServiceUnavailable(err.to_string())
            }
            (err, _) => JobError::PermanentFailure(err.to_string()),
        }
    }

    /// Seconds a client should wait, if this is a rate-limit rejection.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            JobError::RateLimited { retry_after, .. } => Some(retry_after.as_secs()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(ExecError::Overloaded("429".into()).is_transient());
        assert!(ExecError::Timeout(Duration::from_secs(3)).is_transient());
        assert!(!ExecError::Unreachable("dns".into()).is_transient());
        assert!(!ExecError::InvalidInput("bad url".into()).is_transient());
        assert!(!ExecError::NotFound("gone".into()).is_transient());
        assert!(!ExecError::Failed("exit 1".into()).is_transient());
    }

    #[test]
    fn exhausted_overload_becomes_rate_limited() {
        let err = JobError::from_exec(
            ExecError::Overloaded("429".into()),
            GiveUpReason::Exhausted,
            Duration::from_secs(60),
        );
        assert_eq!(err.retry_after_secs(), Some(60));
    }

    #[test]
    fn exhausted_timeout_becomes_unavailable() {
        let err = JobError::from_exec(
            ExecError::Timeout(Duration::from_secs(30)),
            GiveUpReason::Exhausted,
            Duration::from_secs(60),
        );
        assert!(matches!(err, JobError::ExternalServiceUnavailable(_)));
    }

    #[test]
    fn executor_invalid_input_stays_invalid_input() {
        let err = JobError::from_exec(
            ExecError::InvalidInput("Unsupported URL".into()),
            GiveUpReason::Permanent,
            Duration::from_secs(60),
        );
        assert_eq!(err, JobError::InvalidInput("Unsupported URL".into()));
    }

    #[test]
    fn missing_output_becomes_artifact_missing() {
        let err = JobError::from_exec(
            ExecError::NotFound("no file".into()),
            GiveUpReason::Permanent,
            Duration::from_secs(60),
        );
        assert!(matches!(err, JobError::ArtifactMissing(_)));
    }

    #[test]
    fn local_rate_limit_message_names_the_wait() {
        let err = JobError::local_rate_limit(Duration::from_secs(59));
        assert_eq!(err.retry_after_secs(), Some(59));
        assert!(err.to_string().contains("59 seconds"));
    }
}
