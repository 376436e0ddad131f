//! Crate-wide error type (spec §7 error kinds).

use thiserror::Error;

pub type Result<T> = ::std::result::Result<T, Pan123Error>;

/// Every failure path the transfer core can surface to a caller.
#[derive(Debug, Error)]
pub enum Pan123Error {
    /// Transport-level failure that exhausted the pacer's retry budget.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// HTTP 401 was returned twice for the same call (re-auth did not help).
    #[error("authorization rejected after re-auth retry")]
    AuthRejected,

    /// Credentials exchange with the provider failed.
    #[error("failed to obtain access token: {0}")]
    AuthFailed(String),

    /// `create`/`single/create` reported a stale parent id and re-resolution
    /// also failed to recover it (even after falling back to root).
    #[error("parent file id {0} could not be corrected")]
    ParentIdUnrecoverable(i64),

    /// A non-zero API response code outside the retryable list.
    #[error("api error {code}: {message}")]
    Api { code: i32, message: String },

    /// Non-2xx HTTP status with no JSON envelope to decode (or decoding it
    /// failed); carries the raw status for retry classification.
    #[error("http status {0}")]
    HttpStatus(u16),

    /// Slice count, byte count, or digest didn't match expectations.
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// Bad input caught before any network call: invalid filename, size <= 0,
    /// or a file that needs more parts than `max_upload_parts` allows.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Path segment, or the whole path, could not be resolved to a file id.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Completion polling exhausted `maxPolls` without a terminal outcome.
    #[error("completion polling exhausted after {0} attempts")]
    PollExhausted(usize),

    /// The resolver's loop-safety cap was hit (suspected server-side loop).
    #[error("resolver loop-safety cap exceeded: {0}")]
    LoopSafety(String),

    /// The caller's context was cancelled or its deadline elapsed.
    #[error("operation cancelled")]
    Cancelled,

    /// Local I/O (temp file creation, sparse writes, reads) failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization of a request/response envelope failed.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Any remaining internal invariant violation.
    #[error("internal error: {0}")]
    Internal(String),
}

impl Pan123Error {
    /// True for the error kinds spec §7 classifies as "retried transparently"
    /// at the RPC layer (as opposed to the completion-poll layer, which has
    /// its own classification in [`crate::upload::poller`]).
    pub fn is_pacer_retryable(&self) -> bool {
        match self {
            Pan123Error::Transport(e) => !e.is_builder() && !e.is_redirect(),
            Pan123Error::Api { code, .. } => crate::constant::RETRYABLE_CODES.contains(code),
            Pan123Error::HttpStatus(status) => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }

    /// Structural classification of transport-level failures, used by the
    /// completion poller to choose its back-off multiplier (spec §9 open
    /// question: classify by error structure, not message substrings).
    pub fn is_network_error(&self) -> bool {
        match self {
            Pan123Error::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            Pan123Error::HttpStatus(status) => (500..600).contains(status) || *status == 429,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_retry_covers_429_and_5xx_only() {
        assert!(Pan123Error::HttpStatus(429).is_pacer_retryable());
        assert!(Pan123Error::HttpStatus(503).is_pacer_retryable());
        assert!(!Pan123Error::HttpStatus(404).is_pacer_retryable());
        assert!(!Pan123Error::HttpStatus(400).is_pacer_retryable());
    }

    #[test]
    fn http_status_network_error_covers_429_and_5xx_only() {
        assert!(Pan123Error::HttpStatus(429).is_network_error());
        assert!(Pan123Error::HttpStatus(500).is_network_error());
        assert!(!Pan123Error::HttpStatus(401).is_network_error());
    }

    #[test]
    fn non_transport_non_status_errors_are_never_pacer_retryable() {
        assert!(!Pan123Error::AuthRejected.is_pacer_retryable());
        assert!(!Pan123Error::NotFound("x".into()).is_pacer_retryable());
        assert!(!Pan123Error::Integrity("bad digest".into()).is_pacer_retryable());
    }

    #[test]
    fn api_retry_follows_the_retryable_code_table() {
        let retryable = crate::constant::RETRYABLE_CODES[0];
        assert!(Pan123Error::Api {
            code: retryable,
            message: "throttled".into()
        }
        .is_pacer_retryable());
        assert!(!Pan123Error::Api {
            code: 9,
            message: "file not found".into()
        }
        .is_pacer_retryable());
    }
}
