//! Error taxonomy for the pipeline.
//!
//! Three families with different blast radii:
//! - `ValidationError`: rejected before any stage runs, no events emitted.
//! - `StageError`: a stage failed. Fatal on the critical path (plan, write);
//!   recorded as a degraded result for individual searches.
//! - `TransportError`: delivery failed. Never fails the run.

use thiserror::Error;

/// Malformed input, rejected synchronously before the run starts
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("query is empty")]
    EmptyQuery,

    #[error("query too short: {length} characters, minimum {minimum}")]
    QueryTooShort { length: usize, minimum: usize },

    #[error("invalid recipient address: {address}")]
    InvalidRecipient { address: String },
}

/// A pipeline stage returned an error or produced an unusable result
#[derive(Debug, Clone, Error)]
pub enum StageError {
    #[error("{stage} stage failed: {message}")]
    Failed { stage: &'static str, message: String },

    #[error("{stage} stage timed out after {seconds}s")]
    Timeout { stage: &'static str, seconds: u64 },

    #[error("{stage} stage produced invalid output: {reason}")]
    InvalidOutput { stage: &'static str, reason: String },

    #[error("all {attempted} searches failed, zero usable results")]
    NoUsableResults { attempted: usize },
}

impl StageError {
    /// Shorthand for a provider-side failure
    pub fn failed(stage: &'static str, message: impl Into<String>) -> Self {
        Self::Failed {
            stage,
            message: message.into(),
        }
    }
}

/// The transport collaborator could not deliver the message
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("transport request failed: {0}")]
    Request(String),

    #[error("transport rejected message: {0}")]
    Rejected(String),
}
