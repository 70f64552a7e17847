//! Guardrail engine gating the delivery side effect.
//!
//! A fixed-order pipeline: format, content safety, spam score, rate limit,
//! personalization. The first three judge content; the rate-limit check
//! consumes quota only when content passed, so a blocked message never
//! burns a send slot. Personalization is advisory and never blocks.

pub mod checks;
pub mod rate_limit;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use checks::{check_content_safety, check_format, check_personalization, check_spam};
pub use checks::{CheckOutcome, SPAM_BLOCK_THRESHOLD};
pub use rate_limit::{LimitExceeded, RateLimitScope, RateLimitStats, RateLimiter};

/// Verdict over one delivery attempt. Computed fresh each time, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardrailVerdict {
    /// True iff no blocking check fired
    pub passed: bool,

    /// Reasons the send is refused
    pub blocking_issues: Vec<String>,

    /// Advisory findings; never affect `passed`
    pub warnings: Vec<String>,

    /// Weighted spam score in [0, 100]
    pub spam_score: u8,
}

/// Ordered validation pipeline in front of the transport
pub struct GuardrailEngine {
    limiter: Arc<RateLimiter>,
}

impl GuardrailEngine {
    /// Create an engine around a shared rate limiter
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }

    /// Shared limiter handle, for statistics
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Run all checks against an outbound message and compose the verdict.
    ///
    /// The rate limiter is check-and-increment: when the content checks
    /// pass, a passing verdict means a send slot has been consumed. Slots
    /// are never refunded, even if the transport later fails.
    pub fn evaluate(&self, subject: &str, body: &str, recipient: &str) -> GuardrailVerdict {
        let mut blocking_issues = Vec::new();
        let mut warnings = Vec::new();

        // 1. Format
        let format = check_format(recipient);
        blocking_issues.extend(format.blocking);
        warnings.extend(format.warnings);

        // 2. Content safety
        let safety = check_content_safety(body);
        blocking_issues.extend(safety.blocking);
        warnings.extend(safety.warnings);

        // 3. Spam score
        let (spam_score, spam) = check_spam(subject, body);
        blocking_issues.extend(spam.blocking);
        warnings.extend(spam.warnings);

        // 4. Rate limit, consulted only when content passed
        if blocking_issues.is_empty() {
            if let Err(exceeded) = self.limiter.try_acquire() {
                blocking_issues.push(exceeded.to_string());
            }
        }

        // 5. Personalization, advisory only
        let personalization = check_personalization(body);
        warnings.extend(personalization.warnings);

        let passed = blocking_issues.is_empty();
        debug!(passed, spam_score, blocking = blocking_issues.len(), "guardrail verdict");

        GuardrailVerdict {
            passed,
            blocking_issues,
            warnings,
            spam_score,
        }
    }
}
