//! Research query validation.
//!
//! A query is validated once, before any stage runs. A `ResearchQuery`
//! that exists is a query the pipeline is allowed to execute.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::error::ValidationError;

/// Minimum query length accepted by the pipeline
pub const MIN_QUERY_LEN: usize = 12;

static ADDRESS_RE: OnceLock<Regex> = OnceLock::new();

/// Basic syntax check for a delivery address.
///
/// This is the pre-run gate; the guardrail format check applies
/// stricter heuristics (typo domains, disposable domains) at delivery time.
pub fn address_syntax_ok(address: &str) -> bool {
    let re = ADDRESS_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$")
            .unwrap_or_else(|e| panic!("invalid address regex: {e}"))
    });
    re.is_match(address)
}

/// A validated research request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuery {
    /// Free-text research question
    pub text: String,

    /// Optional delivery address for the finished report
    pub recipient: Option<String>,
}

impl ResearchQuery {
    /// Validate and construct a query.
    ///
    /// Rejects queries shorter than [`MIN_QUERY_LEN`] and recipients that
    /// fail the address syntax check. No events are emitted on rejection.
    pub fn new(text: impl Into<String>, recipient: Option<String>) -> Result<Self, ValidationError> {
        let text = text.into();
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(ValidationError::EmptyQuery);
        }
        if trimmed.len() < MIN_QUERY_LEN {
            return Err(ValidationError::QueryTooShort {
                length: trimmed.len(),
                minimum: MIN_QUERY_LEN,
            });
        }

        if let Some(ref address) = recipient {
            if !address_syntax_ok(address) {
                return Err(ValidationError::InvalidRecipient {
                    address: address.clone(),
                });
            }
        }

        Ok(Self {
            text: trimmed.to_string(),
            recipient,
        })
    }

    /// Subject line used when the report is delivered
    pub fn subject(&self) -> String {
        const MAX_SUBJECT: usize = 80;

        let mut subject = format!("Research report: {}", self.text);
        if subject.len() > MAX_SUBJECT {
            let cut = subject
                .char_indices()
                .take_while(|(i, _)| *i < MAX_SUBJECT - 3)
                .last()
                .map(|(i, c)| i + c.len_utf8())
                .unwrap_or(0);
            subject.truncate(cut);
            subject.push_str("...");
        }
        subject
    }
}
