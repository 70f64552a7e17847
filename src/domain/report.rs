//! Search results and the synthesized report.

use serde::{Deserialize, Serialize};

/// Outcome of one research fan-out worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    /// Summarized findings for the search term
    Summary(String),

    /// The search failed; the run degrades instead of aborting
    Failed { reason: String },
}

/// One search result, pinned to its plan index
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Position in the search plan (canonical citation number minus one)
    pub index: usize,

    /// The search term this result answers
    pub query: String,

    /// Summary or failure
    pub outcome: SearchOutcome,
}

impl SearchResult {
    /// True if this result carries a usable summary
    pub fn is_usable(&self) -> bool {
        matches!(self.outcome, SearchOutcome::Summary(_))
    }

    /// The summary text, if the search succeeded
    pub fn summary(&self) -> Option<&str> {
        match &self.outcome {
            SearchOutcome::Summary(text) => Some(text),
            SearchOutcome::Failed { .. } => None,
        }
    }
}

/// The synthesized research report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// 2-3 sentence overview of the findings
    pub short_summary: String,

    /// Full report body in markdown
    pub body: String,

    /// Suggested topics for further research
    pub follow_ups: Vec<String>,

    /// Word count of the body
    pub word_count: usize,

    /// True when at least one search failed but the report was still written
    pub degraded: bool,
}

impl Report {
    /// Build a report, computing the word count from the body
    pub fn new(short_summary: String, body: String, follow_ups: Vec<String>) -> Self {
        let word_count = body.split_whitespace().count();
        Self {
            short_summary,
            body,
            follow_ups,
            word_count,
            degraded: false,
        }
    }
}
