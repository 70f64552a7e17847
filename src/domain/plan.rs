//! Search plans produced by the planning stage.
//!
//! Plan order is canonical: every downstream consumer (research fan-out,
//! evidence numbering, report citations) uses the plan index, never
//! completion order.

use serde::{Deserialize, Serialize};

use crate::core::error::StageError;

/// Minimum number of searches in a valid plan
pub const PLAN_MIN_SEARCHES: usize = 3;

/// Maximum number of searches in a valid plan
pub const PLAN_MAX_SEARCHES: usize = 5;

/// A single web search to perform
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchItem {
    /// Why this search matters to the query
    pub reason: String,

    /// The search term to use
    pub query: String,
}

/// An ordered plan of searches for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchPlan {
    /// Ordered searches; index is the canonical citation position
    pub searches: Vec<SearchItem>,
}

impl SearchPlan {
    /// Validate the structural invariants of a plan as it comes back
    /// from the planning stage.
    pub fn validate(&self) -> Result<(), StageError> {
        let n = self.searches.len();
        if !(PLAN_MIN_SEARCHES..=PLAN_MAX_SEARCHES).contains(&n) {
            return Err(StageError::InvalidOutput {
                stage: "plan",
                reason: format!(
                    "plan has {} searches, expected {} to {}",
                    n, PLAN_MIN_SEARCHES, PLAN_MAX_SEARCHES
                ),
            });
        }

        for (index, item) in self.searches.iter().enumerate() {
            if item.query.trim().is_empty() {
                return Err(StageError::InvalidOutput {
                    stage: "plan",
                    reason: format!("search {} has an empty query", index),
                });
            }
        }

        Ok(())
    }

    /// Number of searches in the plan
    pub fn len(&self) -> usize {
        self.searches.len()
    }

    /// True if the plan has no searches
    pub fn is_empty(&self) -> bool {
        self.searches.is_empty()
    }
}
