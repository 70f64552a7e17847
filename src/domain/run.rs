//! Run state for one end-to-end pipeline execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::plan::SearchPlan;
use super::query::ResearchQuery;
use super::report::{Report, SearchResult};

/// One end-to-end execution of the research pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run
    pub id: Uuid,

    /// The validated query that started the run
    pub query: ResearchQuery,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,

    /// Plan produced by the planning stage
    pub plan: Option<SearchPlan>,

    /// Search results in plan-index order
    pub results: Vec<SearchResult>,

    /// Synthesized report
    pub report: Option<Report>,

    /// Delivery outcome; `None` when no recipient was given
    pub delivery: Option<DeliveryOutcome>,
}

impl Run {
    /// Create a new run in the `Planning` state
    pub fn new(query: ResearchQuery) -> Self {
        Self {
            id: Uuid::new_v4(),
            query,
            state: RunState::Planning,
            started_at: Utc::now(),
            completed_at: None,
            plan: None,
            results: Vec::new(),
            report: None,
            delivery: None,
        }
    }

    /// Move the run into a terminal state and stamp the completion time
    pub fn finish(&mut self, state: RunState) {
        debug_assert!(matches!(
            state,
            RunState::Completed | RunState::Failed { .. }
        ));
        self.state = state;
        self.completed_at = Some(Utc::now());
    }

    /// True once the run has reached `Completed` or `Failed`
    pub fn is_finished(&self) -> bool {
        matches!(self.state, RunState::Completed | RunState::Failed { .. })
    }
}

/// State machine for a run.
///
/// `Failed` is absorbing and reachable from every non-terminal state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Producing the search plan
    Planning,

    /// Fan-out search workers in flight
    Researching,

    /// Synthesizing the report
    Writing,

    /// Running guardrails and the transport
    Delivering,

    /// Terminal success (delivery may still be blocked or failed)
    Completed,

    /// Terminal failure of the pipeline itself
    Failed { error: String },
}

/// Terminal result of the delivery stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryOutcome {
    /// What happened to the outbound message
    pub status: DeliveryStatus,

    /// Block or failure detail, when applicable
    pub reason: Option<String>,
}

impl DeliveryOutcome {
    pub fn sent() -> Self {
        Self {
            status: DeliveryStatus::Sent,
            reason: None,
        }
    }

    pub fn blocked(reason: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Blocked,
            reason: Some(reason.into()),
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            status: DeliveryStatus::Failed,
            reason: Some(reason.into()),
        }
    }
}

/// Delivery status values.
///
/// Blocked and failed deliveries are business outcomes, not run failures;
/// a run carrying either still completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    /// Handed to the transport successfully
    Sent,

    /// Guardrails refused the send
    Blocked,

    /// Transport failed after all retries
    Failed,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> ResearchQuery {
        ResearchQuery::new("history of the transistor", None).unwrap()
    }

    #[test]
    fn test_run_starts_planning() {
        let run = Run::new(query());
        assert_eq!(run.state, RunState::Planning);
        assert!(!run.is_finished());
        assert!(run.completed_at.is_none());
    }

    #[test]
    fn test_finish_stamps_completion() {
        let mut run = Run::new(query());
        run.finish(RunState::Completed);
        assert!(run.is_finished());
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn test_failed_is_terminal() {
        let mut run = Run::new(query());
        run.finish(RunState::Failed {
            error: "no usable results".to_string(),
        });
        assert!(run.is_finished());
    }
}
