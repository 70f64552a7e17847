//! Internal progress events published by the orchestrator.
//!
//! Events are a tagged union so the stream encoder can match exhaustively:
//! adding a new kind forces a compile-time decision to forward, drop,
//! or expand it. Events are ephemeral — published, transformed, discarded.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::report::{Report, SearchResult};
use super::run::DeliveryOutcome;
use crate::domain::plan::SearchPlan;

/// Severity of a log event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// Named pipeline phase, used for coarse progress reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Planning,
    Searching,
    Writing,
    Delivering,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Searching => "searching",
            Phase::Writing => "writing",
            Phase::Delivering => "delivering",
        }
    }
}

/// A lifecycle event published on the in-process bus.
///
/// Serializable for logging; never deserialized (the `&'static str`
/// channel is only ever produced in-process).
#[derive(Debug, Clone, Serialize)]
pub enum ProgressEvent {
    /// Human-readable narration
    Log {
        channel: &'static str,
        level: Level,
        timestamp: DateTime<Utc>,
        message: String,
    },

    /// Coarse progress for one named phase
    Progress { phase: Phase, percent: u8 },

    /// The plan is available. Internal-only: the wire protocol has no
    /// vocabulary for plans, so the encoder drops this kind.
    PlanReady { plan: SearchPlan },

    /// All search results settled, in plan-index order
    EvidenceBatch { results: Vec<SearchResult> },

    /// The synthesized report is available
    ReportReady { report: Report },

    /// Outcome of the delivery stage
    Delivery { outcome: DeliveryOutcome },

    /// Terminal event: `error: None` is success, otherwise the run failed
    Finished { error: Option<String> },
}

impl ProgressEvent {
    /// Build a log event stamped with the current time
    pub fn log(channel: &'static str, level: Level, message: impl Into<String>) -> Self {
        Self::Log {
            channel,
            level,
            timestamp: Utc::now(),
            message: message.into(),
        }
    }

    /// True for the terminal event kind
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. })
    }
}
