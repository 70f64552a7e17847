//! Stage and transport contracts.
//!
//! Every pipeline step is a [`Stage`]: typed input in, typed output or a
//! typed failure out. Prompting, model selection, and per-call retries
//! belong to the implementation behind the trait, not to the orchestrator.

use async_trait::async_trait;

use super::error::{StageError, TransportError};
use crate::domain::plan::{SearchItem, SearchPlan};
use crate::domain::report::Report;

/// A typed pipeline step
#[async_trait]
pub trait Stage: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Stage name used in logs and errors
    fn name(&self) -> &'static str;

    /// Execute the stage
    async fn run(&self, input: Self::Input) -> Result<Self::Output, StageError>;
}

/// Planning: query text to a validated search plan
pub type PlannerStage = dyn Stage<Input = String, Output = SearchPlan>;

/// Research: one search item to a findings summary
pub type SearchStage = dyn Stage<Input = SearchItem, Output = String>;

/// Writing: query plus ordered summaries to a report
pub type WriterStage = dyn Stage<Input = WriterInput, Output = Report>;

/// Input handed to the writing stage
#[derive(Debug, Clone)]
pub struct WriterInput {
    /// The original research query
    pub query: String,

    /// Usable search summaries, in plan-index order
    pub summaries: Vec<String>,
}

/// An outbound message handed to the transport after guardrails pass
#[derive(Debug, Clone)]
pub struct OutboundMessage {
    pub subject: String,
    pub body: String,
    pub recipient: String,
}

/// The delivery collaborator (e.g. a mail relay or webhook)
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable transport name
    fn name(&self) -> &'static str;

    /// Hand one message to the transport
    async fn send(&self, message: &OutboundMessage) -> Result<(), TransportError>;
}
