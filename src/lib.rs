//! scout - Deep-research pipeline orchestrator with guarded delivery
//!
//! Drives a free-text research query through a four-stage pipeline and
//! streams live progress to a remote observer:
//! - Plan: produce a 3-5 item search plan
//! - Research: fan out one bounded worker per plan item, rejoin in plan order
//! - Write: synthesize the ordered summaries into a report
//! - Deliver: gate the outbound send behind guardrails and rate limits
//!
//! # Modules
//!
//! - `domain`: queries, plans, results, reports, runs, progress events
//! - `core`: stage contracts, error taxonomy, the orchestrator
//! - `guardrails`: delivery validation pipeline and the shared rate limiter
//! - `stream`: internal-event-to-wire transformation and line encoding
//! - `adapters`: concrete collaborator implementations (webhook transport)
//! - `config`: run deadlines, retry policy, rate limits

pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod guardrails;
pub mod stream;

// Re-export main types at crate root for convenience
pub use config::{RetryPolicy, RunConfig};
pub use crate::core::{Orchestrator, Stage, StageError, Transport, TransportError, ValidationError};
pub use domain::{
    DeliveryOutcome, DeliveryStatus, ProgressEvent, Report, ResearchQuery, Run, RunState,
    SearchItem, SearchOutcome, SearchPlan, SearchResult,
};
pub use guardrails::{GuardrailEngine, GuardrailVerdict, RateLimiter};
pub use stream::{StreamEncoder, WireEvent};
