#![allow(dead_code)]
//! Shared stage stubs for integration tests.
//!
//! Stages are opaque capabilities to the orchestrator, so tests drive the
//! pipeline with deterministic stand-ins. Search stubs sleep longer for
//! earlier plan indexes, making completion order the reverse of plan order.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use scout::core::stage::{OutboundMessage, Stage, Transport, WriterInput};
use scout::core::{StageError, TransportError};
use scout::domain::{ProgressEvent, Report, SearchItem, SearchPlan};
use scout::{GuardrailEngine, Orchestrator, RateLimiter, RetryPolicy, RunConfig};

/// Planner returning a fixed-size plan. Items whose index appears in
/// `failing` get a reason the stub searcher treats as an order to fail.
pub struct StubPlanner {
    pub searches: usize,
    pub failing: Vec<usize>,
}

#[async_trait]
impl Stage for StubPlanner {
    type Input = String;
    type Output = SearchPlan;

    fn name(&self) -> &'static str {
        "plan"
    }

    async fn run(&self, _query: String) -> Result<SearchPlan, StageError> {
        Ok(SearchPlan {
            searches: (0..self.searches)
                .map(|i| SearchItem {
                    reason: if self.failing.contains(&i) {
                        format!("fail angle {}", i)
                    } else {
                        format!("angle {}", i)
                    },
                    query: format!("q{}", i),
                })
                .collect(),
        })
    }
}

/// Planner that always fails
pub struct FailingPlanner;

#[async_trait]
impl Stage for FailingPlanner {
    type Input = String;
    type Output = SearchPlan;

    fn name(&self) -> &'static str {
        "plan"
    }

    async fn run(&self, _query: String) -> Result<SearchPlan, StageError> {
        Err(StageError::failed("plan", "provider unavailable"))
    }
}

/// Searcher whose delay decreases with plan index, so the last item
/// finishes first. Fails items the planner marked as failing.
pub struct StubSearcher {
    pub calls: AtomicUsize,
}

impl StubSearcher {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Stage for StubSearcher {
    type Input = SearchItem;
    type Output = String;

    fn name(&self) -> &'static str {
        "search"
    }

    async fn run(&self, item: SearchItem) -> Result<String, StageError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let index: u64 = item.query.trim_start_matches('q').parse().unwrap_or(0);
        tokio::time::sleep(Duration::from_millis((5 - index.min(5)) * 20)).await;

        if item.reason.starts_with("fail") {
            return Err(StageError::failed("search", format!("no results for {}", item.query)));
        }
        Ok(format!("summary for {}", item.query))
    }
}

/// Searcher that signals when a worker starts, then sleeps far past any
/// test deadline. `completed` only moves if a worker survives to the end.
pub struct HangingSearcher {
    pub started: Arc<Notify>,
    pub completed: AtomicUsize,
}

impl HangingSearcher {
    pub fn new() -> Self {
        Self {
            started: Arc::new(Notify::new()),
            completed: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Stage for HangingSearcher {
    type Input = SearchItem;
    type Output = String;

    fn name(&self) -> &'static str {
        "search"
    }

    async fn run(&self, _item: SearchItem) -> Result<String, StageError> {
        self.started.notify_one();
        tokio::time::sleep(Duration::from_secs(60)).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok("late findings".to_string())
    }
}

/// Writer that renders a fixed body, or the joined summaries by default
pub struct StubWriter {
    pub body: Option<String>,
}

impl StubWriter {
    pub fn new() -> Self {
        Self { body: None }
    }

    pub fn with_body(body: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
        }
    }
}

#[async_trait]
impl Stage for StubWriter {
    type Input = WriterInput;
    type Output = Report;

    fn name(&self) -> &'static str {
        "write"
    }

    async fn run(&self, input: WriterInput) -> Result<Report, StageError> {
        let body = self
            .body
            .clone()
            .unwrap_or_else(|| format!("# {}\n\n{}", input.query, input.summaries.join("\n\n")));
        Ok(Report::new(
            format!("Findings for: {}", input.query),
            body,
            vec!["further reading".to_string()],
        ))
    }
}

/// Transport failing a configurable number of leading attempts
pub struct FlakyTransport {
    pub fail_first: u32,
    pub attempts: AtomicU32,
}

impl FlakyTransport {
    pub fn new(fail_first: u32) -> Self {
        Self {
            fail_first,
            attempts: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn send(&self, _message: &OutboundMessage) -> Result<(), TransportError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        if attempt <= self.fail_first {
            return Err(TransportError::Request(format!(
                "connection refused (attempt {})",
                attempt
            )));
        }
        Ok(())
    }
}

/// Fast deadlines and retry delays for tests
pub fn test_config() -> RunConfig {
    RunConfig {
        planning_timeout_seconds: 5,
        search_timeout_seconds: 5,
        writing_timeout_seconds: 5,
        delivery_retry: RetryPolicy {
            max_attempts: 3,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        },
        hourly_send_limit: 50,
        daily_send_limit: 500,
    }
}

/// Orchestrator over the default stubs
pub fn orchestrator(planner: StubPlanner) -> Arc<Orchestrator> {
    let engine = GuardrailEngine::new(Arc::new(RateLimiter::new(50, 500)));
    Arc::new(Orchestrator::new(
        Arc::new(planner),
        Arc::new(StubSearcher::new()),
        Arc::new(StubWriter::new()),
        engine,
        test_config(),
    ))
}

/// Drain an event channel into a vector
pub async fn collect(mut rx: mpsc::Receiver<ProgressEvent>) -> Vec<ProgressEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub const QUERY: &str = "state of rust async runtimes in 2026";
