//! The run state machine.
//!
//! Sequences Planning, Researching, Writing, and Delivering, publishing
//! progress events throughout. Research fans out one bounded worker per
//! plan item and rejoins results in plan-index order. Planning and Writing
//! are critical path; a search item failure only degrades the run, and a
//! blocked or failed delivery is a business outcome, not a run failure.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;
use tracing::{error, info, instrument, warn};

use crate::config::RunConfig;
use crate::domain::events::{Level, Phase, ProgressEvent};
use crate::domain::plan::SearchPlan;
use crate::domain::query::ResearchQuery;
use crate::domain::report::{SearchOutcome, SearchResult};
use crate::domain::run::{DeliveryOutcome, Run, RunState};
use crate::guardrails::GuardrailEngine;

use super::error::{StageError, ValidationError};
use super::stage::{OutboundMessage, PlannerStage, SearchStage, Transport, WriterInput, WriterStage};

/// The remote observer went away; stop work, there is no one to report to
struct Disconnected;

/// Event publication handle for one run
struct EventSink {
    tx: mpsc::Sender<ProgressEvent>,
}

impl EventSink {
    /// Publish one event. Fails only when the observer has disconnected,
    /// which cancels the run at the next publish point.
    async fn publish(&self, event: ProgressEvent) -> Result<(), Disconnected> {
        self.tx.send(event).await.map_err(|_| Disconnected)
    }

    async fn log(
        &self,
        channel: &'static str,
        level: Level,
        message: impl Into<String>,
    ) -> Result<(), Disconnected> {
        self.publish(ProgressEvent::log(channel, level, message)).await
    }

    async fn progress(&self, phase: Phase, percent: u8) -> Result<(), Disconnected> {
        self.publish(ProgressEvent::Progress { phase, percent }).await
    }

    /// Run a stage future while watching for observer disconnect.
    ///
    /// A disconnect wins the race and drops the stage future, cancelling
    /// whatever work it owns; for the research fan-out that drops the
    /// `JoinSet` and aborts its in-flight workers.
    async fn guard<F, T>(&self, work: F) -> Result<T, Disconnected>
    where
        F: Future<Output = T>,
    {
        tokio::select! {
            _ = self.tx.closed() => Err(Disconnected),
            value = work => Ok(value),
        }
    }
}

/// Pipeline orchestrator: one instance serves one run at a time per
/// invocation, sharing only the rate limiter across runs.
pub struct Orchestrator {
    planner: Arc<PlannerStage>,
    searcher: Arc<SearchStage>,
    writer: Arc<WriterStage>,
    transport: Option<Arc<dyn Transport>>,
    guardrails: GuardrailEngine,
    config: RunConfig,
}

impl Orchestrator {
    /// Create an orchestrator over the three research stages
    pub fn new(
        planner: Arc<PlannerStage>,
        searcher: Arc<SearchStage>,
        writer: Arc<WriterStage>,
        guardrails: GuardrailEngine,
        config: RunConfig,
    ) -> Self {
        Self {
            planner,
            searcher,
            writer,
            transport: None,
            guardrails,
            config,
        }
    }

    /// Attach a delivery transport
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Validate inputs and start a run in the background.
    ///
    /// Validation failures reject synchronously: no task is spawned and no
    /// events are emitted. The returned receiver carries the run's progress
    /// events, ending with exactly one terminal `Finished` event; dropping
    /// it cancels the run.
    pub fn start_run(
        self: &Arc<Self>,
        query: &str,
        recipient: Option<&str>,
    ) -> Result<mpsc::Receiver<ProgressEvent>, ValidationError> {
        let query = ResearchQuery::new(query, recipient.map(String::from))?;

        let (tx, rx) = mpsc::channel(64);
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.execute(query, tx).await;
        });

        Ok(rx)
    }

    /// Execute a run to completion, publishing events on `tx`.
    ///
    /// Always returns the final `Run`; the terminal state is `Completed`,
    /// `Failed`, or `Failed` with a cancellation reason if the observer
    /// disconnected mid-run.
    #[instrument(skip(self, query, tx), fields(query = %query.text))]
    pub async fn execute(&self, query: ResearchQuery, tx: mpsc::Sender<ProgressEvent>) -> Run {
        let mut run = Run::new(query);
        info!(run_id = %run.id, "starting research run");

        let sink = EventSink { tx };
        if let Err(Disconnected) = self.drive(&mut run, &sink).await {
            warn!(run_id = %run.id, "observer disconnected, run cancelled");
            if !run.is_finished() {
                run.finish(RunState::Failed {
                    error: "cancelled: observer disconnected".to_string(),
                });
            }
        }

        run
    }

    async fn drive(&self, run: &mut Run, tx: &EventSink) -> Result<(), Disconnected> {
        tx.log("run", Level::Info, "initializing research run").await?;

        // Planning: critical path, hard deadline
        tx.progress(Phase::Planning, 0).await?;
        tx.log("planner", Level::Info, "planning research strategy").await?;

        let planned = tx
            .guard(timeout(
                self.config.planning_timeout(),
                self.planner.run(run.query.text.clone()),
            ))
            .await?;
        let plan = match planned {
            Ok(Ok(plan)) => match plan.validate() {
                Ok(()) => plan,
                Err(e) => return self.fail(run, tx, e).await,
            },
            Ok(Err(e)) => return self.fail(run, tx, e).await,
            Err(_) => {
                return self
                    .fail(
                        run,
                        tx,
                        StageError::Timeout {
                            stage: "plan",
                            seconds: self.config.planning_timeout_seconds,
                        },
                    )
                    .await
            }
        };

        info!(searches = plan.len(), "search plan ready");
        run.plan = Some(plan.clone());
        tx.publish(ProgressEvent::PlanReady { plan: plan.clone() }).await?;
        tx.log(
            "planner",
            Level::Info,
            format!("created plan with {} searches", plan.len()),
        )
        .await?;

        // Researching: bounded fan-out, plan-order fan-in
        run.state = RunState::Researching;
        tx.progress(Phase::Searching, 25).await?;
        tx.log("search", Level::Info, "performing web searches").await?;

        let results = tx.guard(self.research(&plan)).await?;
        let usable = results.iter().filter(|r| r.is_usable()).count();
        let failed = results.len() - usable;

        if usable == 0 {
            return self
                .fail(
                    run,
                    tx,
                    StageError::NoUsableResults {
                        attempted: results.len(),
                    },
                )
                .await;
        }

        run.results = results.clone();
        tx.publish(ProgressEvent::EvidenceBatch { results: results.clone() }).await?;
        tx.log(
            "search",
            if failed > 0 { Level::Warning } else { Level::Info },
            format!("completed {} searches ({} failed)", results.len(), failed),
        )
        .await?;

        // Writing: critical path, hard deadline
        run.state = RunState::Writing;
        tx.progress(Phase::Writing, 50).await?;
        tx.log("writer", Level::Info, "synthesizing research report").await?;

        let summaries: Vec<String> = results
            .iter()
            .filter_map(|r| r.summary().map(String::from))
            .collect();
        let input = WriterInput {
            query: run.query.text.clone(),
            summaries,
        };

        let written = tx
            .guard(timeout(self.config.writing_timeout(), self.writer.run(input)))
            .await?;
        let mut report = match written {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => return self.fail(run, tx, e).await,
            Err(_) => {
                return self
                    .fail(
                        run,
                        tx,
                        StageError::Timeout {
                            stage: "write",
                            seconds: self.config.writing_timeout_seconds,
                        },
                    )
                    .await
            }
        };
        report.degraded = failed > 0;

        info!(words = report.word_count, degraded = report.degraded, "report written");
        tx.publish(ProgressEvent::ReportReady { report: report.clone() }).await?;
        tx.log(
            "writer",
            Level::Info,
            format!("generated report: ~{} words", report.word_count),
        )
        .await?;
        run.report = Some(report.clone());

        // Delivering: only when a recipient was given
        if let Some(recipient) = run.query.recipient.clone() {
            run.state = RunState::Delivering;
            tx.progress(Phase::Delivering, 75).await?;
            tx.log(
                "delivery",
                Level::Info,
                format!("delivering report to {}", recipient),
            )
            .await?;

            let subject = run.query.subject();
            let outcome = tx
                .guard(self.deliver(&subject, &report.body, &recipient, tx))
                .await??;
            tx.publish(ProgressEvent::Delivery { outcome: outcome.clone() }).await?;
            run.delivery = Some(outcome);

            tx.progress(Phase::Delivering, 100).await?;
        } else {
            tx.progress(Phase::Writing, 100).await?;
        }

        run.finish(RunState::Completed);
        info!(run_id = %run.id, "run completed");
        tx.log("run", Level::Info, "research complete").await?;
        tx.publish(ProgressEvent::Finished { error: None }).await?;
        Ok(())
    }

    /// Fan out one worker per plan item and rejoin in plan-index order.
    ///
    /// Concurrency is bounded by the plan size (3-5). Workers settle
    /// independently; a per-item timeout or error degrades that item only.
    async fn research(&self, plan: &SearchPlan) -> Vec<SearchResult> {
        let deadline = self.config.search_timeout();
        let mut workers = JoinSet::new();

        for (index, item) in plan.searches.iter().cloned().enumerate() {
            let searcher = Arc::clone(&self.searcher);
            let query = item.query.clone();
            workers.spawn(async move {
                let outcome = match timeout(deadline, searcher.run(item)).await {
                    Ok(Ok(summary)) => SearchOutcome::Summary(summary),
                    Ok(Err(e)) => {
                        warn!(index, error = %e, "search item failed");
                        SearchOutcome::Failed { reason: e.to_string() }
                    }
                    Err(_) => {
                        warn!(index, "search item timed out");
                        SearchOutcome::Failed {
                            reason: format!("timed out after {}s", deadline.as_secs()),
                        }
                    }
                };
                (index, query, outcome)
            });
        }

        // Join barrier: wait for every worker, then re-sequence by plan
        // index so completion order never leaks downstream.
        let mut slots: Vec<Option<SearchResult>> = (0..plan.len()).map(|_| None).collect();
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok((index, query, outcome)) => {
                    slots[index] = Some(SearchResult { index, query, outcome });
                }
                Err(e) => {
                    // Index unknown for a panicked worker; empty slots are
                    // backfilled below.
                    error!(error = %e, "search worker panicked");
                }
            }
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| SearchResult {
                    index,
                    query: plan.searches[index].query.clone(),
                    outcome: SearchOutcome::Failed {
                        reason: "search worker panicked".to_string(),
                    },
                })
            })
            .collect()
    }

    /// Gate the send behind the guardrail engine, then hand to the
    /// transport with bounded retry.
    async fn deliver(
        &self,
        subject: &str,
        body: &str,
        recipient: &str,
        tx: &EventSink,
    ) -> Result<DeliveryOutcome, Disconnected> {
        let verdict = self.guardrails.evaluate(subject, body, recipient);

        for warning in &verdict.warnings {
            tx.log("guardrails", Level::Warning, warning.clone()).await?;
        }

        if !verdict.passed {
            warn!(
                spam_score = verdict.spam_score,
                issues = verdict.blocking_issues.len(),
                "delivery blocked by guardrails"
            );
            for issue in &verdict.blocking_issues {
                tx.log("guardrails", Level::Warning, format!("blocked: {}", issue))
                    .await?;
            }
            return Ok(DeliveryOutcome::blocked(verdict.blocking_issues.join("; ")));
        }

        let Some(transport) = self.transport.as_ref() else {
            warn!("recipient given but no transport configured");
            return Ok(DeliveryOutcome::failed("no transport configured"));
        };

        let message = OutboundMessage {
            subject: subject.to_string(),
            body: body.to_string(),
            recipient: recipient.to_string(),
        };

        let policy = &self.config.delivery_retry;
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match transport.send(&message).await {
                Ok(()) => {
                    info!(attempt, transport = transport.name(), "report delivered");
                    return Ok(DeliveryOutcome::sent());
                }
                Err(e) if policy.should_retry(attempt) => {
                    let delay = policy.delay_for_attempt(attempt);
                    warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transport failed, retrying"
                    );
                    tx.log(
                        "delivery",
                        Level::Warning,
                        format!("transport failed (attempt {}), retrying: {}", attempt, e),
                    )
                    .await?;
                    tokio::time::sleep(delay).await;
                }
                Err(e) => {
                    error!(attempt, error = %e, "transport failed permanently");
                    tx.log(
                        "delivery",
                        Level::Error,
                        format!("transport failed after {} attempts: {}", attempt, e),
                    )
                    .await?;
                    return Ok(DeliveryOutcome::failed(e.to_string()));
                }
            }
        }
    }

    /// Convert a critical-path stage error into the absorbing `Failed` state
    async fn fail(
        &self,
        run: &mut Run,
        tx: &EventSink,
        error: StageError,
    ) -> Result<(), Disconnected> {
        let message = error.to_string();
        error!(run_id = %run.id, %message, "run failed");

        tx.log("run", Level::Error, message.clone()).await?;
        tx.publish(ProgressEvent::Finished {
            error: Some(message.clone()),
        })
        .await?;

        run.finish(RunState::Failed { error: message });
        Ok(())
    }

    /// Debug snapshot of shared limiter state
    pub fn rate_limit_stats(&self) -> crate::guardrails::RateLimitStats {
        self.guardrails.limiter().stats()
    }
}
