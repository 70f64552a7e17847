//! Orchestrator Integration Tests
//!
//! End-to-end scenarios over stub stages: validation rejection, degraded
//! runs, total research failure, guarded delivery, transport retries,
//! ordering, and cancellation.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;

use std::time::{Duration, Instant};

use common::{
    collect, orchestrator, test_config, FailingPlanner, FlakyTransport, HangingSearcher,
    StubPlanner, StubSearcher, StubWriter, QUERY,
};
use scout::core::stage::{SearchStage, Transport};
use scout::domain::{DeliveryStatus, ProgressEvent, ResearchQuery, RunState, SearchOutcome};
use scout::{GuardrailEngine, Orchestrator, RateLimiter, ValidationError};

fn terminal(events: &[ProgressEvent]) -> &ProgressEvent {
    events
        .iter()
        .rev()
        .find(|e| matches!(e, ProgressEvent::Finished { .. }))
        .expect("run emitted no terminal event")
}

#[tokio::test]
async fn test_short_query_rejected_before_any_stage() {
    let orch = orchestrator(StubPlanner {
        searches: 3,
        failing: vec![],
    });

    // 8 characters, below the 12-character minimum
    let result = orch.start_run("too tiny", None);
    assert!(matches!(
        result,
        Err(ValidationError::QueryTooShort {
            length: 8,
            minimum: 12
        })
    ));
}

#[tokio::test]
async fn test_invalid_recipient_rejected_before_any_stage() {
    let orch = orchestrator(StubPlanner {
        searches: 3,
        failing: vec![],
    });

    let result = orch.start_run(QUERY, Some("not-an-address"));
    assert!(matches!(result, Err(ValidationError::InvalidRecipient { .. })));
}

#[tokio::test]
async fn test_successful_run_without_recipient() {
    let orch = orchestrator(StubPlanner {
        searches: 3,
        failing: vec![],
    });
    let query = ResearchQuery::new(QUERY, None).unwrap();
    let (tx, rx) = mpsc::channel(64);

    let (run, events) = tokio::join!(orch.execute(query, tx), collect(rx));

    assert_eq!(run.state, RunState::Completed);
    assert!(run.delivery.is_none());

    let report = run.report.expect("report missing");
    assert!(!report.degraded);
    assert!(report.word_count > 0);

    assert!(matches!(terminal(&events), ProgressEvent::Finished { error: None }));
}

#[tokio::test]
async fn test_partial_search_failure_degrades_run() {
    // Scenario: 5-item plan, item 1 fails, 4 succeed
    let orch = orchestrator(StubPlanner {
        searches: 5,
        failing: vec![1],
    });
    let query = ResearchQuery::new(QUERY, None).unwrap();
    let (tx, rx) = mpsc::channel(64);

    let (run, events) = tokio::join!(orch.execute(query, tx), collect(rx));

    assert_eq!(run.state, RunState::Completed);
    assert!(run.report.unwrap().degraded);

    assert_eq!(run.results.len(), 5);
    assert!(!run.results[1].is_usable());
    assert_eq!(run.results.iter().filter(|r| r.is_usable()).count(), 4);

    assert!(matches!(terminal(&events), ProgressEvent::Finished { error: None }));
}

#[tokio::test]
async fn test_all_searches_failing_fails_run() {
    let orch = orchestrator(StubPlanner {
        searches: 5,
        failing: vec![0, 1, 2, 3, 4],
    });
    let query = ResearchQuery::new(QUERY, None).unwrap();
    let (tx, rx) = mpsc::channel(64);

    let (run, events) = tokio::join!(orch.execute(query, tx), collect(rx));

    match &run.state {
        RunState::Failed { error } => assert!(error.contains("zero usable results")),
        other => panic!("expected Failed, got {:?}", other),
    }
    assert!(run.report.is_none());

    match terminal(&events) {
        ProgressEvent::Finished { error: Some(message) } => {
            assert!(message.contains("all 5 searches failed"));
        }
        other => panic!("expected failed terminal, got {:?}", other),
    }
}

#[tokio::test]
async fn test_planner_failure_is_critical() {
    let engine = GuardrailEngine::new(Arc::new(RateLimiter::new(50, 500)));
    let searcher = Arc::new(StubSearcher::new());
    let orch = Orchestrator::new(
        Arc::new(FailingPlanner),
        Arc::clone(&searcher) as Arc<SearchStage>,
        Arc::new(StubWriter::new()),
        engine,
        test_config(),
    );

    let query = ResearchQuery::new(QUERY, None).unwrap();
    let (tx, rx) = mpsc::channel(64);
    let (run, _events) = tokio::join!(orch.execute(query, tx), collect(rx));

    assert!(matches!(run.state, RunState::Failed { .. }));
    // A failed plan never reaches the research fan-out
    assert_eq!(searcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_results_rejoin_in_plan_order() {
    // Stub searchers finish in reverse plan order; aggregation must not
    // care about completion timing.
    let orch = orchestrator(StubPlanner {
        searches: 5,
        failing: vec![],
    });
    let query = ResearchQuery::new(QUERY, None).unwrap();
    let (tx, rx) = mpsc::channel(64);

    let (run, events) = tokio::join!(orch.execute(query, tx), collect(rx));

    assert_eq!(run.results.len(), 5);
    for (i, result) in run.results.iter().enumerate() {
        assert_eq!(result.index, i);
        assert_eq!(result.query, format!("q{}", i));
        assert_eq!(
            result.outcome,
            SearchOutcome::Summary(format!("summary for q{}", i))
        );
    }

    // The evidence batch carries the same ordering
    let batch = events
        .iter()
        .find_map(|e| match e {
            ProgressEvent::EvidenceBatch { results } => Some(results),
            _ => None,
        })
        .expect("no evidence batch published");
    let indexes: Vec<usize> = batch.iter().map(|r| r.index).collect();
    assert_eq!(indexes, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_delivery_sent_after_transient_transport_failure() {
    let transport = Arc::new(FlakyTransport::new(1));
    let engine = GuardrailEngine::new(Arc::new(RateLimiter::new(50, 500)));
    let orch = Orchestrator::new(
        Arc::new(StubPlanner {
            searches: 3,
            failing: vec![],
        }),
        Arc::new(StubSearcher::new()),
        Arc::new(StubWriter::new()),
        engine,
        test_config(),
    )
    .with_transport(Arc::clone(&transport) as Arc<dyn Transport>);

    let query = ResearchQuery::new(QUERY, Some("jane@example.com".to_string())).unwrap();
    let (tx, rx) = mpsc::channel(64);
    let (run, events) = tokio::join!(orch.execute(query, tx), collect(rx));

    assert_eq!(run.state, RunState::Completed);
    let outcome = run.delivery.expect("delivery outcome missing");
    assert_eq!(outcome.status, DeliveryStatus::Sent);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);

    assert!(matches!(terminal(&events), ProgressEvent::Finished { error: None }));
}

#[tokio::test]
async fn test_delivery_failed_after_retry_exhaustion_still_completes() {
    // Scenario: guardrails pass, transport fails every attempt
    let transport = Arc::new(FlakyTransport::new(u32::MAX));
    let engine = GuardrailEngine::new(Arc::new(RateLimiter::new(50, 500)));
    let orch = Orchestrator::new(
        Arc::new(StubPlanner {
            searches: 3,
            failing: vec![],
        }),
        Arc::new(StubSearcher::new()),
        Arc::new(StubWriter::new()),
        engine,
        test_config(),
    )
    .with_transport(Arc::clone(&transport) as Arc<dyn Transport>);

    let query = ResearchQuery::new(QUERY, Some("jane@example.com".to_string())).unwrap();
    let (tx, rx) = mpsc::channel(64);
    let (run, events) = tokio::join!(orch.execute(query, tx), collect(rx));

    // Delivery failure is not a pipeline failure
    assert_eq!(run.state, RunState::Completed);
    let outcome = run.delivery.expect("delivery outcome missing");
    assert_eq!(outcome.status, DeliveryStatus::Failed);
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 3);

    assert!(matches!(terminal(&events), ProgressEvent::Finished { error: None }));
}

#[tokio::test]
async fn test_blocked_delivery_still_completes_with_done() {
    // Scenario: spammy report body drives the score past the threshold
    let spammy = "You are a WINNER!!! casino lottery jackpot!!! ACT NOW!!! \
                  CLICK HERE NOW for 100% FREE money $$$";
    let transport = Arc::new(FlakyTransport::new(0));
    let engine = GuardrailEngine::new(Arc::new(RateLimiter::new(50, 500)));
    let orch = Orchestrator::new(
        Arc::new(StubPlanner {
            searches: 3,
            failing: vec![],
        }),
        Arc::new(StubSearcher::new()),
        Arc::new(StubWriter::with_body(spammy)),
        engine,
        test_config(),
    )
    .with_transport(Arc::clone(&transport) as Arc<dyn Transport>);

    let query = ResearchQuery::new(QUERY, Some("jane@example.com".to_string())).unwrap();
    let (tx, rx) = mpsc::channel(64);
    let (run, events) = tokio::join!(orch.execute(query, tx), collect(rx));

    assert_eq!(run.state, RunState::Completed);
    let outcome = run.delivery.expect("delivery outcome missing");
    assert_eq!(outcome.status, DeliveryStatus::Blocked);
    assert!(outcome.reason.unwrap().contains("spam score"));

    // The transport is never reached
    assert_eq!(transport.attempts.load(Ordering::SeqCst), 0);

    // Block reasons narrated before a `done` terminal, not an error
    assert!(events.iter().any(|e| matches!(
        e,
        ProgressEvent::Log { channel: "guardrails", message, .. } if message.starts_with("blocked:")
    )));
    assert!(matches!(terminal(&events), ProgressEvent::Finished { error: None }));
}

#[tokio::test]
async fn test_observer_disconnect_cancels_run() {
    let orch = orchestrator(StubPlanner {
        searches: 3,
        failing: vec![],
    });
    let query = ResearchQuery::new(QUERY, None).unwrap();

    let (tx, rx) = mpsc::channel(64);
    drop(rx);

    let run = orch.execute(query, tx).await;
    match run.state {
        RunState::Failed { error } => assert!(error.contains("cancelled")),
        other => panic!("expected cancelled run, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disconnect_mid_research_aborts_workers() {
    // Workers hang far past the 5s search deadline; dropping the receiver
    // mid-research must wind the run down without waiting that deadline out.
    let searcher = Arc::new(HangingSearcher::new());
    let engine = GuardrailEngine::new(Arc::new(RateLimiter::new(50, 500)));
    let orch = Orchestrator::new(
        Arc::new(StubPlanner {
            searches: 3,
            failing: vec![],
        }),
        Arc::clone(&searcher) as Arc<SearchStage>,
        Arc::new(StubWriter::new()),
        engine,
        test_config(),
    );

    let query = ResearchQuery::new(QUERY, None).unwrap();
    let (tx, rx) = mpsc::channel(64);

    let disconnect = {
        let started = Arc::clone(&searcher.started);
        tokio::spawn(async move {
            started.notified().await;
            drop(rx);
        })
    };

    let begun = Instant::now();
    let run = orch.execute(query, tx).await;
    disconnect.await.unwrap();

    assert!(
        begun.elapsed() < Duration::from_secs(2),
        "cancellation waited out the search deadline"
    );
    match run.state {
        RunState::Failed { error } => assert!(error.contains("cancelled")),
        other => panic!("expected cancelled run, got {:?}", other),
    }
    // Aborted workers never reach completion
    assert_eq!(searcher.completed.load(Ordering::SeqCst), 0);
}
