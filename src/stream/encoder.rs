//! Event transformation and stream encoding.
//!
//! [`transform`] maps internal progress events onto the fixed wire
//! vocabulary; the match is exhaustive, so a new internal event kind is a
//! compile-time decision to forward, drop, or expand. [`StreamEncoder`]
//! drains the event channel onto a writer and guarantees the stream ends
//! with exactly one terminal event.

use anyhow::{Context, Result};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::debug;

use super::wire::{WireEvent, END_OF_STREAM};
use crate::domain::events::ProgressEvent;
use crate::domain::report::{SearchOutcome, SearchResult};

/// Longest snippet forwarded in an `evidence` event
const SNIPPET_LEN: usize = 200;

/// Map one internal event to zero or more wire events.
///
/// One-to-many: a batch of N search results expands to exactly N
/// `evidence` events in batch order. Internal-only kinds map to nothing.
pub fn transform(event: &ProgressEvent) -> Vec<WireEvent> {
    match event {
        ProgressEvent::Log {
            channel,
            level,
            timestamp,
            message,
        } => vec![WireEvent::Log {
            channel: (*channel).to_string(),
            level: *level,
            timestamp: *timestamp,
            text: message.clone(),
        }],

        ProgressEvent::Progress { phase, percent } => vec![WireEvent::Step {
            phase: phase.as_str().to_string(),
            percent: *percent,
        }],

        // No wire vocabulary for plans; dropped, not fatal.
        ProgressEvent::PlanReady { .. } => Vec::new(),

        ProgressEvent::EvidenceBatch { results } => {
            results.iter().map(evidence_event).collect()
        }

        ProgressEvent::ReportReady { report } => vec![WireEvent::Report {
            body: report.body.clone(),
        }],

        ProgressEvent::Delivery { outcome } => {
            // Lowercase the status token only; reason text may carry
            // case-sensitive detail (URLs, quoted issue strings).
            let status = format!("{:?}", outcome.status).to_lowercase();
            let text = match &outcome.reason {
                Some(reason) => format!("delivery {}: {}", status, reason),
                None => format!("delivery {}", status),
            };
            vec![WireEvent::Log {
                channel: "delivery".to_string(),
                level: crate::domain::events::Level::Info,
                timestamp: chrono::Utc::now(),
                text,
            }]
        }

        ProgressEvent::Finished { error } => match error {
            None => vec![WireEvent::Done],
            Some(message) => vec![WireEvent::Error {
                message: message.clone(),
            }],
        },
    }
}

fn evidence_event(result: &SearchResult) -> WireEvent {
    let snippet = match &result.outcome {
        SearchOutcome::Summary(text) => truncate(text, SNIPPET_LEN),
        SearchOutcome::Failed { reason } => format!("search failed: {}", reason),
    };

    WireEvent::Evidence {
        // Citation numbers are 1-based plan positions
        id: result.index + 1,
        title: result.query.clone(),
        snippet,
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let cut = text
        .char_indices()
        .take_while(|(i, _)| *i < max)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    format!("{}...", &text[..cut])
}

/// Encodes a run's event stream onto a writer, one JSON line per event.
pub struct StreamEncoder<W> {
    writer: W,
    /// Append the transport sentinel after the terminal event
    emit_sentinel: bool,
}

impl<W: AsyncWrite + Unpin + Send> StreamEncoder<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            emit_sentinel: true,
        }
    }

    /// Disable the trailing end-of-stream sentinel
    pub fn without_sentinel(mut self) -> Self {
        self.emit_sentinel = false;
        self
    }

    /// Drain the event channel until a terminal event is written.
    ///
    /// If the channel closes before a terminal event arrives, the stream is
    /// broken upstream; an `error` terminal is synthesized so the client
    /// never observes a stream with no terminal. Dropping the channel's
    /// sender side is also how observer-side cancellation propagates.
    pub async fn run(mut self, mut events: mpsc::Receiver<ProgressEvent>) -> Result<()> {
        let mut terminal_sent = false;

        'outer: while let Some(event) = events.recv().await {
            for wire in transform(&event) {
                let terminal = wire.is_terminal();
                self.write_event(&wire).await?;
                if terminal {
                    terminal_sent = true;
                    break 'outer;
                }
            }
        }

        if !terminal_sent {
            debug!("event stream ended without terminal event, synthesizing error");
            self.write_event(&WireEvent::Error {
                message: "stream ended without terminal event".to_string(),
            })
            .await?;
        }

        if self.emit_sentinel {
            self.writer
                .write_all(END_OF_STREAM.as_bytes())
                .await
                .context("Failed to write end-of-stream sentinel")?;
            self.writer.write_all(b"\n").await?;
        }

        self.writer.flush().await.context("Failed to flush stream")?;
        Ok(())
    }

    async fn write_event(&mut self, event: &WireEvent) -> Result<()> {
        let line = event.to_line().context("Failed to encode wire event")?;
        self.writer
            .write_all(line.as_bytes())
            .await
            .context("Failed to write wire event")?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }
}
