//! The streaming wire protocol.
//!
//! One event per line, each a self-describing JSON envelope with a `type`
//! discriminator. The vocabulary is fixed: `log`, `step`, `evidence`,
//! `report`, `done`, `error`. Exactly one of `done`/`error` ends a stream.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::events::Level;

/// Transport-level end-of-transmission marker. Not a payload line:
/// decoders filter it, encoders may append it after the terminal event.
pub const END_OF_STREAM: &str = "[DONE]";

/// One line of the externally visible stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireEvent {
    /// Human-readable progress narration
    Log {
        channel: String,
        level: Level,
        timestamp: DateTime<Utc>,
        text: String,
    },

    /// Coarse progress indicator for one phase
    Step { phase: String, percent: u8 },

    /// One resolved search result
    Evidence {
        id: usize,
        title: String,
        snippet: String,
    },

    /// Final synthesized report
    Report { body: String },

    /// Terminal success marker
    Done,

    /// Terminal failure marker
    Error { message: String },
}

impl WireEvent {
    /// True for `done` and `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self, WireEvent::Done | WireEvent::Error { .. })
    }

    /// Serialize to one line of the wire protocol
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Decode one received line.
///
/// Returns `Ok(None)` for blank lines and the end-of-stream sentinel,
/// which are framing, not payload.
pub fn decode_line(line: &str) -> serde_json::Result<Option<WireEvent>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed == END_OF_STREAM {
        return Ok(None);
    }
    serde_json::from_str(trimmed).map(Some)
}
