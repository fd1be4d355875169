//! The worker → control-plane event protocol.
//!
//! A worker emits exactly one JSON-encoded [`Event`] per stdout line.
//! Non-event log lines may appear interleaved; consumers filter by the
//! presence of a recognized `type` field via [`Event::parse_line`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tool::{ObservationSummary, ToolStatus};

/// A structured progress event streamed from a worker to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// The agent's reasoning for the current turn.
    Thought { turn: u32, content: String },

    /// The agent is invoking a tool.
    Action { turn: u32, tool: String, params: Value },

    /// Result of a tool invocation.
    Observation {
        turn: u32,
        tool: String,
        status: ToolStatus,
        output: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        duration_ms: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        summary: Option<ObservationSummary>,
    },

    /// Engine-level progress or warning (e.g. state-merge downgrades).
    Status { message: String },

    /// A terminal error: the investigation failed.
    Error { message: String },

    /// The finish tool fired: the investigation succeeded.
    Finish { result: String, turns_used: u32 },
}

impl Event {
    /// The wire-level tag for this event.
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::Thought { .. } => "thought",
            Event::Action { .. } => "action",
            Event::Observation { .. } => "observation",
            Event::Status { .. } => "status",
            Event::Error { .. } => "error",
            Event::Finish { .. } => "finish",
        }
    }

    /// Serialize to a single NDJSON line (no trailing newline).
    pub fn to_line(&self) -> String {
        // Serialization of these variants cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse one stdout line into an event.
    ///
    /// Returns `None` for non-JSON lines, JSON without a recognized `type`
    /// tag, and events whose payload does not match the declared shape.
    /// This is the shape-validation the control plane performs; it never
    /// interprets payloads beyond this.
    pub fn parse_line(line: &str) -> Option<Event> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return None;
        }
        serde_json::from_str(trimmed).ok()
    }
}
