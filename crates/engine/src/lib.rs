//! The Reasoning Engine: a bounded Reflect–Strategize–Act loop.
//!
//! Each turn composes a prompt from the agent state and transcript,
//! calls the completion oracle, parses the structured reply, dispatches
//! the chosen tool through the executor, and merges the proposed state
//! revision back in under the engine's invariants.

pub mod engine;
pub mod events;
pub mod merge;
pub mod parse;
pub mod prompt;

pub use engine::{EngineReport, ReasoningEngine};
pub use events::{CollectSink, EventSink, StdoutSink};
