use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Reasoning engine
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which oracle reply schema wins when a response carries both the
/// four-section (`reflect`/`strategize`/`state`/`act`) and the legacy
/// two-section (`thought`/`action`) forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReplyPrecedence {
    /// Prefer the four-section structured form.
    #[default]
    Structured,
    /// Prefer the legacy two-section form.
    Legacy,
}

/// Tunables for the Reflect–Strategize–Act loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Client-side timeout on a single oracle call.
    #[serde(default = "d_60")]
    pub oracle_timeout_secs: u64,
    /// Attempts per oracle call (first try + retries on transient errors).
    #[serde(default = "d_3")]
    pub oracle_attempts: u32,
    /// Base delay for jittered exponential backoff between oracle retries.
    #[serde(default = "d_500")]
    pub backoff_base_ms: u64,
    /// Consecutive malformed oracle replies tolerated before failing.
    #[serde(default = "d_2")]
    pub parse_failure_limit: u32,
    /// Turns on one task before stuck detection arms.
    #[serde(default = "d_8")]
    pub stuck_task_turns: u32,
    /// Consecutive no-delta turns (no new fact, no new ruled-out entry)
    /// that trigger the one-shot forced-reflection directive.
    #[serde(default = "d_2")]
    pub stuck_no_delta_turns: u32,
    /// Character budget for the serialized transcript tail in the prompt.
    #[serde(default = "d_24000")]
    pub transcript_char_budget: usize,
    #[serde(default)]
    pub reply_precedence: ReplyPrecedence,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            oracle_timeout_secs: 60,
            oracle_attempts: 3,
            backoff_base_ms: 500,
            parse_failure_limit: 2,
            stuck_task_turns: 8,
            stuck_no_delta_turns: 2,
            transcript_char_budget: 24_000,
            reply_precedence: ReplyPrecedence::Structured,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_60() -> u64 {
    60
}
fn d_3() -> u32 {
    3
}
fn d_500() -> u64 {
    500
}
fn d_2() -> u32 {
    2
}
fn d_8() -> u32 {
    8
}
fn d_24000() -> usize {
    24_000
}
