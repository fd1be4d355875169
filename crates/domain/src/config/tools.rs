use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool execution
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ToolsConfig {
    #[serde(default)]
    pub exec: ExecConfig,
    #[serde(default)]
    pub funnel: FunnelConfig,
}

/// Per-call execution limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecConfig {
    /// Hard timeout on one tool invocation.
    #[serde(default = "d_300")]
    pub timeout_secs: u64,
}

impl Default for ExecConfig {
    fn default() -> Self {
        Self { timeout_secs: 300 }
    }
}

/// Observation Funnel thresholds.
///
/// Output at or under BOTH thresholds passes through untouched; exceeding
/// either one spills the payload to the scratch directory and substitutes
/// a head-and-tail preview.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunnelConfig {
    #[serde(default = "d_50")]
    pub max_lines: usize,
    #[serde(default = "d_2000")]
    pub max_chars: usize,
    /// Lines of the payload kept at the top of the preview.
    #[serde(default = "d_10")]
    pub preview_head: usize,
    /// Lines kept at the bottom.
    #[serde(default = "d_5")]
    pub preview_tail: usize,
}

impl Default for FunnelConfig {
    fn default() -> Self {
        Self {
            max_lines: 50,
            max_chars: 2000,
            preview_head: 10,
            preview_tail: 5,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_300() -> u64 {
    300
}
fn d_50() -> usize {
    50
}
fn d_2000() -> usize {
    2000
}
fn d_10() -> usize {
    10
}
fn d_5() -> usize {
    5
}
