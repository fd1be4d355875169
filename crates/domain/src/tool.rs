use serde::{Deserialize, Serialize};

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolStatus {
    Success,
    Failure,
}

/// Result of one tool invocation, as returned by the executor.
///
/// Failures are ordinary data: the reasoning loop reports them back to the
/// agent as observations and continues. `summary` is present only when the
/// output was large enough to be funneled to disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    pub status: ToolStatus,
    /// Stringified tool output. For funneled results this is the preview
    /// plus spill-file guidance, not the full payload.
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<ObservationSummary>,
}

impl ToolResult {
    pub fn success(output: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: ToolStatus::Success,
            output: output.into(),
            error: None,
            duration_ms,
            summary: None,
        }
    }

    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            status: ToolStatus::Failure,
            output: String::new(),
            error: Some(error.into()),
            duration_ms,
            summary: None,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == ToolStatus::Failure
    }
}

/// Summary of a funneled (oversized) tool output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservationSummary {
    pub total_lines: usize,
    pub total_chars: usize,
    /// Match count, extracted best-effort for search-like tools.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_matches: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files_with_matches: Option<usize>,
    /// Where the full payload was spilled on disk.
    pub full_output_path: String,
    /// Head-and-tail excerpt with a truncation marker in between.
    pub preview: String,
}
