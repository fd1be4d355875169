use serde::{Deserialize, Serialize};

use oats_domain::error::Result;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Request / Response types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One completion request to the oracle.
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// Fixed system preamble (agent protocol, tool contract, safety rules).
    pub system: String,
    /// The composed turn prompt.
    pub prompt: String,
    /// When `true`, request a single JSON object as the reply.
    pub json_only: bool,
    /// Model override. `None` uses the adapter's default.
    pub model: Option<String>,
    /// Sampling temperature. `None` lets the provider choose.
    pub temperature: Option<f32>,
    /// Output-token cap. `None` uses the adapter's default.
    pub max_tokens: Option<u32>,
}

/// The oracle's reply.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    /// The model that actually produced the response.
    pub model: String,
    pub usage: Option<Usage>,
}

/// Token usage for one completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Oracle trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Trait every oracle adapter implements.
///
/// Error contract: transport problems, timeouts, and 5xx/429 responses
/// map to `Error::Http`/`Error::Timeout` (transient, retried by the
/// caller); other API rejections map to `Error::Provider` (permanent).
#[async_trait::async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Send one completion request and wait for the full response.
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse>;

    /// A short identifier for this adapter ("anthropic", "openai").
    fn provider_id(&self) -> &str;
}
