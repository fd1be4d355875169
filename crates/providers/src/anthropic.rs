//! Anthropic Messages API adapter (non-streaming).
//!
//! System text goes in the top-level `system` field; the composed turn
//! prompt is a single user message.

use serde_json::Value;

use oats_domain::config::LlmConfig;
use oats_domain::error::{Error, Result};

use crate::traits::{CompletionProvider, CompletionRequest, CompletionResponse, Usage};
use crate::util::{from_reqwest, status_error};

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// An oracle adapter for the Anthropic Messages API.
pub struct AnthropicOracle {
    base_url: String,
    api_key: String,
    default_model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl AnthropicOracle {
    pub fn new(api_key: impl Into<String>, config: &LlmConfig, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            default_model: config.model.clone().unwrap_or_else(|| DEFAULT_MODEL.into()),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            client,
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());
        let mut prompt = req.prompt.clone();
        if req.json_only {
            prompt.push_str("\n\nRespond with a single JSON object and nothing else.");
        }

        let mut body = serde_json::json!({
            "model": model,
            "max_tokens": req.max_tokens.or(self.max_tokens).unwrap_or(DEFAULT_MAX_TOKENS),
            "messages": [{"role": "user", "content": prompt}],
        });
        if !req.system.is_empty() {
            body["system"] = Value::String(req.system.clone());
        }
        if let Some(temperature) = req.temperature.or(self.temperature) {
            body["temperature"] = serde_json::json!(temperature);
        }
        body
    }
}

#[async_trait::async_trait]
impl CompletionProvider for AnthropicOracle {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("Content-Type", "application/json")
            .json(&self.build_body(req))
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        let body_text = response.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(status_error("anthropic", status, &body_text));
        }

        let body: Value = serde_json::from_str(&body_text)?;
        parse_response(&body)
    }

    fn provider_id(&self) -> &str {
        "anthropic"
    }
}

fn parse_response(body: &Value) -> Result<CompletionResponse> {
    let content = body
        .get("content")
        .and_then(|v| v.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| {
                    (block.get("type").and_then(|t| t.as_str()) == Some("text"))
                        .then(|| block.get("text").and_then(|t| t.as_str()))
                        .flatten()
                })
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if content.is_empty() {
        return Err(Error::Provider {
            provider: "anthropic".into(),
            message: "response carried no text content".into(),
        });
    }

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_owned();

    let usage = body.get("usage").map(|u| {
        let prompt_tokens = u.get("input_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        let completion_tokens = u.get("output_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
        Usage {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    });

    Ok(CompletionResponse {
        content,
        model,
        usage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_text_blocks_and_usage() {
        let body = json!({
            "model": "claude-sonnet-4-20250514",
            "content": [
                {"type": "text", "text": "{\"reflect\":"},
                {"type": "text", "text": " \"ok\"}"}
            ],
            "usage": {"input_tokens": 120, "output_tokens": 30}
        });
        let response = parse_response(&body).unwrap();
        assert_eq!(response.content, "{\"reflect\": \"ok\"}");
        let usage = response.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 120);
        assert_eq!(usage.total_tokens, 150);
    }

    #[test]
    fn empty_content_is_a_provider_error() {
        let body = json!({"model": "m", "content": []});
        assert!(matches!(
            parse_response(&body),
            Err(Error::Provider { .. })
        ));
    }

    #[test]
    fn body_includes_system_and_json_instruction() {
        let oracle = AnthropicOracle::new("key", &LlmConfig::default(), 60)
            .unwrap()
            .with_base_url("http://unused");
        let body = oracle.build_body(&CompletionRequest {
            system: "you are an SRE agent".into(),
            prompt: "turn 1".into(),
            json_only: true,
            ..Default::default()
        });
        assert_eq!(body["system"], "you are an SRE agent");
        assert_eq!(body["max_tokens"], 4096);
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.starts_with("turn 1"));
        assert!(content.contains("single JSON object"));
    }

    #[test]
    fn config_overrides_flow_into_body() {
        let config = LlmConfig {
            model: Some("claude-opus-4-1".into()),
            temperature: Some(0.1),
            max_tokens: Some(2048),
            ..Default::default()
        };
        let oracle = AnthropicOracle::new("key", &config, 60).unwrap();
        let body = oracle.build_body(&CompletionRequest::default());
        assert_eq!(body["model"], "claude-opus-4-1");
        assert_eq!(body["temperature"], 0.1);
        assert_eq!(body["max_tokens"], 2048);
    }
}
