//! OpenAI-compatible chat-completions adapter (non-streaming). Also
//! serves any endpoint speaking the same wire format via `base_url`.

use serde_json::Value;

use oats_domain::config::LlmConfig;
use oats_domain::error::{Error, Result};

use crate::traits::{CompletionProvider, CompletionRequest, CompletionResponse, Usage};
use crate::util::{from_reqwest, status_error};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o";

/// An oracle adapter for OpenAI-compatible chat completion APIs.
pub struct OpenAiOracle {
    base_url: String,
    api_key: String,
    default_model: String,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    client: reqwest::Client,
}

impl OpenAiOracle {
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

    fn build_body(&self, req: &CompletionRequest) -> Value {
        let model = req
            .model
            .clone()
            .unwrap_or_else(|| self.default_model.clone());

        let mut messages = Vec::new();
        if !req.system.is_empty() {
            messages.push(serde_json::json!({"role": "system", "content": req.system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": req.prompt}));

        let mut body = serde_json::json!({
            "model": model,
            "messages": messages,
        });
        if req.json_only {
            body["response_format"] = serde_json::json!({"type": "json_object"});
        }
        if let Some(temperature) = req.temperature.or(self.temperature) {
            body["temperature"] = serde_json::json!(temperature);
        }
        if let Some(max_tokens) = req.max_tokens.or(self.max_tokens) {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[async_trait::async_trait]
impl CompletionProvider for OpenAiOracle {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&self.build_body(req))
            .send()
            .await
            .map_err(from_reqwest)?;

        let status = response.status();
        let body_text = response.text().await.map_err(from_reqwest)?;
        if !status.is_success() {
            return Err(status_error("openai", status, &body_text));
        }

        let body: Value = serde_json::from_str(&body_text)?;
        parse_response(&body)
    }

    fn provider_id(&self) -> &str {
        "openai"
    }
}

fn parse_response(body: &Value) -> Result<CompletionResponse> {
    let content = body
        .get("choices")
        .and_then(|v| v.as_array())
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .unwrap_or_default()
        .to_owned();

    if content.is_empty() {
        return Err(Error::Provider {
            provider: "openai".into(),
            message: "response carried no message content".into(),
        });
    }

    let model = body
        .get("model")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_owned();

    let usage = body.get("usage").map(|u| Usage {
        prompt_tokens: u.get("prompt_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
        completion_tokens: u
            .get("completion_tokens")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as u32,
        total_tokens: u.get("total_tokens").and_then(|v| v.as_u64()).unwrap_or(0) as u32,
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
    fn parses_choice_and_usage() {
        let body = json!({
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "{\"thought\": \"hi\"}"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });
        let response = parse_response(&body).unwrap();
        assert_eq!(response.content, "{\"thought\": \"hi\"}");
        assert_eq!(response.usage.unwrap().total_tokens, 15);
    }

    #[test]
    fn missing_choices_is_a_provider_error() {
        assert!(parse_response(&json!({"model": "m"})).is_err());
    }

    #[test]
    fn json_only_sets_response_format() {
        let oracle = OpenAiOracle::new("key", &LlmConfig::default(), 60).unwrap();
        let body = oracle.build_body(&CompletionRequest {
            system: "sys".into(),
            prompt: "p".into(),
            json_only: true,
            ..Default::default()
        });
        assert_eq!(body["response_format"]["type"], "json_object");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
    }
}
