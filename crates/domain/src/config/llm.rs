use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Worker environment variable names
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const ENV_GOAL: &str = "OATS_GOAL";
pub const ENV_MAX_TURNS: &str = "OATS_MAX_TURNS";
pub const ENV_ANTHROPIC_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_LLM_PROVIDER: &str = "UFFLOW_LLM_PROVIDER";
pub const ENV_LLM_MODEL: &str = "UFFLOW_LLM_MODEL";
pub const ENV_TEMPERATURE: &str = "UFFLOW_TEMPERATURE";
pub const ENV_MAX_TOKENS: &str = "UFFLOW_MAX_TOKENS";
pub const ENV_PROMPT_VERSION: &str = "UFFLOW_PROMPT_VERSION";
pub const ENV_LOG_LEVEL: &str = "UFFLOW_LOG_LEVEL";
pub const ENV_TOOLS_DIR: &str = "UFFLOW_TOOLS_DIR";
pub const ENV_RESULTS_DIR: &str = "UFFLOW_RESULTS_DIR";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Oracle settings the control plane forwards into every worker job as
/// `UFFLOW_*` environment variables, and the worker reads back with
/// [`LlmConfig::from_env`]. Unset fields fall through to the provider
/// adapter's defaults.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LlmConfig {
    /// Provider selector: "anthropic" or "openai". When unset, the worker
    /// picks whichever API key is present in its environment.
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Selects the system-preamble revision the engine composes with.
    #[serde(default)]
    pub prompt_version: Option<String>,
}

impl LlmConfig {
    /// The `UFFLOW_*` env pairs to set on a worker job. Only set fields
    /// are emitted.
    pub fn to_env(&self) -> Vec<(String, String)> {
        let mut env = Vec::new();
        if let Some(ref provider) = self.provider {
            env.push((ENV_LLM_PROVIDER.to_owned(), provider.clone()));
        }
        if let Some(ref model) = self.model {
            env.push((ENV_LLM_MODEL.to_owned(), model.clone()));
        }
        if let Some(temperature) = self.temperature {
            env.push((ENV_TEMPERATURE.to_owned(), temperature.to_string()));
        }
        if let Some(max_tokens) = self.max_tokens {
            env.push((ENV_MAX_TOKENS.to_owned(), max_tokens.to_string()));
        }
        if let Some(ref version) = self.prompt_version {
            env.push((ENV_PROMPT_VERSION.to_owned(), version.clone()));
        }
        env
    }

    /// Read the `UFFLOW_*` variables from the process environment.
    /// Unparseable numeric values are ignored (adapter defaults apply).
    pub fn from_env() -> Self {
        Self {
            provider: std::env::var(ENV_LLM_PROVIDER).ok().filter(|v| !v.is_empty()),
            model: std::env::var(ENV_LLM_MODEL).ok().filter(|v| !v.is_empty()),
            temperature: std::env::var(ENV_TEMPERATURE)
                .ok()
                .and_then(|v| v.parse().ok()),
            max_tokens: std::env::var(ENV_MAX_TOKENS)
                .ok()
                .and_then(|v| v.parse().ok()),
            prompt_version: std::env::var(ENV_PROMPT_VERSION)
                .ok()
                .filter(|v| !v.is_empty()),
        }
    }
}
