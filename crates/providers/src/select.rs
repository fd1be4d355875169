//! Provider selection for the worker.
//!
//! `UFFLOW_LLM_PROVIDER` picks the adapter explicitly; otherwise
//! whichever API key is present wins (Anthropic first when both are).

use std::sync::Arc;

use oats_domain::config::{self, LlmConfig};
use oats_domain::error::{Error, Result};

use crate::anthropic::AnthropicOracle;
use crate::openai_compat::OpenAiOracle;
use crate::traits::CompletionProvider;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Anthropic,
    OpenAi,
}

/// Resolve which adapter to use from the explicit selector and the keys
/// actually present. Pure so it is testable without touching the
/// process environment.
pub fn choose_provider(
    selector: Option<&str>,
    has_anthropic_key: bool,
    has_openai_key: bool,
) -> Result<ProviderKind> {
    match selector {
        Some("anthropic") => {
            if !has_anthropic_key {
                return Err(Error::Config(format!(
                    "UFFLOW_LLM_PROVIDER=anthropic but {} is not set",
                    config::ENV_ANTHROPIC_KEY
                )));
            }
            Ok(ProviderKind::Anthropic)
        }
        Some("openai") => {
            if !has_openai_key {
                return Err(Error::Config(format!(
                    "UFFLOW_LLM_PROVIDER=openai but {} is not set",
                    config::ENV_OPENAI_KEY
                )));
            }
            Ok(ProviderKind::OpenAi)
        }
        Some(other) => Err(Error::Config(format!(
            "unknown UFFLOW_LLM_PROVIDER '{other}' (expected 'anthropic' or 'openai')"
        ))),
        None => {
            if has_anthropic_key {
                Ok(ProviderKind::Anthropic)
            } else if has_openai_key {
                Ok(ProviderKind::OpenAi)
            } else {
                Err(Error::Config(format!(
                    "no oracle credentials: set {} or {}",
                    config::ENV_ANTHROPIC_KEY,
                    config::ENV_OPENAI_KEY
                )))
            }
        }
    }
}

/// Build the oracle from the worker's environment.
pub fn provider_from_env(timeout_secs: u64) -> Result<Arc<dyn CompletionProvider>> {
    let llm = LlmConfig::from_env();
    let anthropic_key = non_empty_env(config::ENV_ANTHROPIC_KEY);
    let openai_key = non_empty_env(config::ENV_OPENAI_KEY);

    let kind = choose_provider(
        llm.provider.as_deref(),
        anthropic_key.is_some(),
        openai_key.is_some(),
    )?;

    let provider: Arc<dyn CompletionProvider> = match kind {
        ProviderKind::Anthropic => Arc::new(AnthropicOracle::new(
            anthropic_key.unwrap_or_default(),
            &llm,
            timeout_secs,
        )?),
        ProviderKind::OpenAi => Arc::new(OpenAiOracle::new(
            openai_key.unwrap_or_default(),
            &llm,
            timeout_secs,
        )?),
    };
    tracing::info!(provider = provider.provider_id(), "oracle adapter ready");
    Ok(provider)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
