//! Worker environment contract.
//!
//! Everything a worker knows arrives through environment variables set
//! on its job. `OATS_GOAL` is the only hard requirement; oracle
//! credentials are checked later by provider selection.

use std::path::PathBuf;

use oats_domain::config::{self, LlmConfig};
use oats_domain::error::{Error, Result};
use oats_domain::investigation::DEFAULT_TURN_BUDGET;

const DEFAULT_TOOLS_DIR: &str = "/opt/oats/tools";
const DEFAULT_RESULTS_DIR: &str = "./results";

#[derive(Debug)]
pub struct WorkerEnv {
    pub goal: String,
    pub max_turns: u32,
    pub tools_dir: PathBuf,
    /// Whether `UFFLOW_TOOLS_DIR` was set explicitly. A missing explicit
    /// directory is fatal; a missing default is just skipped discovery.
    pub tools_dir_explicit: bool,
    pub results_dir: PathBuf,
    pub llm: LlmConfig,
}

impl WorkerEnv {
    /// Read the contract from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
    }

    /// Lookup-injectable variant for tests.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let goal = lookup(config::ENV_GOAL)
            .ok_or_else(|| Error::Config(format!("{} is required", config::ENV_GOAL)))?;

        let max_turns = match lookup(config::ENV_MAX_TURNS) {
            Some(raw) => raw.parse().map_err(|_| {
                Error::Config(format!(
                    "{} must be a positive integer, got '{raw}'",
                    config::ENV_MAX_TURNS
                ))
            })?,
            None => DEFAULT_TURN_BUDGET,
        };
        if max_turns == 0 {
            return Err(Error::Config(format!(
                "{} must be at least 1",
                config::ENV_MAX_TURNS
            )));
        }

        let explicit_tools_dir = lookup(config::ENV_TOOLS_DIR);
        let tools_dir_explicit = explicit_tools_dir.is_some();
        let tools_dir =
            PathBuf::from(explicit_tools_dir.unwrap_or_else(|| DEFAULT_TOOLS_DIR.into()));

        let results_dir = PathBuf::from(
            lookup(config::ENV_RESULTS_DIR).unwrap_or_else(|| DEFAULT_RESULTS_DIR.into()),
        );

        let llm = LlmConfig {
            provider: lookup(config::ENV_LLM_PROVIDER),
            model: lookup(config::ENV_LLM_MODEL),
            temperature: lookup(config::ENV_TEMPERATURE).and_then(|v| v.parse().ok()),
            max_tokens: lookup(config::ENV_MAX_TOKENS).and_then(|v| v.parse().ok()),
            prompt_version: lookup(config::ENV_PROMPT_VERSION),
        };

        Ok(Self {
            goal,
            max_turns,
            tools_dir,
            tools_dir_explicit,
            results_dir,
            llm,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from<'a>(vars: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        let map: HashMap<&str, &str> = vars.iter().copied().collect();
        move |key| map.get(key).map(|v| v.to_string())
    }

    #[test]
    fn goal_is_required() {
        let err = WorkerEnv::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(err.to_string().contains("OATS_GOAL"));
    }

    #[test]
    fn defaults_apply() {
        let env =
            WorkerEnv::from_lookup(lookup_from(&[("OATS_GOAL", "find the leak")])).unwrap();
        assert_eq!(env.goal, "find the leak");
        assert_eq!(env.max_turns, 15);
        assert!(!env.tools_dir_explicit);
        assert_eq!(env.results_dir, PathBuf::from("./results"));
        assert!(env.llm.provider.is_none());
    }

    #[test]
    fn explicit_values_parse() {
        let env = WorkerEnv::from_lookup(lookup_from(&[
            ("OATS_GOAL", "g"),
            ("OATS_MAX_TURNS", "7"),
            ("UFFLOW_TOOLS_DIR", "/srv/tools"),
            ("UFFLOW_RESULTS_DIR", "/srv/results"),
            ("UFFLOW_LLM_PROVIDER", "openai"),
            ("UFFLOW_TEMPERATURE", "0.3"),
            ("UFFLOW_MAX_TOKENS", "2048"),
            ("UFFLOW_PROMPT_VERSION", "v1"),
        ]))
        .unwrap();
        assert_eq!(env.max_turns, 7);
        assert!(env.tools_dir_explicit);
        assert_eq!(env.tools_dir, PathBuf::from("/srv/tools"));
        assert_eq!(env.llm.provider.as_deref(), Some("openai"));
        assert_eq!(env.llm.temperature, Some(0.3));
        assert_eq!(env.llm.max_tokens, Some(2048));
        assert_eq!(env.llm.prompt_version.as_deref(), Some("v1"));
    }

    #[test]
    fn bad_turn_budget_is_rejected() {
        let err = WorkerEnv::from_lookup(lookup_from(&[
            ("OATS_GOAL", "g"),
            ("OATS_MAX_TURNS", "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("OATS_MAX_TURNS"));

        let err = WorkerEnv::from_lookup(lookup_from(&[
            ("OATS_GOAL", "g"),
            ("OATS_MAX_TURNS", "0"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }
}
