mod engine;
mod llm;
mod orchestrator;
mod server;
mod tools;

pub use engine::*;
pub use llm::*;
pub use orchestrator::*;
pub use server::*;
pub use tools::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Control-plane configuration, loaded from `config.toml`.
///
/// The worker reads its own configuration from environment variables set
/// on its job (see [`LlmConfig::to_env`] and the worker entrypoint), not
/// from this file.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    /// LLM settings forwarded to workers as `UFFLOW_*` env vars.
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub investigations: InvestigationsConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Investigation store settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationsConfig {
    /// Seconds a terminal investigation stays in the in-memory store
    /// before the periodic sweep evicts it. Replay beyond this window
    /// depends on the orchestrator's log retention.
    #[serde(default = "d_3600")]
    pub evict_after_secs: u64,
    /// Maximum accepted turn budget on `POST /investigate`.
    #[serde(default = "d_100")]
    pub max_turn_budget: u32,
}

impl Default for InvestigationsConfig {
    fn default() -> Self {
        Self {
            evict_after_secs: 3600,
            max_turn_budget: 100,
        }
    }
}

fn d_3600() -> u64 {
    3600
}
fn d_100() -> u32 {
    100
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the loaded configuration, returning every issue found.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.server.port == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "server.port".into(),
                message: "port must be non-zero".into(),
            });
        }
        if self.orchestrator.namespace.is_empty() {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "orchestrator.namespace".into(),
                message: "namespace must not be empty".into(),
            });
        }
        if self.orchestrator.hard_deadline_secs == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "orchestrator.hard_deadline_secs".into(),
                message: "hard deadline must be non-zero".into(),
            });
        }
        if self.orchestrator.job_ttl_secs < 60 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Warning,
                field: "orchestrator.job_ttl_secs".into(),
                message: "short job TTLs cut off log replay for detached clients".into(),
            });
        }
        if self.investigations.max_turn_budget == 0 {
            issues.push(ConfigIssue {
                severity: ConfigSeverity::Error,
                field: "investigations.max_turn_budget".into(),
                message: "maximum turn budget must be at least 1".into(),
            });
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let issues = Config::default().validate();
        assert!(
            issues.iter().all(|i| i.severity != ConfigSeverity::Error),
            "default config must have no errors: {issues:?}"
        );
    }

    #[test]
    fn zero_port_is_an_error() {
        let mut config = Config::default();
        config.server.port = 0;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Error && i.field == "server.port"));
    }

    #[test]
    fn short_ttl_is_a_warning() {
        let mut config = Config::default();
        config.orchestrator.job_ttl_secs = 10;
        let issues = config.validate();
        assert!(issues
            .iter()
            .any(|i| i.severity == ConfigSeverity::Warning
                && i.field == "orchestrator.job_ttl_secs"));
    }
}
