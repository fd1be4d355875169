//! Investigation creation: allocate identity, materialize the worker
//! job, and hand off to the lifecycle watcher.

use oats_domain::config::{self, Config};
use oats_domain::investigation::{Investigation, InvestigationState, DEFAULT_TURN_BUDGET};
use oats_orch::JobSpec;

use crate::runtime::watcher;
use crate::state::AppState;

/// A validated creation request.
#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub goal: String,
    pub namespace: Option<String>,
    pub turn_budget: Option<u32>,
}

/// Why creation did not happen.
#[derive(Debug)]
pub enum CreateError {
    /// The request itself was malformed (HTTP 400).
    Invalid(String),
    /// The orchestrator rejected the job (HTTP 503).
    Rejected(String),
}

/// Create an investigation: allocate id and job name, ask the
/// orchestrator for an ephemeral worker job, transition to `Running`,
/// and spawn the lifecycle watcher.
pub async fn create_investigation(
    state: &AppState,
    request: CreateRequest,
) -> Result<Investigation, CreateError> {
    let goal = request.goal.trim().to_owned();
    if goal.is_empty() {
        return Err(CreateError::Invalid("goal must not be empty".into()));
    }
    let turn_budget = request.turn_budget.unwrap_or(DEFAULT_TURN_BUDGET);
    let max_budget = state.config.investigations.max_turn_budget;
    if turn_budget == 0 || turn_budget > max_budget {
        return Err(CreateError::Invalid(format!(
            "turn_budget must be between 1 and {max_budget}"
        )));
    }

    let namespace = request
        .namespace
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| state.config.orchestrator.namespace.clone());

    let investigation = Investigation::new(goal, namespace, turn_budget);
    state.investigations.insert(investigation.clone());

    let spec = JobSpec {
        name: investigation.job_name.clone(),
        namespace: investigation.namespace.clone(),
        image: state.config.orchestrator.worker_image.clone(),
        env: worker_env(&state.config, &investigation),
        credentials_secret: state.config.orchestrator.credentials_secret.clone(),
        restart_on_failure: false,
        ttl_after_finished_secs: state.config.orchestrator.job_ttl_secs,
    };

    match state.orchestrator.create_job(spec).await {
        Ok(()) => {
            state
                .investigations
                .transition(&investigation.id, InvestigationState::Running);
            watcher::spawn_watcher(state.clone(), investigation.clone());
            // Return the record as the client will see it.
            Ok(state
                .investigations
                .get(&investigation.id)
                .unwrap_or(investigation))
        }
        Err(e) => {
            let detail = e.to_string();
            state.investigations.update(&investigation.id, |inv| {
                inv.error = Some(detail.clone());
            });
            state
                .investigations
                .transition(&investigation.id, InvestigationState::Failed);
            tracing::warn!(id = %investigation.id, error = %detail, "orchestrator rejected job");
            Err(CreateError::Rejected(detail))
        }
    }
}

/// Environment for the worker job. Oracle credentials come from the
/// orchestrator-managed secret in cluster deployments; the process
/// backend forwards the plane's own keys when present.
fn worker_env(config: &Config, investigation: &Investigation) -> Vec<(String, String)> {
    let mut env = vec![
        (config::ENV_GOAL.to_owned(), investigation.goal.clone()),
        (
            config::ENV_MAX_TURNS.to_owned(),
            investigation.turn_budget.to_string(),
        ),
    ];
    env.extend(config.llm.to_env());
    for key in [config::ENV_ANTHROPIC_KEY, config::ENV_OPENAI_KEY] {
        if let Ok(value) = std::env::var(key) {
            if !value.is_empty() {
                env.push((key.to_owned(), value));
            }
        }
    }
    env
}

/// The orchestrator-specific follow command returned to clients.
pub fn log_stream_hint(investigation: &Investigation) -> String {
    format!(
        "kubectl logs -f job/{} -n {}",
        investigation.job_name, investigation.namespace
    )
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_env_carries_goal_budget_and_llm_settings() {
        let mut config = Config::default();
        config.llm.provider = Some("anthropic".into());
        config.llm.model = Some("claude-sonnet-4-20250514".into());

        let investigation = Investigation::new("find the leak", "default", 7);
        let env = worker_env(&config, &investigation);

        assert!(env.contains(&("OATS_GOAL".into(), "find the leak".into())));
        assert!(env.contains(&("OATS_MAX_TURNS".into(), "7".into())));
        assert!(env.contains(&("UFFLOW_LLM_PROVIDER".into(), "anthropic".into())));
        assert!(env
            .iter()
            .any(|(k, v)| k == "UFFLOW_LLM_MODEL" && v.contains("claude")));
    }

    #[test]
    fn hint_names_the_job_and_namespace() {
        let investigation = Investigation::new("g", "sre-investigations", 15);
        let hint = log_stream_hint(&investigation);
        assert!(hint.contains(&investigation.job_name));
        assert!(hint.contains("-n sre-investigations"));
    }
}
