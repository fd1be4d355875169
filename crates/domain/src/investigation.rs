//! Investigation identity and lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default number of agent turns when the request does not specify one.
pub const DEFAULT_TURN_BUDGET: u32 = 15;

/// Lifecycle of an investigation. Terminal states are immutable: the
/// store refuses any further transition once one is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvestigationState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    TimedOut,
}

impl InvestigationState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }
}

/// One investigation as tracked by the control plane.
///
/// The worker handle is the derived `job_name`; the orchestrator owns the
/// job itself and reclaims it via its terminal-state TTL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Investigation {
    pub id: String,
    pub goal: String,
    pub turn_budget: u32,
    pub namespace: String,
    pub job_name: String,
    pub state: InvestigationState,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminal_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Investigation {
    /// Allocate a new investigation with a server-generated id and the
    /// derived orchestrator job name `investigation-<short-id>`.
    pub fn new(goal: impl Into<String>, namespace: impl Into<String>, turn_budget: u32) -> Self {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let job_name = format!("investigation-{}", &id[..8]);
        Self {
            id,
            goal: goal.into(),
            turn_budget,
            namespace: namespace.into(),
            job_name,
            state: InvestigationState::Pending,
            created_at: Utc::now(),
            terminal_at: None,
            error: None,
        }
    }

    /// Move to a terminal state, stamping `terminal_at`. No-op if already
    /// terminal.
    pub fn finish(&mut self, state: InvestigationState) {
        debug_assert!(state.is_terminal());
        if self.state.is_terminal() {
            return;
        }
        self.state = state;
        self.terminal_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_classification() {
        assert!(!InvestigationState::Pending.is_terminal());
        assert!(!InvestigationState::Running.is_terminal());
        assert!(InvestigationState::Succeeded.is_terminal());
        assert!(InvestigationState::Failed.is_terminal());
        assert!(InvestigationState::Cancelled.is_terminal());
        assert!(InvestigationState::TimedOut.is_terminal());
    }

    #[test]
    fn state_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&InvestigationState::TimedOut).unwrap(),
            "\"timed_out\""
        );
    }

    #[test]
    fn new_derives_job_name_from_id() {
        let inv = Investigation::new("why is the api slow", "default", 15);
        assert_eq!(inv.state, InvestigationState::Pending);
        assert_eq!(inv.job_name, format!("investigation-{}", &inv.id[..8]));
        assert!(inv.terminal_at.is_none());
    }

    #[test]
    fn ids_are_unique() {
        let a = Investigation::new("g", "default", 1);
        let b = Investigation::new("g", "default", 1);
        assert_ne!(a.id, b.id);
        assert_ne!(a.job_name, b.job_name);
    }

    #[test]
    fn finish_is_immutable_once_terminal() {
        let mut inv = Investigation::new("g", "default", 15);
        inv.finish(InvestigationState::Cancelled);
        let stamped = inv.terminal_at;
        inv.finish(InvestigationState::Failed);
        assert_eq!(inv.state, InvestigationState::Cancelled);
        assert_eq!(inv.terminal_at, stamped);
    }
}
