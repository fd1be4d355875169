//! In-worker agent state: the task plan, accumulated knowledge, and the
//! turn transcript.
//!
//! This state lives only inside one worker process and is never persisted
//! across workers. The engine serializes it into every prompt and merges
//! the oracle's proposed revisions back in under the invariants enforced
//! here and in the engine's merge step.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Task archetypes and phases
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Classification of the active task. Advisory: surfaced in the prompt,
/// validated for membership only, never enforced as a workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Archetype {
    Investigate,
    Create,
    Modify,
    Provision,
    Unorthodox,
}

impl Archetype {
    /// Canonical phase progression for this archetype. `Unorthodox` has
    /// no canonical progression and accepts any phase label.
    pub fn phases(self) -> &'static [&'static str] {
        match self {
            Archetype::Investigate => &["Gather", "Hypothesize", "Test", "Isolate", "Conclude"],
            Archetype::Create => &["Requirements", "Draft", "Validate", "Refine", "Done"],
            Archetype::Modify => &["Understand", "Backup", "Implement", "Verify", "Done"],
            Archetype::Provision => &["Check", "Install", "Verify"],
            Archetype::Unorthodox => &[],
        }
    }

    /// Whether `phase` is a valid label for this archetype.
    pub fn accepts_phase(self, phase: &str) -> bool {
        let phases = self.phases();
        phases.is_empty() || phases.contains(&phase)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tasks
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Done,
    Blocked,
}

/// One sub-task in the agent's plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub description: String,
    pub status: TaskStatus,
}

/// Metadata for the task currently being worked.
///
/// `turns_on_task` is engine-controlled: incremented while the same task
/// id stays active, reset when the active task changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveTask {
    pub id: String,
    pub archetype: Archetype,
    pub phase: String,
    #[serde(default)]
    pub turns_on_task: u32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Transcript
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One completed turn. Prior entries are immutable; the transcript length
/// always equals the current turn count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_index: u32,
    pub thought: String,
    pub action: String,
    pub observation: String,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// AgentState
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The full mutable state of one investigation agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentState {
    /// Immutable: set at construction.
    pub goal: String,
    pub tasks: Vec<TaskRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<ActiveTask>,
    /// Append-only observed truths, deduplicated by textual identity.
    pub facts: Vec<String>,
    /// Append-only invalidated hypotheses.
    pub ruled_out: Vec<String>,
    /// Open questions; may shrink as they are resolved.
    pub unknowns: Vec<String>,
    pub transcript: Vec<TurnRecord>,
    pub turn_count: u32,
    pub is_complete: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_result: Option<String>,
}

impl AgentState {
    pub fn new(goal: impl Into<String>) -> Self {
        Self {
            goal: goal.into(),
            tasks: Vec::new(),
            active: None,
            facts: Vec::new(),
            ruled_out: Vec::new(),
            unknowns: Vec::new(),
            transcript: Vec::new(),
            turn_count: 0,
            is_complete: false,
            final_result: None,
        }
    }

    /// Append a fact if not already present. Returns true if added.
    pub fn add_fact(&mut self, fact: impl Into<String>) -> bool {
        let fact = fact.into();
        if self.facts.iter().any(|f| *f == fact) {
            return false;
        }
        self.facts.push(fact);
        true
    }

    /// Append a ruled-out hypothesis if not already present.
    pub fn add_ruled_out(&mut self, hypothesis: impl Into<String>) -> bool {
        let hypothesis = hypothesis.into();
        if self.ruled_out.iter().any(|h| *h == hypothesis) {
            return false;
        }
        self.ruled_out.push(hypothesis);
        true
    }

    /// Number of tasks currently marked active.
    pub fn active_task_count(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == TaskStatus::Active)
            .count()
    }

    /// True when every task in the plan is done.
    pub fn all_tasks_done(&self) -> bool {
        !self.tasks.is_empty() && self.tasks.iter().all(|t| t.status == TaskStatus::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetype_phase_membership() {
        assert!(Archetype::Investigate.accepts_phase("Gather"));
        assert!(Archetype::Investigate.accepts_phase("Conclude"));
        assert!(!Archetype::Investigate.accepts_phase("Install"));
        assert!(Archetype::Provision.accepts_phase("Install"));
        // Unorthodox has no canonical progression.
        assert!(Archetype::Unorthodox.accepts_phase("Improvise"));
    }

    #[test]
    fn archetype_names_roundtrip() {
        for archetype in [
            Archetype::Investigate,
            Archetype::Create,
            Archetype::Modify,
            Archetype::Provision,
            Archetype::Unorthodox,
        ] {
            let json = serde_json::to_string(&archetype).unwrap();
            let back: Archetype = serde_json::from_str(&json).unwrap();
            assert_eq!(archetype, back);
        }
    }

    #[test]
    fn facts_dedup_by_textual_identity() {
        let mut state = AgentState::new("g");
        assert!(state.add_fact("pod oom-killed"));
        assert!(!state.add_fact("pod oom-killed"));
        assert!(state.add_fact("node under disk pressure"));
        assert_eq!(state.facts.len(), 2);
    }

    #[test]
    fn active_task_counting() {
        let mut state = AgentState::new("g");
        state.tasks.push(TaskRecord {
            id: "t1".into(),
            description: "check logs".into(),
            status: TaskStatus::Active,
        });
        state.tasks.push(TaskRecord {
            id: "t2".into(),
            description: "check metrics".into(),
            status: TaskStatus::Blocked,
        });
        assert_eq!(state.active_task_count(), 1);
        assert!(!state.all_tasks_done());

        for task in &mut state.tasks {
            task.status = TaskStatus::Done;
        }
        assert!(state.all_tasks_done());
    }

    #[test]
    fn empty_plan_is_not_all_done() {
        let state = AgentState::new("g");
        assert!(!state.all_tasks_done());
    }
}
