//! State merge: fold the oracle's proposed state revision into the
//! authoritative [`AgentState`].
//!
//! Rules: `facts` and `ruled_out` are unioned (never lost), `unknowns`
//! is replaced, `tasks` is replaced with the at-most-one-active invariant
//! enforced, and `turns_on_task` stays engine-controlled.

use oats_domain::agent::{ActiveTask, AgentState, Archetype, TaskStatus};

use crate::parse::ProposedState;

/// What changed during a merge, plus any invariant violations that were
/// repaired (surfaced to the client as `status` events).
#[derive(Debug, Default)]
pub struct MergeReport {
    pub new_facts: usize,
    pub new_ruled_out: usize,
    pub warnings: Vec<String>,
}

impl MergeReport {
    /// Whether the turn produced new knowledge. Used by stuck detection.
    pub fn has_delta(&self) -> bool {
        self.new_facts > 0 || self.new_ruled_out > 0
    }
}

/// Apply the proposed revision to `state`.
pub fn merge_proposed(state: &mut AgentState, proposed: ProposedState) -> MergeReport {
    let mut report = MergeReport::default();

    // facts / ruled_out: union, textual dedup. A proposal that omits
    // existing entries cannot shrink either set.
    if let Some(facts) = proposed.facts {
        for fact in facts {
            if state.add_fact(fact) {
                report.new_facts += 1;
            }
        }
    }
    if let Some(ruled_out) = proposed.ruled_out {
        for hypothesis in ruled_out {
            if state.add_ruled_out(hypothesis) {
                report.new_ruled_out += 1;
            }
        }
    }

    // unknowns: replaced wholesale (open questions may be resolved).
    if let Some(unknowns) = proposed.unknowns {
        state.unknowns = unknowns;
    }

    // tasks: replaced, then repaired to at most one active.
    if let Some(mut tasks) = proposed.tasks {
        let mut seen_active = false;
        let mut demoted = 0usize;
        for task in &mut tasks {
            if task.status == TaskStatus::Active {
                if seen_active {
                    task.status = TaskStatus::Blocked;
                    demoted += 1;
                } else {
                    seen_active = true;
                }
            }
        }
        if demoted > 0 {
            report.warnings.push(format!(
                "task plan proposed {} active tasks; demoted {demoted} to blocked",
                demoted + 1
            ));
        }
        state.tasks = tasks;
    }

    // active-task metadata: validate archetype/phase membership, keep
    // turns_on_task under engine control.
    if let Some(proposed_active) = proposed.active {
        let previous = state.active.take();
        let same_task = previous
            .as_ref()
            .is_some_and(|p| p.id == proposed_active.id);

        let archetype = match proposed_active
            .archetype
            .as_deref()
            .map(parse_archetype)
        {
            Some(Some(archetype)) => archetype,
            Some(None) => {
                let fallback = previous
                    .as_ref()
                    .map(|p| p.archetype)
                    .unwrap_or(Archetype::Investigate);
                report.warnings.push(format!(
                    "unknown archetype '{}'; keeping {fallback:?}",
                    proposed_active.archetype.as_deref().unwrap_or("")
                ));
                fallback
            }
            None => previous
                .as_ref()
                .map(|p| p.archetype)
                .unwrap_or(Archetype::Investigate),
        };

        let phase = proposed_active.phase.unwrap_or_default();
        if !phase.is_empty() && !archetype.accepts_phase(&phase) {
            report.warnings.push(format!(
                "phase '{phase}' is not in the {archetype:?} progression"
            ));
        }

        state.active = Some(ActiveTask {
            id: proposed_active.id,
            archetype,
            phase,
            turns_on_task: if same_task {
                previous.map(|p| p.turns_on_task).unwrap_or(0)
            } else {
                0
            },
        });
    }

    report
}

fn parse_archetype(raw: &str) -> Option<Archetype> {
    match raw {
        "Investigate" => Some(Archetype::Investigate),
        "Create" => Some(Archetype::Create),
        "Modify" => Some(Archetype::Modify),
        "Provision" => Some(Archetype::Provision),
        "Unorthodox" => Some(Archetype::Unorthodox),
        _ => None,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::ProposedActive;
    use oats_domain::agent::TaskRecord;

    fn task(id: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord {
            id: id.into(),
            description: format!("task {id}"),
            status,
        }
    }

    #[test]
    fn facts_are_unioned_never_lost() {
        let mut state = AgentState::new("g");
        state.add_fact("fact one");
        state.add_fact("fact two");

        // The oracle echoes a regressed set missing "fact two".
        let report = merge_proposed(
            &mut state,
            ProposedState {
                facts: Some(vec!["fact one".into(), "fact three".into()]),
                ..Default::default()
            },
        );

        assert_eq!(report.new_facts, 1);
        assert_eq!(
            state.facts,
            vec!["fact one", "fact two", "fact three"]
        );
    }

    #[test]
    fn unknowns_are_replaced() {
        let mut state = AgentState::new("g");
        state.unknowns = vec!["q1".into(), "q2".into()];

        merge_proposed(
            &mut state,
            ProposedState {
                unknowns: Some(vec!["q2".into()]),
                ..Default::default()
            },
        );
        assert_eq!(state.unknowns, vec!["q2"]);
    }

    #[test]
    fn extra_active_tasks_are_demoted_with_warning() {
        let mut state = AgentState::new("g");
        let report = merge_proposed(
            &mut state,
            ProposedState {
                tasks: Some(vec![
                    task("t1", TaskStatus::Active),
                    task("t2", TaskStatus::Active),
                    task("t3", TaskStatus::Done),
                ]),
                ..Default::default()
            },
        );

        assert_eq!(state.active_task_count(), 1);
        assert_eq!(state.tasks[1].status, TaskStatus::Blocked);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("demoted"));
    }

    #[test]
    fn turns_on_task_survives_same_id_resets_on_change() {
        let mut state = AgentState::new("g");
        state.active = Some(ActiveTask {
            id: "t1".into(),
            archetype: Archetype::Investigate,
            phase: "Gather".into(),
            turns_on_task: 4,
        });

        merge_proposed(
            &mut state,
            ProposedState {
                active: Some(ProposedActive {
                    id: "t1".into(),
                    archetype: Some("Investigate".into()),
                    phase: Some("Test".into()),
                }),
                ..Default::default()
            },
        );
        assert_eq!(state.active.as_ref().unwrap().turns_on_task, 4);

        merge_proposed(
            &mut state,
            ProposedState {
                active: Some(ProposedActive {
                    id: "t2".into(),
                    archetype: Some("Provision".into()),
                    phase: Some("Check".into()),
                }),
                ..Default::default()
            },
        );
        let active = state.active.as_ref().unwrap();
        assert_eq!(active.turns_on_task, 0);
        assert_eq!(active.archetype, Archetype::Provision);
    }

    #[test]
    fn unknown_archetype_keeps_previous_and_warns() {
        let mut state = AgentState::new("g");
        state.active = Some(ActiveTask {
            id: "t1".into(),
            archetype: Archetype::Modify,
            phase: "Implement".into(),
            turns_on_task: 1,
        });

        let report = merge_proposed(
            &mut state,
            ProposedState {
                active: Some(ProposedActive {
                    id: "t1".into(),
                    archetype: Some("Sideways".into()),
                    phase: Some("Implement".into()),
                }),
                ..Default::default()
            },
        );
        assert_eq!(state.active.as_ref().unwrap().archetype, Archetype::Modify);
        assert!(report.warnings.iter().any(|w| w.contains("Sideways")));
    }

    #[test]
    fn off_progression_phase_warns_but_is_kept() {
        let mut state = AgentState::new("g");
        let report = merge_proposed(
            &mut state,
            ProposedState {
                active: Some(ProposedActive {
                    id: "t1".into(),
                    archetype: Some("Provision".into()),
                    phase: Some("Hypothesize".into()),
                }),
                ..Default::default()
            },
        );
        assert_eq!(state.active.as_ref().unwrap().phase, "Hypothesize");
        assert!(report.warnings.iter().any(|w| w.contains("Hypothesize")));
    }

    #[test]
    fn delta_reporting() {
        let mut state = AgentState::new("g");
        let report = merge_proposed(
            &mut state,
            ProposedState {
                facts: Some(vec!["f".into()]),
                ..Default::default()
            },
        );
        assert!(report.has_delta());

        let report = merge_proposed(
            &mut state,
            ProposedState {
                facts: Some(vec!["f".into()]),
                ..Default::default()
            },
        );
        assert!(!report.has_delta());
    }
}
