//! Lifecycle watcher: one task per investigation.
//!
//! Follows the worker's log stream (to observe the finish event), polls
//! the job's terminal status, enforces the wall-clock hard deadline, and
//! drives the investigation record to its terminal state. Client-facing
//! streaming happens elsewhere; this task only needs the events'
//! shape-validated types.

use std::time::Duration;

use futures_util::StreamExt;

use oats_domain::event::Event;
use oats_domain::investigation::{Investigation, InvestigationState};
use oats_orch::JobStatus;

use crate::state::AppState;

const STATUS_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn spawn_watcher(state: AppState, investigation: Investigation) {
    tokio::spawn(async move {
        watch(state, investigation).await;
    });
}

pub(crate) async fn watch(state: AppState, investigation: Investigation) {
    let deadline = tokio::time::Instant::now()
        + Duration::from_secs(state.config.orchestrator.hard_deadline_secs);
    let mut saw_finish = false;

    let stream = match state
        .orchestrator
        .follow_logs(&investigation.job_name)
        .await
    {
        Ok(stream) => Some(stream),
        Err(e) => {
            tracing::warn!(id = %investigation.id, error = %e, "could not follow worker logs");
            None
        }
    };

    if let Some(mut stream) = stream {
        loop {
            tokio::select! {
                line = stream.next() => match line {
                    Some(Ok(line)) => {
                        if let Some(event) = Event::parse_line(&line) {
                            if matches!(event, Event::Finish { .. }) {
                                saw_finish = true;
                            }
                        }
                    }
                    Some(Err(e)) => {
                        tracing::warn!(id = %investigation.id, error = %e, "log follow error");
                    }
                    // Stream end: the worker reached a terminal state.
                    None => break,
                },
                _ = tokio::time::sleep_until(deadline) => {
                    tracing::warn!(id = %investigation.id, "hard deadline exceeded");
                    let _ = state.orchestrator.delete_job(&investigation.job_name).await;
                    state
                        .investigations
                        .transition(&investigation.id, InvestigationState::TimedOut);
                    return;
                }
            }
        }
    }

    let status = wait_for_terminal_status(&state, &investigation.job_name, deadline).await;
    let terminal = match status {
        JobStatus::Succeeded if saw_finish => InvestigationState::Succeeded,
        JobStatus::Succeeded => {
            state.investigations.update(&investigation.id, |inv| {
                inv.error
                    .get_or_insert_with(|| "worker exited 0 without a finish event".into());
            });
            InvestigationState::Failed
        }
        JobStatus::Failed { exit_code } => {
            state.investigations.update(&investigation.id, |inv| {
                inv.error
                    .get_or_insert_with(|| format!("worker exited {exit_code}"));
            });
            InvestigationState::Failed
        }
        // Job vanished: deleted (cancellation already holds the terminal
        // state) or reclaimed out from under us.
        _ => InvestigationState::Failed,
    };

    // No-op when cancellation or timeout got there first.
    state.investigations.transition(&investigation.id, terminal);
}

async fn wait_for_terminal_status(
    state: &AppState,
    job_name: &str,
    deadline: tokio::time::Instant,
) -> JobStatus {
    loop {
        match state.orchestrator.job_status(job_name).await {
            Ok(status) if status.is_terminal() || status == JobStatus::NotFound => {
                return status;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(job = %job_name, error = %e, "job status poll failed");
                return JobStatus::NotFound;
            }
        }
        if tokio::time::Instant::now() >= deadline {
            return JobStatus::NotFound;
        }
        tokio::time::sleep(STATUS_POLL_INTERVAL).await;
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use oats_domain::config::Config;
    use oats_orch::ProcessOrchestrator;

    use crate::runtime::investigations::InvestigationStore;
    use crate::runtime::launcher::{create_investigation, CreateRequest};

    const FINISH_LINE: &str =
        r#"printf '%s\n' '{"type":"finish","result":"disk full","turns_used":2}'"#;

    fn app_state(worker_command: &str, config: Config) -> AppState {
        AppState {
            config: Arc::new(config),
            orchestrator: Arc::new(ProcessOrchestrator::new(worker_command)),
            investigations: Arc::new(InvestigationStore::new()),
        }
    }

    fn request(goal: &str) -> CreateRequest {
        CreateRequest {
            goal: goal.into(),
            namespace: None,
            turn_budget: None,
        }
    }

    async fn wait_terminal(state: &AppState, id: &str) -> InvestigationState {
        for _ in 0..600 {
            let current = state.investigations.get(id).unwrap().state;
            if current.is_terminal() {
                return current;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("investigation '{id}' never became terminal");
    }

    #[tokio::test]
    async fn finishing_worker_drives_succeeded() {
        let state = app_state(FINISH_LINE, Config::default());
        let inv = create_investigation(&state, request("say hello"))
            .await
            .unwrap();
        assert_eq!(inv.state, InvestigationState::Running);

        assert_eq!(
            wait_terminal(&state, &inv.id).await,
            InvestigationState::Succeeded
        );

        // The finish event is replayable from log retention.
        let logs = state.orchestrator.read_logs(&inv.job_name).await.unwrap();
        let replayed: Vec<Event> = logs.lines().filter_map(Event::parse_line).collect();
        assert!(matches!(replayed.last(), Some(Event::Finish { .. })));
    }

    #[tokio::test]
    async fn failing_worker_drives_failed() {
        let state = app_state("exit 1", Config::default());
        let inv = create_investigation(&state, request("g")).await.unwrap();

        assert_eq!(
            wait_terminal(&state, &inv.id).await,
            InvestigationState::Failed
        );
        let record = state.investigations.get(&inv.id).unwrap();
        assert!(record.error.unwrap().contains("exited 1"));
    }

    #[tokio::test]
    async fn clean_exit_without_finish_event_is_failed() {
        let state = app_state("true", Config::default());
        let inv = create_investigation(&state, request("g")).await.unwrap();

        assert_eq!(
            wait_terminal(&state, &inv.id).await,
            InvestigationState::Failed
        );
        let record = state.investigations.get(&inv.id).unwrap();
        assert!(record.error.unwrap().contains("without a finish event"));
    }

    #[tokio::test]
    async fn cancellation_wins_over_watcher_transition() {
        let state = app_state("sleep 30", Config::default());
        let inv = create_investigation(&state, request("g")).await.unwrap();
        assert_eq!(inv.state, InvestigationState::Running);

        // What DELETE /investigations/{id} does.
        let _ = state.orchestrator.delete_job(&inv.job_name).await;
        state
            .investigations
            .transition(&inv.id, InvestigationState::Cancelled);

        assert_eq!(
            wait_terminal(&state, &inv.id).await,
            InvestigationState::Cancelled
        );

        // Give the watcher time to observe the kill; it must not
        // overwrite the cancelled state.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(
            state.investigations.get(&inv.id).unwrap().state,
            InvestigationState::Cancelled
        );
    }

    #[tokio::test]
    async fn hard_deadline_drives_timed_out() {
        let mut config = Config::default();
        config.orchestrator.hard_deadline_secs = 1;
        let state = app_state("sleep 30", config);
        let inv = create_investigation(&state, request("g")).await.unwrap();

        assert_eq!(
            wait_terminal(&state, &inv.id).await,
            InvestigationState::TimedOut
        );
    }

    #[tokio::test]
    async fn empty_goal_is_invalid() {
        let state = app_state("true", Config::default());
        let err = create_investigation(&state, request("   ")).await.unwrap_err();
        assert!(matches!(
            err,
            crate::runtime::launcher::CreateError::Invalid(_)
        ));
    }

    #[tokio::test]
    async fn oversized_turn_budget_is_invalid() {
        let state = app_state("true", Config::default());
        let mut req = request("g");
        req.turn_budget = Some(10_000);
        let err = create_investigation(&state, req).await.unwrap_err();
        assert!(matches!(
            err,
            crate::runtime::launcher::CreateError::Invalid(_)
        ));
    }
}
