//! Orchestrator interface — the scheduler primitives the control plane
//! needs from whatever platform hosts investigation workers.
//!
//! The platform itself is an external collaborator: the control plane
//! depends only on [`Orchestrator`]. The in-tree [`process`] backend runs
//! workers as local child processes and doubles as the log-retention
//! store; cluster-backed implementations are deployment-specific.

pub mod process;

pub use process::ProcessOrchestrator;

use std::pin::Pin;

use oats_domain::error::Result;

/// A boxed async stream of log lines.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Job types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Everything needed to materialize one ephemeral worker job.
#[derive(Debug, Clone)]
pub struct JobSpec {
    pub name: String,
    pub namespace: String,
    /// Worker container image (cluster backends).
    pub image: String,
    pub env: Vec<(String, String)>,
    /// Name of the platform-managed secret holding oracle credentials,
    /// mounted into the worker's environment by cluster backends.
    pub credentials_secret: String,
    /// Investigation jobs never restart: the exit code is the signal.
    pub restart_on_failure: bool,
    /// Seconds the platform retains the job (and its logs) after it
    /// reaches a terminal state.
    pub ttl_after_finished_secs: u64,
}

/// Observed state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    /// Worker exited 0.
    Succeeded,
    /// Worker exited non-zero (or was killed).
    Failed { exit_code: i32 },
    /// Unknown to the platform (never created, or reclaimed).
    NotFound,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed { .. })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator trait
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Scheduler primitives: create an ephemeral job, read its status,
/// stream its logs, delete it.
#[async_trait::async_trait]
pub trait Orchestrator: Send + Sync {
    /// Schedule a job. An error is a rejection: nothing was created.
    async fn create_job(&self, spec: JobSpec) -> Result<()>;

    /// Current status of a job by name.
    async fn job_status(&self, name: &str) -> Result<JobStatus>;

    /// Follow a job's log stream from the first retained line. The
    /// stream ends when the job reaches a terminal state and its buffer
    /// is drained.
    async fn follow_logs(&self, name: &str) -> Result<BoxStream<'static, Result<String>>>;

    /// One-shot read of all retained log lines (replay for detached
    /// clients).
    async fn read_logs(&self, name: &str) -> Result<String>;

    /// Delete a job, terminating its worker if still running. Returns
    /// `false` if the job was not found.
    async fn delete_job(&self, name: &str) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_terminality() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(!JobStatus::NotFound.is_terminal());
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed { exit_code: 1 }.is_terminal());
    }
}
