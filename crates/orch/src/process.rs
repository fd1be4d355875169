//! Process-backed orchestrator.
//!
//! Runs each job as a local child process of the control plane and keeps
//! its merged stdout/stderr lines in a per-job buffer. The buffer is the
//! log-retention store: follow streams replay it from the first line and
//! then tail live output, and terminal jobs are reclaimed after their TTL.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::{broadcast, mpsc};

use oats_domain::error::{Error, Result};

use crate::{BoxStream, JobSpec, JobStatus, Orchestrator};

/// Exit code reported when a worker is killed by job deletion.
const KILLED_EXIT_CODE: i32 = 137;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Job entry
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Shared mutable state for one tracked job.
struct JobEntry {
    status: JobStatus,
    /// Retained log lines, in arrival order.
    log: Vec<String>,
    /// Live-tail fan-out. Each message carries the line's index in `log`
    /// so late subscribers can skip what their snapshot already covered.
    /// Dropped at terminal state so follow streams observe closure.
    log_tx: Option<broadcast::Sender<(usize, String)>>,
    /// Signal the monitor to kill the child.
    kill_tx: Option<mpsc::Sender<()>>,
}

fn push_line(entry: &Arc<RwLock<JobEntry>>, line: String) {
    let mut e = entry.write();
    let idx = e.log.len();
    e.log.push(line.clone());
    if let Some(ref tx) = e.log_tx {
        let _ = tx.send((idx, line));
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// ProcessOrchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Local-process scheduler. `worker_command` is run via `sh -c` with the
/// job's environment applied; `JobSpec.image` and `restart_on_failure`
/// are cluster concerns and ignored here (processes never restart).
pub struct ProcessOrchestrator {
    jobs: Arc<RwLock<HashMap<String, Arc<RwLock<JobEntry>>>>>,
    worker_command: String,
}

impl ProcessOrchestrator {
    pub fn new(worker_command: impl Into<String>) -> Self {
        Self {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            worker_command: worker_command.into(),
        }
    }

    /// Number of currently tracked (not yet reclaimed) jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.read().len()
    }

    fn get_entry(&self, name: &str) -> Option<Arc<RwLock<JobEntry>>> {
        self.jobs.read().get(name).cloned()
    }
}

#[async_trait::async_trait]
impl Orchestrator for ProcessOrchestrator {
    async fn create_job(&self, spec: JobSpec) -> Result<()> {
        if self.jobs.read().contains_key(&spec.name) {
            return Err(Error::Orchestrator(format!(
                "job '{}' already exists",
                spec.name
            )));
        }

        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(&self.worker_command);
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.stdin(std::process::Stdio::null());
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let child = cmd.spawn().map_err(|e| {
            Error::Orchestrator(format!("failed to spawn worker for '{}': {e}", spec.name))
        })?;

        let (log_tx, _) = broadcast::channel(1024);
        let (kill_tx, kill_rx) = mpsc::channel(1);

        let entry = Arc::new(RwLock::new(JobEntry {
            status: JobStatus::Running,
            log: Vec::new(),
            log_tx: Some(log_tx),
            kill_tx: Some(kill_tx),
        }));
        self.jobs.write().insert(spec.name.clone(), entry.clone());

        tracing::info!(job = %spec.name, namespace = %spec.namespace, "job created");
        spawn_monitor(
            self.jobs.clone(),
            spec.name,
            entry,
            child,
            kill_rx,
            spec.ttl_after_finished_secs,
        );
        Ok(())
    }

    async fn job_status(&self, name: &str) -> Result<JobStatus> {
        Ok(self
            .get_entry(name)
            .map(|e| e.read().status)
            .unwrap_or(JobStatus::NotFound))
    }

    async fn follow_logs(&self, name: &str) -> Result<BoxStream<'static, Result<String>>> {
        let entry = self
            .get_entry(name)
            .ok_or_else(|| Error::Orchestrator(format!("job '{name}' not found")))?;

        // Subscribe and snapshot under one lock so no line can land
        // between the two.
        let (snapshot, rx) = {
            let e = entry.read();
            (e.log.clone(), e.log_tx.as_ref().map(|tx| tx.subscribe()))
        };

        let stream = async_stream::stream! {
            let replayed = snapshot.len();
            for line in snapshot {
                yield Ok(line);
            }
            if let Some(mut rx) = rx {
                loop {
                    match rx.recv().await {
                        Ok((idx, line)) => {
                            if idx >= replayed {
                                yield Ok(line);
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "log follow lagged, lines dropped");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }
            }
        };
        Ok(Box::pin(stream))
    }

    async fn read_logs(&self, name: &str) -> Result<String> {
        let entry = self
            .get_entry(name)
            .ok_or_else(|| Error::Orchestrator(format!("job '{name}' not found")))?;
        let log = entry.read().log.join("\n");
        Ok(log)
    }

    async fn delete_job(&self, name: &str) -> Result<bool> {
        let entry = match self.jobs.write().remove(name) {
            Some(entry) => entry,
            None => return Ok(false),
        };
        let kill_tx = entry.read().kill_tx.clone();
        if let Some(tx) = kill_tx {
            let _ = tx.try_send(());
        }
        tracing::info!(job = %name, "job deleted");
        Ok(true)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Monitor task
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Spawn the task that pumps the child's output into the log buffer,
/// waits for exit or a kill signal, records the terminal status, and
/// reclaims the entry after the TTL.
fn spawn_monitor(
    jobs: Arc<RwLock<HashMap<String, Arc<RwLock<JobEntry>>>>>,
    name: String,
    entry: Arc<RwLock<JobEntry>>,
    mut child: tokio::process::Child,
    mut kill_rx: mpsc::Receiver<()>,
    ttl_secs: u64,
) {
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    tokio::spawn(async move {
        let entry_out = entry.clone();
        let stdout_task = tokio::spawn(async move {
            if let Some(stdout) = stdout {
                let mut reader = BufReader::new(stdout).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    push_line(&entry_out, line);
                }
            }
        });

        let entry_err = entry.clone();
        let stderr_task = tokio::spawn(async move {
            if let Some(stderr) = stderr {
                let mut reader = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = reader.next_line().await {
                    push_line(&entry_err, line);
                }
            }
        });

        let status;
        tokio::select! {
            result = child.wait() => {
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                status = match result {
                    Ok(exit) => match exit.code() {
                        Some(0) => JobStatus::Succeeded,
                        Some(code) => JobStatus::Failed { exit_code: code },
                        // Terminated by signal.
                        None => JobStatus::Failed { exit_code: KILLED_EXIT_CODE },
                    },
                    Err(e) => {
                        push_line(&entry, format!("[process error: {e}]"));
                        JobStatus::Failed { exit_code: KILLED_EXIT_CODE }
                    }
                };
            }
            _ = kill_rx.recv() => {
                let _ = child.kill().await;
                let _ = stdout_task.await;
                let _ = stderr_task.await;
                status = JobStatus::Failed { exit_code: KILLED_EXIT_CODE };
            }
        }

        {
            let mut e = entry.write();
            e.status = status;
            // Close follow streams.
            e.log_tx = None;
            e.kill_tx = None;
        }
        tracing::debug!(job = %name, status = ?status, "job finished");

        // Terminal-state TTL: reclaim the entry unless it was already
        // deleted (or the name was reused).
        tokio::time::sleep(std::time::Duration::from_secs(ttl_secs)).await;
        let mut jobs = jobs.write();
        if let Some(current) = jobs.get(&name) {
            if Arc::ptr_eq(current, &entry) {
                jobs.remove(&name);
                tracing::debug!(job = %name, "job reclaimed after TTL");
            }
        }
    });
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
