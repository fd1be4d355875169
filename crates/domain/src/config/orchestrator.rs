use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How the control plane materializes investigation workers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Default namespace for worker jobs when the request omits one.
    #[serde(default = "d_namespace")]
    pub namespace: String,
    /// Container image for worker jobs.
    #[serde(default = "d_worker_image")]
    pub worker_image: String,
    /// Command used by the process-backed orchestrator to start a worker
    /// locally. Ignored by cluster-backed implementations, which use
    /// `worker_image` instead.
    #[serde(default = "d_worker_command")]
    pub worker_command: String,
    /// Name of the orchestrator-managed secret carrying oracle credentials.
    #[serde(default = "d_credentials_secret")]
    pub credentials_secret: String,
    /// Seconds a finished job is retained before the orchestrator reclaims
    /// it. Log replay for detached clients depends on this window.
    #[serde(default = "d_300")]
    pub job_ttl_secs: u64,
    /// Wall-clock hard deadline for a running investigation. Exceeding it
    /// transitions the investigation to `timed_out` and deletes the job.
    #[serde(default = "d_1800")]
    pub hard_deadline_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            namespace: d_namespace(),
            worker_image: d_worker_image(),
            worker_command: d_worker_command(),
            credentials_secret: d_credentials_secret(),
            job_ttl_secs: 300,
            hard_deadline_secs: 1800,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_namespace() -> String {
    "default".into()
}
fn d_worker_image() -> String {
    "oats-worker:latest".into()
}
fn d_worker_command() -> String {
    "oats-worker".into()
}
fn d_credentials_secret() -> String {
    "oats-oracle-credentials".into()
}
fn d_300() -> u64 {
    300
}
fn d_1800() -> u64 {
    1800
}
