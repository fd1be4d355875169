//! Shell tool — run one diagnostic command and capture its output.
//!
//! A non-zero exit is still a useful observation (the agent reads the
//! exit code), so only spawn failures surface as handler errors. The
//! per-call timeout is enforced by the executor; `kill_on_drop` makes
//! sure a timed-out command does not outlive its future.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};
use tokio::process::Command;

use crate::registry::{ToolDescriptor, ToolHandler};

#[derive(Debug, Deserialize)]
struct ShellParams {
    command: String,
    #[serde(default)]
    workdir: Option<String>,
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "shell".into(),
        version: "1.0.0".into(),
        description: "Run a shell command and return its combined stdout/stderr. \
                      Non-zero exits are reported inline, not as errors."
            .into(),
        input_schema: json!({
            "type": "object",
            "required": ["command"],
            "properties": {
                "command": {"type": "string", "description": "Command line to run via sh -c"},
                "workdir": {"type": "string", "description": "Working directory (optional)"}
            }
        }),
        handler: Arc::new(ShellHandler),
    }
}

struct ShellHandler;

impl ToolHandler for ShellHandler {
    fn call(
        &self,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + '_>> {
        Box::pin(async move {
            let params: ShellParams =
                serde_json::from_value(params).map_err(|e| format!("bad parameters: {e}"))?;
            run_command_in(&params.command, params.workdir.as_deref()).await
        })
    }
}

/// Run a command via `sh -c`, merging stdout and stderr in that order.
pub async fn run_command(command: &str) -> Result<String, String> {
    run_command_in(command, None).await
}

async fn run_command_in(command: &str, workdir: Option<&str>) -> Result<String, String> {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd.stdin(std::process::Stdio::null());
    cmd.kill_on_drop(true);
    if let Some(dir) = workdir {
        cmd.current_dir(dir);
    }

    let output = cmd
        .output()
        .await
        .map_err(|e| format!("failed to spawn '{command}': {e}"))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        if !combined.is_empty() && !combined.ends_with('\n') {
            combined.push('\n');
        }
        combined.push_str(&stderr);
    }

    match output.status.code() {
        Some(0) => Ok(combined),
        Some(code) => {
            if !combined.is_empty() && !combined.ends_with('\n') {
                combined.push('\n');
            }
            combined.push_str(&format!("[exit code: {code}]"));
            Ok(combined)
        }
        None => Err(format!("'{command}' terminated by signal")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout() {
        let out = run_command("printf 'hello'").await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn merges_stderr() {
        let out = run_command("printf 'out'; printf 'err' >&2").await.unwrap();
        assert!(out.contains("out"));
        assert!(out.contains("err"));
    }

    #[tokio::test]
    async fn nonzero_exit_is_annotated_not_an_error() {
        let out = run_command("printf 'partial'; exit 2").await.unwrap();
        assert!(out.contains("partial"));
        assert!(out.contains("[exit code: 2]"));
    }

    #[tokio::test]
    async fn workdir_is_honored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "here").unwrap();
        let out = run_command_in("ls", Some(&dir.path().display().to_string()))
            .await
            .unwrap();
        assert!(out.contains("marker.txt"));
    }
}
