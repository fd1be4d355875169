//! Tool executor: looks up, validates, invokes, and funnels.
//!
//! Every path through `execute` returns a [`ToolResult`]; nothing here
//! propagates an error to the reasoning loop. Unknown tools, validation
//! failures, handler errors, timeouts, and scratch I/O problems all come
//! back as `failure` results the agent can read and adapt to.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use oats_domain::config::ToolsConfig;
use oats_domain::tool::ToolResult;

use crate::funnel;
use crate::registry::ToolRegistry;

pub struct ToolExecutor {
    registry: Arc<ToolRegistry>,
    scratch_dir: PathBuf,
    config: ToolsConfig,
}

impl ToolExecutor {
    pub fn new(
        registry: Arc<ToolRegistry>,
        scratch_dir: impl Into<PathBuf>,
        config: ToolsConfig,
    ) -> Self {
        Self {
            registry,
            scratch_dir: scratch_dir.into(),
            config,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn scratch_dir(&self) -> &std::path::Path {
        &self.scratch_dir
    }

    /// Invoke one tool synchronously (from the loop's point of view).
    pub async fn execute(&self, name: &str, raw_params: Value) -> ToolResult {
        let started = Instant::now();

        let entry = match self.registry.entry(name) {
            Some(entry) => entry,
            None => {
                return ToolResult::failure(
                    format!("unknown tool: {name}"),
                    ms_since(started),
                );
            }
        };

        if let Err(message) = entry.validate(&raw_params) {
            return ToolResult::failure(
                format!("invalid parameters for '{name}': {message}"),
                ms_since(started),
            );
        }

        let timeout = std::time::Duration::from_secs(self.config.exec.timeout_secs);
        let outcome =
            tokio::time::timeout(timeout, entry.descriptor.handler.call(raw_params)).await;

        let output = match outcome {
            Err(_) => {
                return ToolResult::failure(
                    format!(
                        "tool '{name}' timed out after {}s",
                        self.config.exec.timeout_secs
                    ),
                    ms_since(started),
                );
            }
            Ok(Err(message)) => {
                return ToolResult::failure(message, ms_since(started));
            }
            Ok(Ok(output)) => output,
        };

        if !funnel::needs_funnel(&self.config.funnel, &output) {
            return ToolResult::success(output, ms_since(started));
        }

        match funnel::process(&self.config.funnel, &self.scratch_dir, name, &output) {
            Ok((guidance, summary)) => {
                let mut result = ToolResult::success(guidance, ms_since(started));
                result.summary = Some(summary);
                result
            }
            Err(message) => ToolResult::failure(message, ms_since(started)),
        }
    }
}

fn ms_since(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
