//! Worker entrypoint: the process that hosts one Reasoning Engine for
//! exactly one investigation.
//!
//! stdout carries the event protocol (one JSON event per line, plus a
//! human-readable summary at the end); all logging goes to stderr. The
//! exit code is the only outward success signal the orchestrator
//! tracks: 0 iff the finish tool fired.

mod env;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use oats_domain::config::{self, EngineConfig, ToolsConfig};
use oats_domain::event::Event;
use oats_engine::prompt::DEFAULT_PROMPT_VERSION;
use oats_engine::{EventSink, ReasoningEngine, StdoutSink};
use oats_tools::{builtin, ToolExecutor, ToolRegistry};

use crate::env::WorkerEnv;

#[tokio::main]
async fn main() {
    std::process::exit(run().await);
}

async fn run() -> i32 {
    init_tracing();
    let sink: Arc<dyn EventSink> = Arc::new(StdoutSink);

    let env = match WorkerEnv::from_env() {
        Ok(env) => env,
        Err(e) => return fatal(sink.as_ref(), format!("startup: {e}")),
    };
    tracing::info!(max_turns = env.max_turns, "worker starting");

    // ── Tool registry ────────────────────────────────────────────────
    let mut registry = ToolRegistry::new();
    if let Err(e) = builtin::register_builtins(&mut registry) {
        return fatal(sink.as_ref(), format!("registering builtin tools: {e}"));
    }
    if env.tools_dir.is_dir() {
        match registry.discover(&env.tools_dir) {
            Ok(count) => tracing::info!(
                count,
                dir = %env.tools_dir.display(),
                "tool discovery complete"
            ),
            Err(e) => return fatal(sink.as_ref(), format!("tool discovery: {e}")),
        }
    } else if env.tools_dir_explicit {
        return fatal(
            sink.as_ref(),
            format!("tool directory '{}' is not readable", env.tools_dir.display()),
        );
    } else {
        tracing::info!(
            dir = %env.tools_dir.display(),
            "default tool directory absent, using builtins only"
        );
    }

    // ── Scratch directory (purged on drop, best-effort) ─────────────
    let scratch = match tempfile::Builder::new().prefix("oats-scratch-").tempdir() {
        Ok(scratch) => scratch,
        Err(e) => return fatal(sink.as_ref(), format!("creating scratch directory: {e}")),
    };

    // ── Oracle ──────────────────────────────────────────────────────
    let engine_config = EngineConfig::default();
    let provider = match oats_providers::provider_from_env(engine_config.oracle_timeout_secs) {
        Ok(provider) => provider,
        Err(e) => return fatal(sink.as_ref(), format!("oracle setup: {e}")),
    };

    // ── Engine ──────────────────────────────────────────────────────
    let executor = ToolExecutor::new(
        Arc::new(registry),
        scratch.path(),
        ToolsConfig::default(),
    );
    let prompt_version = env
        .llm
        .prompt_version
        .clone()
        .unwrap_or_else(|| DEFAULT_PROMPT_VERSION.into());
    let engine = ReasoningEngine::new(
        provider,
        executor,
        engine_config,
        prompt_version,
        sink.clone(),
    );

    let report = engine.run(&env.goal, env.max_turns).await;

    // ── Final-result artifact ───────────────────────────────────────
    if let Some(ref result) = report.state.final_result {
        if let Err(e) = write_artifact(&env.results_dir, result) {
            // The investigation itself succeeded; artifact loss is a
            // warning, not a failure.
            tracing::warn!(error = %e, "failed to write final-result artifact");
        }
    }

    // Human-readable wrap-up; the control plane filters non-event lines.
    println!("{}", report.summary.trim_end());

    if report.success {
        0
    } else {
        1
    }
}

/// Emit a fatal error event and log it. Always returns exit code 1.
fn fatal(sink: &dyn EventSink, message: String) -> i32 {
    tracing::error!(%message, "worker fatal");
    sink.emit(&Event::Error { message });
    1
}

fn write_artifact(results_dir: &std::path::Path, result: &str) -> std::io::Result<()> {
    std::fs::create_dir_all(results_dir)?;
    let name = format!(
        "final_result_{}.txt",
        chrono::Utc::now().format("%Y%m%dT%H%M%S")
    );
    let path = results_dir.join(name);
    std::fs::write(&path, result)?;
    tracing::info!(path = %path.display(), "final result written");
    Ok(())
}

/// Logs go to stderr; stdout belongs to the event protocol.
fn init_tracing() {
    let filter = std::env::var(config::ENV_LOG_LEVEL)
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
