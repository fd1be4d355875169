//! Loop scenarios against a scripted oracle and a real executor.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{json, Value};

use oats_domain::config::{EngineConfig, ToolsConfig};
use oats_domain::error::{Error, Result};
use oats_domain::event::Event;
use oats_domain::tool::ToolStatus;
use oats_engine::{CollectSink, ReasoningEngine};
use oats_providers::{CompletionProvider, CompletionRequest, CompletionResponse};
use oats_tools::builtin;
use oats_tools::{FnHandler, ToolDescriptor, ToolExecutor, ToolRegistry};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scripted oracle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Replays a scripted list of replies; the last entry repeats forever.
/// Records every request so tests can inspect composed prompts.
struct ScriptedOracle {
    replies: Mutex<VecDeque<Result<String>>>,
    last: Mutex<Option<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedOracle {
    fn new(replies: Vec<Result<String>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            last: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.requests.lock().len()
    }

    fn prompts(&self) -> Vec<String> {
        self.requests.lock().iter().map(|r| r.prompt.clone()).collect()
    }
}

#[async_trait::async_trait]
impl CompletionProvider for ScriptedOracle {
    async fn complete(&self, req: &CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().push(req.clone());
        let next = self.replies.lock().pop_front();
        let content = match next {
            Some(Ok(content)) => {
                *self.last.lock() = Some(content.clone());
                content
            }
            Some(Err(e)) => return Err(e),
            None => self
                .last
                .lock()
                .clone()
                .expect("scripted oracle ran out of replies"),
        };
        Ok(CompletionResponse {
            content,
            model: "scripted".into(),
            usage: None,
        })
    }

    fn provider_id(&self) -> &str {
        "scripted"
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Fixtures
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn fast_config() -> EngineConfig {
    EngineConfig {
        backoff_base_ms: 1,
        ..EngineConfig::default()
    }
}

fn echo_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "echo".into(),
        version: "1.0.0".into(),
        description: "echoes".into(),
        input_schema: json!({"type": "object"}),
        handler: Arc::new(FnHandler(|params: Value| async move {
            Ok(params.to_string())
        })),
    }
}

fn big_tool() -> ToolDescriptor {
    ToolDescriptor {
        name: "noisy".into(),
        version: "1.0.0".into(),
        description: "emits 500 lines".into(),
        input_schema: json!({"type": "object"}),
        handler: Arc::new(FnHandler(|_params: Value| async move {
            Ok((0..500).map(|i| format!("line {i}\n")).collect())
        })),
    }
}

struct Harness {
    engine: ReasoningEngine,
    oracle: Arc<ScriptedOracle>,
    sink: Arc<CollectSink>,
    _scratch: tempfile::TempDir,
}

fn harness(replies: Vec<Result<String>>, config: EngineConfig) -> Harness {
    let mut registry = ToolRegistry::new();
    builtin::register_builtins(&mut registry).unwrap();
    registry.register(echo_tool()).unwrap();
    registry.register(big_tool()).unwrap();

    let scratch = tempfile::tempdir().unwrap();
    let executor = ToolExecutor::new(
        Arc::new(registry),
        scratch.path(),
        ToolsConfig::default(),
    );

    let oracle = ScriptedOracle::new(replies);
    let sink = Arc::new(CollectSink::new());
    let engine = ReasoningEngine::new(
        oracle.clone(),
        executor,
        config,
        "v2",
        sink.clone(),
    );
    Harness {
        engine,
        oracle,
        sink,
        _scratch: scratch,
    }
}

fn finish_reply(result: &str) -> Result<String> {
    Ok(json!({
        "reflect": "conclusion reached",
        "strategize": "finish",
        "act": {"tool": "finish", "params": {"result": result}}
    })
    .to_string())
}

fn act_reply(tool: &str, params: Value, state: Value) -> Result<String> {
    Ok(json!({
        "reflect": "looking",
        "strategize": "next step",
        "state": state,
        "act": {"tool": tool, "params": params}
    })
    .to_string())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Scenarios
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[tokio::test]
async fn trivial_finish_on_first_turn() {
    let h = harness(vec![finish_reply("hello")], fast_config());
    let report = h.engine.run("Say hello", 3).await;

    assert!(report.success);
    assert_eq!(report.turns_used, 1);
    assert_eq!(report.state.final_result.as_deref(), Some("hello"));
    assert_eq!(h.sink.event_types(), vec!["thought", "action", "finish"]);

    // is_complete implies the last transcript entry is the finish tool.
    assert!(report.state.is_complete);
    assert_eq!(report.state.transcript.last().unwrap().action, "finish");
    assert_eq!(report.state.transcript.len() as u32, report.state.turn_count);
}

#[tokio::test]
async fn budget_exhaustion_fails_with_error_event() {
    let h = harness(
        vec![act_reply("echo", json!({"n": 1}), json!({}))],
        fast_config(),
    );
    let report = h.engine.run("never finishes", 2).await;

    assert!(!report.success);
    assert_eq!(report.turns_used, 2);
    assert_eq!(report.state.transcript.len(), 2);
    assert!(report.state.turn_count <= 2);

    let events = h.sink.events();
    match events.last().unwrap() {
        Event::Error { message } => assert!(message.contains("budget exhausted")),
        other => panic!("expected trailing error event, got {other:?}"),
    }
}

#[tokio::test]
async fn budget_of_one_runs_exactly_one_turn() {
    let h = harness(
        vec![act_reply("echo", json!({}), json!({}))],
        fast_config(),
    );
    let report = h.engine.run("g", 1).await;

    assert!(!report.success);
    assert_eq!(report.turns_used, 1);
    assert_eq!(h.oracle.call_count(), 1);
    // One dispatch: exactly one observation event.
    let observations = h
        .sink
        .events()
        .into_iter()
        .filter(|e| e.event_type() == "observation")
        .count();
    assert_eq!(observations, 1);
}

#[tokio::test]
async fn unknown_tool_is_recovered_not_fatal() {
    let h = harness(
        vec![
            act_reply("nonexistent", json!({}), json!({})),
            finish_reply("done anyway"),
        ],
        fast_config(),
    );
    let report = h.engine.run("g", 5).await;

    assert!(report.success);
    assert_eq!(report.turns_used, 2);

    let failure = h
        .sink
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Observation { status, error, .. } if status == ToolStatus::Failure => error,
            _ => None,
        })
        .unwrap();
    assert!(failure.contains("unknown tool"));
}

#[tokio::test]
async fn large_output_is_funneled_into_the_observation() {
    let h = harness(
        vec![
            act_reply("noisy", json!({}), json!({})),
            finish_reply("done"),
        ],
        fast_config(),
    );
    let report = h.engine.run("g", 5).await;
    assert!(report.success);

    let (output, summary) = h
        .sink
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Observation {
                output, summary, ..
            } => Some((output, summary)),
            _ => None,
        })
        .unwrap();
    let summary = summary.expect("funneled observation carries a summary");

    assert!(output.contains("LARGE OUTPUT DETECTED"));
    assert!(output.contains(&summary.full_output_path));
    assert_eq!(summary.total_lines, 500);
    assert!(std::path::Path::new(&summary.full_output_path).exists());
    // Byte-for-byte spill round-trip.
    let spilled = std::fs::read_to_string(&summary.full_output_path).unwrap();
    assert_eq!(spilled.lines().count(), 500);
}

#[tokio::test]
async fn malformed_reply_soft_retries_without_spending_a_turn() {
    let h = harness(
        vec![Ok("I think we should check the logs".into()), finish_reply("ok")],
        fast_config(),
    );
    let report = h.engine.run("g", 3).await;

    assert!(report.success);
    assert_eq!(report.turns_used, 1);
    assert_eq!(h.oracle.call_count(), 2);

    // The corrective directive reached the second prompt.
    let prompts = h.oracle.prompts();
    assert!(!prompts[0].contains("CORRECTION"));
    assert!(prompts[1].contains("CORRECTION"));
}

#[tokio::test]
async fn two_consecutive_parse_failures_terminate() {
    let h = harness(
        vec![Ok("nope".into()), Ok("still nope".into())],
        fast_config(),
    );
    let report = h.engine.run("g", 3).await;

    assert!(!report.success);
    assert_eq!(report.turns_used, 0);
    match h.sink.events().last().unwrap() {
        Event::Error { message } => assert!(message.contains("unparseable")),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn transient_oracle_errors_are_retried() {
    let h = harness(
        vec![Err(Error::Http("502 bad gateway".into())), finish_reply("ok")],
        fast_config(),
    );
    let report = h.engine.run("g", 3).await;

    assert!(report.success);
    assert_eq!(h.oracle.call_count(), 2);
}

#[tokio::test]
async fn persistent_oracle_failure_fails_the_run() {
    let h = harness(
        vec![Err(Error::Provider {
            provider: "scripted".into(),
            message: "invalid api key".into(),
        })],
        fast_config(),
    );
    let report = h.engine.run("g", 3).await;

    assert!(!report.success);
    assert_eq!(report.turns_used, 0);
    match h.sink.events().last().unwrap() {
        Event::Error { message } => assert!(message.contains("oracle failure")),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn facts_accumulate_across_turns_despite_regression() {
    let h = harness(
        vec![
            act_reply(
                "echo",
                json!({}),
                json!({"facts": ["cpu is saturated"]}),
            ),
            // Second proposal "forgets" the first fact.
            act_reply(
                "echo",
                json!({}),
                json!({"facts": ["iowait is high"]}),
            ),
            finish_reply("done"),
        ],
        fast_config(),
    );
    let report = h.engine.run("g", 5).await;

    assert!(report.success);
    assert_eq!(
        report.state.facts,
        vec!["cpu is saturated", "iowait is high"]
    );
}

#[tokio::test]
async fn multi_active_task_plans_emit_a_warning_event() {
    let h = harness(
        vec![
            act_reply(
                "echo",
                json!({}),
                json!({"tasks": [
                    {"id": "t1", "description": "a", "status": "active"},
                    {"id": "t2", "description": "b", "status": "active"}
                ]}),
            ),
            finish_reply("done"),
        ],
        fast_config(),
    );
    let report = h.engine.run("g", 5).await;
    assert!(report.success);

    let warning = h
        .sink
        .events()
        .into_iter()
        .find_map(|e| match e {
            Event::Status { message } if message.contains("demoted") => Some(message),
            _ => None,
        });
    assert!(warning.is_some());
}

#[tokio::test]
async fn stuck_task_gets_one_forced_reflection() {
    let config = EngineConfig {
        backoff_base_ms: 1,
        stuck_task_turns: 2,
        stuck_no_delta_turns: 2,
        ..EngineConfig::default()
    };
    // Same active task every turn, never any new facts.
    let stuck_state = json!({
        "active": {"id": "t1", "archetype": "Investigate", "phase": "Test"}
    });
    let h = harness(
        vec![act_reply("echo", json!({}), stuck_state)],
        config,
    );
    let report = h.engine.run("g", 6).await;
    assert!(!report.success);

    let reflective_prompts = h
        .oracle
        .prompts()
        .into_iter()
        .filter(|p| p.contains("FORCED REFLECTION"))
        .count();
    // Injected exactly once for the stuck window.
    assert_eq!(reflective_prompts, 1);
}
