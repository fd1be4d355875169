//! The turn loop.
//!
//! Strictly serialized per worker: prompt → oracle → parse → dispatch →
//! merge, one oracle call and one tool execution outstanding at a time.

use std::sync::Arc;

use oats_domain::agent::{AgentState, TurnRecord};
use oats_domain::config::EngineConfig;
use oats_domain::event::Event;
use oats_providers::{retry, CompletionProvider, CompletionRequest};
use oats_tools::builtin::finish;
use oats_tools::{ToolExecutor, FINISH_TOOL};

use crate::events::EventSink;
use crate::merge;
use crate::parse::{self, ParseOutcome};
use crate::prompt::{self, CatalogTool, PromptInputs};

/// What a finished run looks like to the worker entrypoint.
#[derive(Debug)]
pub struct EngineReport {
    /// True iff the finish tool fired.
    pub success: bool,
    pub state: AgentState,
    pub turns_used: u32,
    /// Human-readable wrap-up for stdout.
    pub summary: String,
}

pub struct ReasoningEngine {
    provider: Arc<dyn CompletionProvider>,
    executor: ToolExecutor,
    config: EngineConfig,
    prompt_version: String,
    sink: Arc<dyn EventSink>,
}

impl ReasoningEngine {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        executor: ToolExecutor,
        config: EngineConfig,
        prompt_version: impl Into<String>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            provider,
            executor,
            config,
            prompt_version: prompt_version.into(),
            sink,
        }
    }

    /// Run the investigation to completion, budget exhaustion, or an
    /// unrecoverable failure.
    pub async fn run(&self, goal: &str, turn_budget: u32) -> EngineReport {
        let mut state = AgentState::new(goal);
        let catalog = prompt::catalog(self.executor.registry());
        let system = prompt::system_preamble(&self.prompt_version).to_owned();

        let mut consecutive_parse_failures: u32 = 0;
        let mut directives: Vec<String> = Vec::new();
        let mut no_delta_streak: u32 = 0;
        let mut reflection_pending = false;

        loop {
            if state.is_complete {
                return self.report(state, true, None);
            }
            if state.turn_count >= turn_budget {
                let message = "budget exhausted".to_owned();
                self.sink.emit(&Event::Error {
                    message: message.clone(),
                });
                return self.report(state, false, Some(message));
            }

            let turn = state.turn_count + 1;

            // 1. Build prompt.
            let turn_prompt = prompt::compose(&PromptInputs {
                state: &state,
                tools: &catalog,
                turn,
                turn_budget,
                directives: &directives,
                transcript_char_budget: self.config.transcript_char_budget,
            });

            // 2. Oracle call with bounded retry.
            let request = CompletionRequest {
                system: system.clone(),
                prompt: turn_prompt,
                json_only: true,
                ..Default::default()
            };
            let response = match retry::with_backoff(
                self.config.oracle_attempts,
                self.config.backoff_base_ms,
                |_| self.provider.complete(&request),
            )
            .await
            {
                Ok(response) => response,
                Err(e) => {
                    let message = format!("oracle failure: {e}");
                    self.sink.emit(&Event::Error {
                        message: message.clone(),
                    });
                    return self.report(state, false, Some(message));
                }
            };

            // 3. Parse. A malformed reply costs no turn; two in a row
            // are fatal.
            let reply = match parse::parse_reply(&response.content, self.config.reply_precedence) {
                ParseOutcome::Malformed(reason) => {
                    consecutive_parse_failures += 1;
                    tracing::warn!(
                        %reason,
                        failures = consecutive_parse_failures,
                        "malformed oracle reply"
                    );
                    if consecutive_parse_failures >= self.config.parse_failure_limit {
                        let message =
                            format!("oracle replies unparseable after retry: {reason}");
                        self.sink.emit(&Event::Error {
                            message: message.clone(),
                        });
                        return self.report(state, false, Some(message));
                    }
                    directives = vec![prompt::corrective_directive(&reason)];
                    continue;
                }
                ParseOutcome::Reply(reply) => {
                    consecutive_parse_failures = 0;
                    reply
                }
            };
            directives.clear();

            // 4. Emit thought and action.
            self.sink.emit(&Event::Thought {
                turn,
                content: reply.thought.clone(),
            });
            self.sink.emit(&Event::Action {
                turn,
                tool: reply.act.tool.clone(),
                params: reply.act.params.clone(),
            });

            // 5. Dispatch. The finish tool is intercepted, not executed.
            if reply.act.tool == FINISH_TOOL {
                let result = finish::result_text(&reply.act.params);
                state.transcript.push(TurnRecord {
                    turn_index: turn,
                    thought: reply.thought,
                    action: FINISH_TOOL.to_owned(),
                    observation: result.clone(),
                });
                state.turn_count = turn;
                state.is_complete = true;
                state.final_result = Some(result.clone());
                self.sink.emit(&Event::Finish {
                    result,
                    turns_used: state.turn_count,
                });
                continue;
            }

            let result = self
                .executor
                .execute(&reply.act.tool, reply.act.params.clone())
                .await;
            self.sink.emit(&Event::Observation {
                turn,
                tool: reply.act.tool.clone(),
                status: result.status,
                output: result.output.clone(),
                error: result.error.clone(),
                duration_ms: result.duration_ms,
                summary: result.summary.clone(),
            });

            let observation = match &result.error {
                Some(error) => format!("FAILED: {error}"),
                None => result.output.clone(),
            };
            state.transcript.push(TurnRecord {
                turn_index: turn,
                thought: reply.thought,
                action: format!("{} {}", reply.act.tool, reply.act.params),
                observation,
            });
            state.turn_count = turn;

            // 6. Merge the proposed state under the engine's invariants.
            let report = match reply.proposed_state {
                Some(proposed) => merge::merge_proposed(&mut state, proposed),
                None => merge::MergeReport::default(),
            };
            for warning in &report.warnings {
                self.sink.emit(&Event::Status {
                    message: warning.clone(),
                });
            }
            if let Some(active) = state.active.as_mut() {
                active.turns_on_task += 1;
            }

            // 7. Stuck detection: many turns on one task with no state
            // delta triggers a one-shot forced reflection.
            if report.has_delta() {
                no_delta_streak = 0;
                reflection_pending = false;
            } else {
                no_delta_streak += 1;
            }
            let on_task_too_long = state
                .active
                .as_ref()
                .is_some_and(|a| a.turns_on_task >= self.config.stuck_task_turns);
            if on_task_too_long
                && no_delta_streak >= self.config.stuck_no_delta_turns
                && !reflection_pending
            {
                directives.push(prompt::FORCED_REFLECTION_DIRECTIVE.to_owned());
                reflection_pending = true;
                no_delta_streak = 0;
                self.sink.emit(&Event::Status {
                    message: "stuck on task; forcing reflection next turn".into(),
                });
            }
        }
    }

    fn report(&self, state: AgentState, success: bool, error: Option<String>) -> EngineReport {
        let summary = summary_text(&state, success, error.as_deref());
        EngineReport {
            success,
            turns_used: state.turn_count,
            summary,
            state,
        }
    }
}

fn summary_text(state: &AgentState, success: bool, error: Option<&str>) -> String {
    let mut text = String::new();
    if success {
        text.push_str(&format!(
            "Investigation complete in {} turn(s).\n",
            state.turn_count
        ));
        if let Some(ref result) = state.final_result {
            text.push_str(&format!("Result: {result}\n"));
        }
    } else {
        text.push_str(&format!(
            "Investigation did not complete ({}).\n",
            error.unwrap_or("unknown failure")
        ));
    }
    if !state.facts.is_empty() {
        text.push_str(&format!("Facts established: {}\n", state.facts.len()));
    }
    if !state.ruled_out.is_empty() {
        text.push_str(&format!("Hypotheses ruled out: {}\n", state.ruled_out.len()));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_mentions_result_on_success() {
        let mut state = AgentState::new("g");
        state.turn_count = 3;
        state.final_result = Some("disk full on node-2".into());
        state.add_fact("a");
        let text = summary_text(&state, true, None);
        assert!(text.contains("3 turn(s)"));
        assert!(text.contains("disk full on node-2"));
        assert!(text.contains("Facts established: 1"));
    }

    #[test]
    fn summary_mentions_error_on_failure() {
        let state = AgentState::new("g");
        let text = summary_text(&state, false, Some("budget exhausted"));
        assert!(text.contains("budget exhausted"));
    }
}
