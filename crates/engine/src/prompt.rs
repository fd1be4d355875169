//! Prompt composition: a pure function from (preamble, state,
//! transcript, tools, turn) to the oracle request text.

use serde_json::json;

use oats_domain::agent::AgentState;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// System preamble
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub const DEFAULT_PROMPT_VERSION: &str = "v2";

const PREAMBLE_V2: &str = r#"You are an autonomous SRE investigation agent. You are given an
infrastructure problem statement and a set of diagnostic tools, and you
drive the problem to a root cause through careful hypothesis testing.

Each turn, reply with EXACTLY ONE JSON object with these sections:
  "reflect":    what the latest observation told you, in one or two sentences
  "strategize": what you will do next and why
  "state":      your revised working state (see below)
  "act":        {"tool": "<name>", "params": {...}} - the one tool call to make

The "state" object carries:
  "tasks":     your plan, each {"id", "description", "status"} with status
               one of "active" | "done" | "blocked". Keep exactly one task
               active until everything is done.
  "active":    {"id", "archetype", "phase"} for the task you are on.
               Archetypes: Investigate, Create, Modify, Provision, Unorthodox.
  "facts":     observed truths. Never drop a fact; only add.
  "ruled_out": hypotheses you have eliminated, with the evidence implied.
  "unknowns":  open questions still blocking a conclusion.

Rules:
- Invoke exactly one tool per turn. When the root cause is established,
  call the "finish" tool with your conclusion as "result".
- Prefer cheap, read-only diagnostics first. Never run destructive or
  state-changing commands (restarts, deletes, writes) unless the goal
  explicitly asks for remediation.
- LARGE OUTPUT: when an observation starts with "LARGE OUTPUT DETECTED",
  the full payload was saved to the file path shown. Read that file in
  slices (read_file with offset/limit, or shell grep/head/tail) instead
  of re-running the tool.
- Ground every fact in an observation. If two consecutive tools fail,
  change approach instead of retrying the same call.
"#;

const PREAMBLE_V1: &str = r#"You are an SRE diagnostic agent. Each turn, reply with one JSON
object: {"thought": "<your reasoning>", "action": {"tool": "<name>",
"params": {...}}}. Invoke one tool per turn. Call the "finish" tool with
a "result" param when you have the answer. Observations beginning with
"LARGE OUTPUT DETECTED" name a file holding the full payload; read that
file instead of re-running the tool. Do not run destructive commands.
"#;

/// The fixed system preamble for a prompt version. Unknown versions fall
/// back to the current one.
pub fn system_preamble(version: &str) -> &'static str {
    match version {
        "v1" => PREAMBLE_V1,
        _ => PREAMBLE_V2,
    }
}

/// Appended to the next prompt after a malformed reply. Does not consume
/// a turn.
pub fn corrective_directive(reason: &str) -> String {
    format!(
        "CORRECTION: your previous reply could not be parsed ({reason}). \
         Respond again with a single valid JSON object and no surrounding text."
    )
}

/// One-shot directive injected when the agent is stuck on a task with no
/// new facts or ruled-out hypotheses.
pub const FORCED_REFLECTION_DIRECTIVE: &str =
    "FORCED REFLECTION: you have spent many turns on this task without learning \
     anything new. Question your base assumptions: list what you believe and why, \
     identify which belief is least supported by observed facts, and design the \
     next action to test that belief directly. Consider marking this task blocked \
     and attacking the goal from a different angle.";

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tool catalog
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// One tool as shown to the oracle.
#[derive(Debug, Clone)]
pub struct CatalogTool {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Snapshot the registry into prompt-ready catalog entries.
pub fn catalog(registry: &oats_tools::ToolRegistry) -> Vec<CatalogTool> {
    registry
        .list()
        .map(|descriptor| CatalogTool {
            name: descriptor.name.clone(),
            description: descriptor.description.clone(),
            input_schema: descriptor.input_schema.clone(),
        })
        .collect()
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Composition
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct PromptInputs<'a> {
    pub state: &'a AgentState,
    pub tools: &'a [CatalogTool],
    /// 1-based index of the turn about to execute.
    pub turn: u32,
    pub turn_budget: u32,
    /// Corrective / forced-reflection blocks for this turn.
    pub directives: &'a [String],
    /// Character budget for the serialized transcript tail.
    pub transcript_char_budget: usize,
}

/// Compose the turn prompt. Pure: same inputs, same text.
pub fn compose(inputs: &PromptInputs) -> String {
    let mut prompt = String::with_capacity(4096);

    prompt.push_str("## Goal\n");
    prompt.push_str(&inputs.state.goal);
    prompt.push_str("\n\n## Working state\n");
    prompt.push_str(&serialize_state(inputs.state));

    prompt.push_str("\n\n## Transcript\n");
    prompt.push_str(&serialize_transcript(
        inputs.state,
        inputs.transcript_char_budget,
    ));

    prompt.push_str("\n\n## Tools\n");
    for tool in inputs.tools {
        prompt.push_str(&format!(
            "- {}: {} schema={}\n",
            tool.name, tool.description, tool.input_schema
        ));
    }

    prompt.push_str(&format!(
        "\n## Turn\nThis is turn {} of {}.\n",
        inputs.turn, inputs.turn_budget
    ));

    for directive in inputs.directives {
        prompt.push_str("\n");
        prompt.push_str(directive);
        prompt.push('\n');
    }

    prompt
}

/// The state object as the oracle sees it (transcript excluded, it gets
/// its own section).
fn serialize_state(state: &AgentState) -> String {
    let value = json!({
        "tasks": state.tasks,
        "active": state.active,
        "facts": state.facts,
        "ruled_out": state.ruled_out,
        "unknowns": state.unknowns,
        "turn_count": state.turn_count,
    });
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

/// Tail of the transcript, newest entries kept, trimmed to the character
/// budget. An omission marker notes how many earlier turns were dropped.
fn serialize_transcript(state: &AgentState, char_budget: usize) -> String {
    if state.transcript.is_empty() {
        return "(no turns yet)".into();
    }

    let mut kept: Vec<String> = Vec::new();
    let mut used = 0usize;
    for record in state.transcript.iter().rev() {
        let line = serde_json::to_string(record).unwrap_or_default();
        if used + line.len() > char_budget && !kept.is_empty() {
            break;
        }
        used += line.len();
        kept.push(line);
        if used > char_budget {
            break;
        }
    }
    kept.reverse();

    let omitted = state.transcript.len() - kept.len();
    let mut text = String::new();
    if omitted > 0 {
        text.push_str(&format!("({omitted} earlier turns omitted)\n"));
    }
    text.push_str(&kept.join("\n"));
    text
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
