//! Oracle reply parsing.
//!
//! The oracle is contracted to return a single JSON object in one of two
//! shapes: the four-section `reflect`/`strategize`/`state`/`act` form, or
//! the legacy `thought`/`action` form. Both are accepted; when a reply
//! carries both, [`ReplyPrecedence`] decides which wins. Malformed
//! replies come back as [`ParseOutcome::Malformed`] so the loop can
//! soft-retry with a corrective directive instead of crashing.

use serde::Deserialize;
use serde_json::Value;

use oats_domain::agent::TaskRecord;
use oats_domain::config::ReplyPrecedence;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parsed reply types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The tool invocation the oracle chose for this turn.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionCall {
    pub tool: String,
    #[serde(default)]
    pub params: Value,
}

/// The oracle's proposed revision of the agent state. Every section is
/// optional; merge rules decide what is accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProposedState {
    #[serde(default)]
    pub tasks: Option<Vec<TaskRecord>>,
    #[serde(default)]
    pub active: Option<ProposedActive>,
    #[serde(default)]
    pub facts: Option<Vec<String>>,
    #[serde(default)]
    pub ruled_out: Option<Vec<String>>,
    #[serde(default)]
    pub unknowns: Option<Vec<String>>,
}

/// Active-task metadata as proposed. Archetype and phase stay raw
/// strings here; the merge step validates them against the enumerated
/// sets and downgrades violations to warnings.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposedActive {
    pub id: String,
    #[serde(default)]
    pub archetype: Option<String>,
    #[serde(default)]
    pub phase: Option<String>,
}

/// One successfully parsed turn reply.
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// Unified reasoning text: `reflect` + `strategize` joined, or the
    /// legacy `thought`.
    pub thought: String,
    pub proposed_state: Option<ProposedState>,
    pub act: ActionCall,
}

/// Parse result. Malformed replies carry the reason handed back to the
/// oracle in the corrective directive.
#[derive(Debug)]
pub enum ParseOutcome {
    Reply(TurnReply),
    Malformed(String),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Parsing
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Parse one oracle reply.
pub fn parse_reply(content: &str, precedence: ReplyPrecedence) -> ParseOutcome {
    let json_text = match extract_json_object(content) {
        Some(text) => text,
        None => return ParseOutcome::Malformed("no JSON object found in reply".into()),
    };
    let root: Value = match serde_json::from_str(json_text) {
        Ok(value) => value,
        Err(e) => return ParseOutcome::Malformed(format!("invalid JSON: {e}")),
    };
    let obj = match root.as_object() {
        Some(obj) => obj,
        None => return ParseOutcome::Malformed("reply is not a JSON object".into()),
    };

    let has_structured = obj.contains_key("act");
    let has_legacy = obj.contains_key("action");

    let use_structured = match (has_structured, has_legacy) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => precedence == ReplyPrecedence::Structured,
        (false, false) => {
            return ParseOutcome::Malformed(
                "reply has neither an 'act' nor an 'action' section".into(),
            )
        }
    };

    let act_value = if use_structured { &obj["act"] } else { &obj["action"] };
    let act: ActionCall = match serde_json::from_value(act_value.clone()) {
        Ok(act) => act,
        Err(e) => return ParseOutcome::Malformed(format!("bad action section: {e}")),
    };
    if act.tool.is_empty() {
        return ParseOutcome::Malformed("action has an empty tool name".into());
    }

    let thought = if use_structured {
        let reflect = obj.get("reflect").and_then(|v| v.as_str()).unwrap_or("");
        let strategize = obj.get("strategize").and_then(|v| v.as_str()).unwrap_or("");
        match (reflect.is_empty(), strategize.is_empty()) {
            (false, false) => format!("{reflect}\n\n{strategize}"),
            (false, true) => reflect.to_owned(),
            (true, false) => strategize.to_owned(),
            (true, true) => String::new(),
        }
    } else {
        obj.get("thought")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_owned()
    };

    let proposed_state = obj
        .get("state")
        .and_then(|value| serde_json::from_value::<ProposedState>(value.clone()).ok());

    ParseOutcome::Reply(TurnReply {
        thought,
        proposed_state,
        act,
    })
}

/// Pull the JSON object out of a reply that may be wrapped in code
/// fences or surrounded by prose: everything from the first `{` to the
/// last `}`.
fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    (end > start).then(|| &content[start..=end])
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
