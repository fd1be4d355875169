//! The finish tool. The reasoning engine intercepts invocations of this
//! tool before dispatch; the handler exists so the tool still behaves
//! sanely if executed directly.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::registry::{FnHandler, ToolDescriptor};
use crate::FINISH_TOOL;

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: FINISH_TOOL.into(),
        version: "1.0.0".into(),
        description: "Complete the investigation. Call this exactly once, with the \
                      root-cause conclusion (or final answer) as `result`."
            .into(),
        input_schema: json!({
            "type": "object",
            "required": ["result"],
            "properties": {
                "result": {"type": "string", "description": "Final conclusion text"}
            }
        }),
        handler: Arc::new(FnHandler(|params: Value| async move {
            Ok(params["result"].as_str().unwrap_or_default().to_owned())
        })),
    }
}

/// Extract the `result` text from finish-tool params.
pub fn result_text(params: &Value) -> String {
    params
        .get("result")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_owned()
}
