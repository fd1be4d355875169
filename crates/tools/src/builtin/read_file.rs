//! Read a file, optionally windowed by line offset and limit. The main
//! consumer is the funnel contract: after a spill, the agent reads the
//! spilled file in slices instead of replaying the tool.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::registry::{ToolDescriptor, ToolHandler};

#[derive(Debug, Deserialize)]
struct ReadFileParams {
    path: String,
    /// Line number to start from (0-indexed).
    #[serde(default)]
    offset: Option<usize>,
    /// Maximum number of lines to return.
    #[serde(default)]
    limit: Option<usize>,
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "read_file".into(),
        version: "1.0.0".into(),
        description: "Read a file. Use offset/limit to read a window of a large file \
                      (for example a spilled tool output)."
            .into(),
        input_schema: json!({
            "type": "object",
            "required": ["path"],
            "properties": {
                "path": {"type": "string"},
                "offset": {"type": "integer", "minimum": 0},
                "limit": {"type": "integer", "minimum": 1}
            }
        }),
        handler: Arc::new(ReadFileHandler),
    }
}

struct ReadFileHandler;

impl ToolHandler for ReadFileHandler {
    fn call(
        &self,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + '_>> {
        Box::pin(async move {
            let params: ReadFileParams =
                serde_json::from_value(params).map_err(|e| format!("bad parameters: {e}"))?;

            let content = tokio::fs::read_to_string(&params.path)
                .await
                .map_err(|e| format!("cannot read '{}': {e}", params.path))?;

            match (params.offset, params.limit) {
                (None, None) => Ok(content),
                (offset, limit) => {
                    let offset = offset.unwrap_or(0);
                    let window: Vec<&str> = match limit {
                        Some(limit) => content.lines().skip(offset).take(limit).collect(),
                        None => content.lines().skip(offset).collect(),
                    };
                    Ok(window.join("\n"))
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(params: Value) -> Result<String, String> {
        ReadFileHandler.call(params).await
    }

    #[tokio::test]
    async fn reads_whole_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "a\nb\nc\n").unwrap();
        let out = read(json!({"path": path.display().to_string()})).await.unwrap();
        assert_eq!(out, "a\nb\nc\n");
    }

    #[tokio::test]
    async fn windows_by_offset_and_limit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("f.txt");
        std::fs::write(&path, "0\n1\n2\n3\n4\n").unwrap();
        let out = read(json!({
            "path": path.display().to_string(),
            "offset": 1,
            "limit": 2
        }))
        .await
        .unwrap();
        assert_eq!(out, "1\n2");
    }

    #[tokio::test]
    async fn missing_file_is_a_handler_error() {
        let err = read(json!({"path": "/no/such/file"})).await.unwrap_err();
        assert!(err.contains("cannot read"));
    }
}
