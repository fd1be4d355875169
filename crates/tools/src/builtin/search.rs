//! Search files under a root for a regex pattern. Output is grep-style
//! `path:line:text`, which the funnel knows how to summarize into match
//! and file counts.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::registry::{ToolDescriptor, ToolHandler};

/// Results are capped so a broad pattern cannot flood the funnel's spill
/// file with the whole filesystem.
const MAX_RESULTS: usize = 1000;
const MAX_LINE_CHARS: usize = 400;

#[derive(Debug, Deserialize)]
struct SearchParams {
    pattern: String,
    path: String,
    #[serde(default)]
    max_results: Option<usize>,
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: "search_files".into(),
        version: "1.0.0".into(),
        description: "Search files under a directory for a regex pattern. \
                      Returns grep-style path:line:text matches."
            .into(),
        input_schema: json!({
            "type": "object",
            "required": ["pattern", "path"],
            "properties": {
                "pattern": {"type": "string", "description": "Regular expression"},
                "path": {"type": "string", "description": "File or directory root"},
                "max_results": {"type": "integer", "minimum": 1}
            }
        }),
        handler: Arc::new(SearchHandler),
    }
}

struct SearchHandler;

impl ToolHandler for SearchHandler {
    fn call(
        &self,
        params: Value,
    ) -> Pin<Box<dyn Future<Output = Result<String, String>> + Send + '_>> {
        Box::pin(async move {
            let params: SearchParams =
                serde_json::from_value(params).map_err(|e| format!("bad parameters: {e}"))?;
            let pattern = regex::Regex::new(&params.pattern)
                .map_err(|e| format!("invalid pattern: {e}"))?;
            let cap = params.max_results.unwrap_or(MAX_RESULTS).min(MAX_RESULTS);

            // File walking is blocking work; keep it off the runtime.
            let root = params.path.clone();
            tokio::task::spawn_blocking(move || search(Path::new(&root), &pattern, cap))
                .await
                .map_err(|e| format!("search task failed: {e}"))?
        })
    }
}

fn search(root: &Path, pattern: &regex::Regex, cap: usize) -> Result<String, String> {
    if !root.exists() {
        return Err(format!("path '{}' does not exist", root.display()));
    }

    let mut matches = Vec::new();
    let mut truncated = false;
    let mut stack = vec![root.to_path_buf()];

    while let Some(current) = stack.pop() {
        if matches.len() >= cap {
            truncated = true;
            break;
        }
        if current.is_dir() {
            let entries = match std::fs::read_dir(&current) {
                Ok(entries) => entries,
                Err(_) => continue,
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                // Skip dotfiles and dot-directories.
                if name.to_string_lossy().starts_with('.') {
                    continue;
                }
                stack.push(entry.path());
            }
            continue;
        }

        let content = match std::fs::read_to_string(&current) {
            Ok(content) => content,
            // Binary or unreadable files are skipped silently.
            Err(_) => continue,
        };
        for (lineno, line) in content.lines().enumerate() {
            if pattern.is_match(line) {
                let mut shown = line.trim_end().to_owned();
                if shown.chars().count() > MAX_LINE_CHARS {
                    shown = shown.chars().take(MAX_LINE_CHARS).collect();
                }
                matches.push(format!("{}:{}:{}", current.display(), lineno + 1, shown));
                if matches.len() >= cap {
                    truncated = true;
                    break;
                }
            }
        }
    }

    if matches.is_empty() {
        return Ok("no matches".into());
    }
    let mut output = matches.join("\n");
    if truncated {
        output.push_str(&format!("\n[results capped at {cap}]"));
    }
    Ok(output)
}
