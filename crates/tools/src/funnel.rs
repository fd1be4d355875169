//! Observation Funnel — the three-layer treatment for oversized tool
//! outputs.
//!
//! Layer 1 spills the full payload to the worker's scratch directory.
//! Layer 2 computes counts and a head-and-tail preview. Layer 3 prefixes
//! the preview with a marker and the spill path; the engine's preamble
//! documents the contract so the agent streams the file instead of
//! re-reading it whole.

use std::path::Path;

use sha2::{Digest, Sha256};

use oats_domain::config::FunnelConfig;
use oats_domain::tool::ObservationSummary;

/// Marker prefixed to every funneled observation.
pub const LARGE_OUTPUT_MARKER: &str = "LARGE OUTPUT DETECTED";

/// Maximum characters of one preview line before it is elided.
const PREVIEW_LINE_CAP: usize = 500;

/// Whether an output exceeds either funnel threshold. Output at exactly
/// the thresholds passes through untouched.
pub fn needs_funnel(config: &FunnelConfig, output: &str) -> bool {
    output.lines().count() > config.max_lines || output.chars().count() > config.max_chars
}

/// Apply the funnel: spill `output` to `scratch_dir` and return the
/// guidance text plus the summary. `Err` carries the spill I/O failure
/// message (the executor turns it into a failure result).
pub fn process(
    config: &FunnelConfig,
    scratch_dir: &Path,
    tool_name: &str,
    output: &str,
) -> Result<(String, ObservationSummary), String> {
    let total_lines = output.lines().count();
    let total_chars = output.chars().count();

    // Layer 1 — spill.
    let path = scratch_dir.join(spill_file_name(tool_name, output));
    std::fs::write(&path, output)
        .map_err(|e| format!("failed to spill output to '{}': {e}", path.display()))?;
    let full_output_path = path.display().to_string();

    // Layer 2 — summarize.
    let (total_matches, files_with_matches) = if is_search_like(tool_name) {
        search_stats(output)
    } else {
        (None, None)
    };
    let preview = build_preview(config, output, total_lines);

    let summary = ObservationSummary {
        total_lines,
        total_chars,
        total_matches,
        files_with_matches,
        full_output_path: full_output_path.clone(),
        preview: preview.clone(),
    };

    // Layer 3 — guidance.
    let mut guidance = format!(
        "{LARGE_OUTPUT_MARKER}: {total_lines} lines / {total_chars} chars.\n\
         Full output saved to: {full_output_path}\n"
    );
    if let Some(matches) = total_matches {
        let files = files_with_matches.unwrap_or(0);
        guidance.push_str(&format!("{matches} matches across {files} files.\n"));
    }
    guidance.push_str(
        "Use read_file or shell (grep/head/tail) on that path instead of re-running the tool.\n---\n",
    );
    guidance.push_str(&preview);

    Ok((guidance, summary))
}

/// `<tool>_<timestamp>_<short-hash>.txt`
fn spill_file_name(tool_name: &str, output: &str) -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%S%3f");
    let digest = Sha256::digest(output.as_bytes());
    let short_hash: String = digest.iter().take(4).map(|b| format!("{b:02x}")).collect();
    format!("{tool_name}_{timestamp}_{short_hash}.txt")
}

/// First `preview_head` lines, a truncation marker, and the last
/// `preview_tail` lines. Overlong individual lines are elided so a
/// single-line megabyte payload cannot defeat the funnel.
fn build_preview(config: &FunnelConfig, output: &str, total_lines: usize) -> String {
    let cap_line = |line: &str| -> String {
        if line.chars().count() > PREVIEW_LINE_CAP {
            let kept: String = line.chars().take(PREVIEW_LINE_CAP).collect();
            format!("{kept} [line truncated]")
        } else {
            line.to_owned()
        }
    };

    let lines: Vec<&str> = output.lines().collect();
    if total_lines <= config.preview_head + config.preview_tail {
        return lines.iter().map(|l| cap_line(l)).collect::<Vec<_>>().join("\n");
    }

    let omitted = total_lines - config.preview_head - config.preview_tail;
    let mut preview: Vec<String> = lines[..config.preview_head]
        .iter()
        .map(|l| cap_line(l))
        .collect();
    preview.push(format!("... ({omitted} lines truncated) ..."));
    preview.extend(lines[total_lines - config.preview_tail..].iter().map(|l| cap_line(l)));
    preview.join("\n")
}

fn is_search_like(tool_name: &str) -> bool {
    tool_name.contains("search") || tool_name.contains("grep") || tool_name.contains("find")
}

/// Best-effort parse of grep-style `path:line:text` output.
fn search_stats(output: &str) -> (Option<usize>, Option<usize>) {
    let mut matches = 0usize;
    let mut files = std::collections::HashSet::new();
    for line in output.lines() {
        if let Some((path, rest)) = line.split_once(':') {
            let looks_like_match = rest
                .split_once(':')
                .is_some_and(|(lineno, _)| lineno.chars().all(|c| c.is_ascii_digit()) && !lineno.is_empty());
            if looks_like_match {
                matches += 1;
                files.insert(path.to_owned());
            }
        }
    }
    if matches == 0 {
        (None, None)
    } else {
        (Some(matches), Some(files.len()))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
