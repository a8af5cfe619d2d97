//! Deliberative inquiry core.
//!
//! This module provides the pieces the MCP tools are built from:
//! - [`InquiryNode`]: the sub-question tree, its parser and traversals
//! - [`generate_perspective_responses`]: per-node multi-perspective answers
//! - [`ReasoningLog`]: the append-only record of one session
//! - [`BalanceScore`]: the epistemic balance heuristic
//! - [`render_html`]: the HTML report
//! - [`InquiryPipeline`]: the stages wired to a [`CompletionClient`]

mod completion;
mod metrics;
mod perspectives;
mod pipeline;
mod report;
mod score;
mod tracker;
mod tree;

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;

pub use completion::*;
pub use metrics::*;
pub use perspectives::*;
pub use pipeline::*;
pub use report::*;
pub use score::*;
pub use tracker::*;
pub use tree::*;

use tracing::warn;

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Attempts extraction in this order:
/// 1. Raw JSON (fast path)
/// 2. ```json ... ``` code blocks
/// 3. ``` ... ``` code blocks
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

/// Serialize a value to JSON for logging, with warning on failure.
pub(crate) fn serialize_for_log<T: serde::Serialize>(
    value: &T,
    context: &str,
) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(
            error = %e,
            context = %context,
            "Failed to serialize value for reasoning log"
        );
        serde_json::json!({
            "serialization_error": e.to_string(),
            "context": context
        })
    })
}

/// Escape text for inclusion in HTML element content or attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
