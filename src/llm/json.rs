//! Helpers for parsing JSON out of LLM responses.
//!
//! Models occasionally wrap JSON in markdown code fences even when told not
//! to, so callers should always strip fences before parsing.

use serde_json::Value;

/// Extract a JSON block from a string, handling optional markdown code fences.
pub fn extract_json_block(s: &str) -> &str {
    let trimmed = s.trim();

    // Try to extract from ```json ... ``` or ``` ... ```
    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        // Skip optional language tag (e.g. "json")
        let content_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
        let content = &after_fence[content_start..];
        if let Some(end) = content.find("```") {
            return content[..end].trim();
        }
    }

    // No fences, return as-is
    trimmed
}

/// Parse an LLM response as a JSON value, stripping markdown fences first.
///
/// Returns `None` if the payload is not valid JSON.
pub fn parse_json_response(raw: &str) -> Option<Value> {
    serde_json::from_str(extract_json_block(raw)).ok()
}
