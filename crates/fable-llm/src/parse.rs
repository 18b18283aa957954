//! LLM response parsing into typed turn output.
//!
//! The model returns raw text that is ideally JSON. This module extracts a
//! [`TurnOutput`] through multiple recovery strategies before the caller
//! falls back to the one-shot repair protocol.

use fable_types::TurnOutput;
use tracing::warn;

use crate::error::LlmError;

/// Parse a response string into a [`TurnOutput`].
///
/// Recovery strategies, in order:
/// 1. Direct `serde_json` deserialization
/// 2. Extract JSON from a markdown code block
/// 3. Slice the first `{` to the last `}` and retry
/// 4. Strip trailing commas from each of the above and retry
///
/// All failures surface as [`LlmError::Parse`]; the caller decides whether
/// to run the repair round-trip.
pub fn parse_turn_output(raw: &str) -> Result<TurnOutput, LlmError> {
    let trimmed = raw.trim();

    if let Ok(output) = serde_json::from_str::<TurnOutput>(trimmed) {
        return Ok(output);
    }

    if let Some(block) = extract_json_from_codeblock(trimmed) {
        if let Ok(output) = serde_json::from_str::<TurnOutput>(block) {
            return Ok(output);
        }
        let cleaned = strip_trailing_commas(block);
        if let Ok(output) = serde_json::from_str::<TurnOutput>(&cleaned) {
            return Ok(output);
        }
    }

    if let Some(slice) = extract_json_object(trimmed) {
        if let Ok(output) = serde_json::from_str::<TurnOutput>(slice) {
            return Ok(output);
        }
        let cleaned = strip_trailing_commas(slice);
        if let Ok(output) = serde_json::from_str::<TurnOutput>(&cleaned) {
            return Ok(output);
        }
    }

    let cleaned = strip_trailing_commas(trimmed);
    match serde_json::from_str::<TurnOutput>(&cleaned) {
        Ok(output) => Ok(output),
        Err(e) => {
            warn!(error = %e, "all parse strategies failed for turn output");
            Err(LlmError::Parse(format!("all parse strategies failed: {e}")))
        }
    }
}

/// Extract the contents of the first markdown code block, if any.
fn extract_json_from_codeblock(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n')? + 1;
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Slice from the first `{` to the last `}` inclusive.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    text.get(start..=end)
}

/// Remove trailing commas before `}` or `]`, outside of strings.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = text.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next_meaningful = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if matches!(next_meaningful, Some('}' | ']')) {
                    // Drop the trailing comma.
                } else {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

/// Truncate text for error previews.
pub fn truncate_preview(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(limit).collect();
    out.push_str("...");
    out
}
