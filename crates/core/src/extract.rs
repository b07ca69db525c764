//! Recovery of JSON arrays from noisy model responses.
//!
//! Chat models are asked to answer with a bare JSON array but frequently
//! wrap it in a fenced code block, prepend commentary, or emit a draft
//! array followed by a corrected one. [`extract_json_array`] returns the
//! last well-formed top-level array in the text.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Opening fence such as "```json" at the very start of a response.
static OPENING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^`{3,}[A-Za-z0-9_-]*[ \t]*\r?\n?").expect("valid regex"));

/// Closing fence at the very end of a response.
static CLOSING_FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r?\n?`{3,}$").expect("valid regex"));

/// Errors returned by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExtractError {
    #[error("No valid JSON array found in model response")]
    NoArray,
}

/// Return the last syntactically valid top-level JSON array in `text`.
///
/// The returned slice borrows from `text` and has no surrounding
/// whitespace, so running the extractor on its own output returns the
/// same string.
pub fn extract_json_array(text: &str) -> Result<&str, ExtractError> {
    let body = strip_fences(text);

    let mut last = None;
    let mut pos = 0;
    while let Some(offset) = body[pos..].find('[') {
        let start = pos + offset;
        match array_len_at(&body[start..]) {
            Some(len) => {
                last = Some(&body[start..start + len]);
                // Skip past the whole array so nested arrays are not
                // reported on their own.
                pos = start + len;
            }
            None => pos = start + 1,
        }
    }

    last.ok_or(ExtractError::NoArray)
}

/// Extract the last array and decode it as a list of strings.
///
/// String elements are returned verbatim; any other element is rendered
/// as compact JSON so that one odd entry does not sink the whole list.
pub fn parse_string_array(text: &str) -> Result<Vec<String>, ExtractError> {
    let array = extract_json_array(text)?;
    let items = match serde_json::from_str::<Value>(array) {
        Ok(Value::Array(items)) => items,
        _ => return Err(ExtractError::NoArray),
    };

    Ok(items
        .into_iter()
        .map(|item| match item {
            Value::String(s) => s,
            other => other.to_string(),
        })
        .collect())
}

/// Trim whitespace and a leading/trailing Markdown code fence.
fn strip_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let start = OPENING_FENCE_RE
        .find(trimmed)
        .map(|m| m.end())
        .unwrap_or(0);
    let rest = &trimmed[start..];
    let end = CLOSING_FENCE_RE
        .find(rest)
        .map(|m| m.start())
        .unwrap_or(rest.len());
    rest[..end].trim()
}

/// If a JSON array starts at the beginning of `s`, return its byte length.
fn array_len_at(s: &str) -> Option<usize> {
    let mut stream = serde_json::Deserializer::from_str(s).into_iter::<Value>();
    match stream.next() {
        Some(Ok(Value::Array(_))) => Some(stream.byte_offset()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
