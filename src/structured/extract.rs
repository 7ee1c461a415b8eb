//! Best-effort isolation of a JSON object embedded in model text.
//!
//! This is a heuristic, not a parser. The primary scan is a greedy
//! first-`{`-to-last-`}` match, which mis-extracts when prose after the
//! object also contains braces; in that case a string-aware balanced scan
//! is tried before giving up on validity.

use once_cell::sync::Lazy;
use regex::Regex;

static GREEDY_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("greedy object pattern is valid"));

/// Isolate the JSON object span inside `content`.
///
/// Returns `None` when no brace span exists; callers then keep the content
/// unchanged.
pub fn extract_json_object(content: &str) -> Option<String> {
    if !content.contains('{') || !content.contains('}') {
        return None;
    }
    let greedy = GREEDY_OBJECT.find(content)?.as_str();

    if serde_json::from_str::<serde_json::Value>(greedy).is_ok() {
        return Some(greedy.to_string());
    }

    if let Some(balanced) = balanced_object(content) {
        if serde_json::from_str::<serde_json::Value>(balanced).is_ok() {
            return Some(balanced.to_string());
        }
    }

    Some(greedy.to_string())
}

/// First brace-balanced span starting at the first `{`, ignoring braces
/// inside JSON string literals.
fn balanced_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in content[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    let end = start + offset + ch.len_utf8();
                    return Some(&content[start..end]);
                }
            }
            _ => {}
        }
    }
    None
}
