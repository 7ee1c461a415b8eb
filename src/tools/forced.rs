//! Forced-tool tracking across loop iterations.

use crate::types::{ToolCall, ToolChoice};

/// Outcome of [`track_forced_tool_usage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForcedToolUsage {
    /// The tool forced for this response was actually invoked.
    pub has_used_forced_tool: bool,
    /// Forced tools used so far, in the order they fired.
    pub used_forced_tools: Vec<String>,
    /// Directive for the next vendor call.
    pub next_choice: ToolChoice,
}

/// Decide whether the active forced tool fired and what to force next.
///
/// `choice` must be the directive that was in effect for the response that
/// produced `tool_calls`. Pure: the caller keeps `used_forced_tools` between
/// iterations and passes it back as `already_used`.
pub fn track_forced_tool_usage(
    tool_calls: &[ToolCall],
    choice: &ToolChoice,
    forced_tools: &[String],
    already_used: &[String],
) -> ForcedToolUsage {
    let mut used: Vec<String> = already_used.to_vec();

    let Some(active) = choice.forced_tool() else {
        return ForcedToolUsage {
            has_used_forced_tool: false,
            used_forced_tools: used,
            next_choice: choice.clone(),
        };
    };

    if !tool_calls.iter().any(|call| call.name == active) {
        return ForcedToolUsage {
            has_used_forced_tool: false,
            used_forced_tools: used,
            next_choice: choice.clone(),
        };
    }

    if !used.iter().any(|u| u == active) {
        used.push(active.to_string());
    }

    let next_choice = match choice {
        ToolChoice::Sequence(pending) => {
            // Fall back to the directive's own order when no list was supplied.
            let order: &[String] = if forced_tools.is_empty() {
                pending
            } else {
                forced_tools
            };
            let remaining: Vec<String> = order
                .iter()
                .filter(|id| !used.contains(id))
                .cloned()
                .collect();
            if remaining.is_empty() {
                ToolChoice::Auto
            } else {
                ToolChoice::Sequence(remaining)
            }
        }
        _ => ToolChoice::Auto,
    };

    ForcedToolUsage {
        has_used_forced_tool: true,
        used_forced_tools: used,
        next_choice,
    }
}
