//! Tool-usage policy: turns per-tool usage constraints into the tool set
//! sent to the vendor and the initial tool-choice directive.

use tracing::warn;

use crate::types::{ToolChoice, ToolDefinition, UsageControl};

/// Tools and directive for the first vendor call.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTools {
    /// Tools the model may see; `UsageControl::None` tools are removed.
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: ToolChoice,
    /// Forced tool ids in declaration order.
    pub forced_tools: Vec<String>,
}

/// Filter tools and derive the initial directive.
///
/// - one forced tool → `ToolChoice::Tool`
/// - several forced tools → `ToolChoice::Sequence` in declaration order
/// - otherwise the caller's directive, or `Auto`
pub fn prepare_tools(tools: &[ToolDefinition], requested: Option<&ToolChoice>) -> PreparedTools {
    let available: Vec<ToolDefinition> = tools
        .iter()
        .filter(|t| t.usage_control != UsageControl::None)
        .cloned()
        .collect();

    let forced_tools: Vec<String> = available
        .iter()
        .filter(|t| t.usage_control == UsageControl::Force)
        .map(|t| t.id.clone())
        .collect();

    let tool_choice = match forced_tools.len() {
        0 => requested
            .map(|choice| sanitize_requested(choice, &available))
            .unwrap_or_default(),
        1 => ToolChoice::Tool(forced_tools[0].clone()),
        _ => ToolChoice::Sequence(forced_tools.clone()),
    };

    PreparedTools {
        tools: available,
        tool_choice,
        forced_tools,
    }
}

/// A caller directive may only force tools that are actually offered.
fn sanitize_requested(choice: &ToolChoice, available: &[ToolDefinition]) -> ToolChoice {
    let offered = |id: &str| available.iter().any(|t| t.id == id);
    match choice {
        ToolChoice::Tool(id) if !offered(id) => {
            warn!(tool = id.as_str(), "requested tool_choice names an unavailable tool, using auto");
            ToolChoice::Auto
        }
        ToolChoice::Sequence(ids) => {
            let kept: Vec<String> = ids.iter().filter(|id| offered(id)).cloned().collect();
            if kept.is_empty() {
                ToolChoice::Auto
            } else {
                ToolChoice::Sequence(kept)
            }
        }
        other => other.clone(),
    }
}
