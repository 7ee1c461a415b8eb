//! Response assembler: builds the uniform envelope.

use serde_json::Value;

use crate::types::{ResponseEnvelope, TimingSummary, TokenUsage, ToolCallRecord};

/// Build the final envelope. Tool lists are omitted when no tool succeeded.
pub fn assemble_envelope(
    model: &str,
    content: String,
    tokens: TokenUsage,
    tool_calls: Vec<ToolCallRecord>,
    tool_results: Vec<Value>,
    timing: TimingSummary,
) -> ResponseEnvelope {
    ResponseEnvelope {
        content,
        model: model.to_string(),
        tokens,
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        tool_results: (!tool_results.is_empty()).then_some(tool_results),
        timing,
    }
}
