//! Anthropic Messages API 驱动 — 实现 Anthropic 特有的请求/响应格式转换
//!
//! Anthropic Messages API driver. Handles the key differences from OpenAI:
//! - The system prompt is a top-level `system` parameter, not part of `messages`.
//! - Content uses typed blocks: `[{"type": "text", "text": "..."}]`.
//! - Tool invocations are `tool_use` blocks; results are `tool_result` blocks
//!   inside a user turn.
//! - `max_tokens` is required, not optional.
//! - At least one message is required.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, ErrorContext};
use crate::normalize::{CallIdGenerator, SENTINEL_USER_TURN};
use crate::types::{Message, MessageRole, ToolCall, ToolChoice, ToolDefinition};

use super::{output_as_text, ApiStyle, ChatPayload, DriverRequest, DriverResponse, ProviderDriver, UsageInfo};

const DEFAULT_MAX_TOKENS: u32 = 4096;
const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";

/// Anthropic Messages API driver.
#[derive(Debug)]
pub struct AnthropicDriver {
    provider_id: String,
}

impl AnthropicDriver {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }

    fn text_blocks(text: &str) -> Value {
        serde_json::json!([{ "type": "text", "text": text }])
    }

    fn tool_use_block(id: &str, name: &str, input: Value) -> Value {
        serde_json::json!({ "type": "tool_use", "id": id, "name": name, "input": input })
    }

    fn tool_result_turn(id: &str, content: String) -> Value {
        serde_json::json!({
            "role": "user",
            "content": [{ "type": "tool_result", "tool_use_id": id, "content": content }],
        })
    }
}

fn normalize_stop_reason(reason: &str) -> String {
    match reason {
        "end_turn" | "stop_sequence" => "stop".to_string(),
        "max_tokens" => "length".to_string(),
        "tool_use" => "tool_calls".to_string(),
        "refusal" => "content_filter".to_string(),
        other => other.to_string(),
    }
}

impl ProviderDriver for AnthropicDriver {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn api_style(&self) -> ApiStyle {
        ApiStyle::AnthropicMessages
    }

    fn default_base_url(&self) -> &str {
        ANTHROPIC_BASE_URL
    }

    fn call_id_prefix(&self) -> &'static str {
        "toolu"
    }

    fn to_vendor_messages(&self, messages: &[Message], ids: &mut CallIdGenerator) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                if let Some(call) = &m.function_call {
                    let id = ids.invocation_id(&call.name);
                    let mut blocks = Vec::with_capacity(2);
                    if !m.content.trim().is_empty() {
                        blocks.push(serde_json::json!({ "type": "text", "text": m.content }));
                    }
                    blocks.push(Self::tool_use_block(
                        &id,
                        &call.name,
                        call.parsed_arguments(),
                    ));
                    return serde_json::json!({ "role": "assistant", "content": blocks });
                }
                match m.role {
                    MessageRole::Function => {
                        let name = m.name.as_deref().unwrap_or_default();
                        Self::tool_result_turn(&ids.result_id(name), m.content.clone())
                    }
                    MessageRole::Assistant => serde_json::json!({
                        "role": "assistant",
                        "content": Self::text_blocks(&m.content),
                    }),
                    MessageRole::User | MessageRole::System => serde_json::json!({
                        "role": "user",
                        "content": Self::text_blocks(&m.content),
                    }),
                }
            })
            .collect()
    }

    fn format_tool(&self, tool: &ToolDefinition) -> Value {
        serde_json::json!({
            "name": tool.id,
            "description": tool.description,
            "input_schema": tool.parameters,
        })
    }

    fn encode_tool_choice(&self, choice: &ToolChoice) -> Option<Value> {
        match choice {
            ToolChoice::Auto => Some(serde_json::json!({ "type": "auto" })),
            ToolChoice::None => Some(serde_json::json!({ "type": "none" })),
            forced => forced
                .forced_tool()
                .map(|name| serde_json::json!({ "type": "tool", "name": name })),
        }
    }

    fn build_request(
        &self,
        payload: &ChatPayload<'_>,
        api_key: &str,
        base_url: &str,
    ) -> Result<DriverRequest, Error> {
        let messages: Vec<Value> = if payload.messages.is_empty() {
            vec![serde_json::json!({
                "role": "user",
                "content": Self::text_blocks(SENTINEL_USER_TURN),
            })]
        } else {
            payload.messages.to_vec()
        };

        let mut body = serde_json::json!({
            "model": payload.model,
            "messages": messages,
            "max_tokens": payload.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        });

        if let Some(sys) = payload.system {
            body["system"] = Value::String(sys.to_string());
        }
        if let Some(t) = payload.temperature {
            body["temperature"] = serde_json::json!(t);
        }
        if !payload.tools.is_empty() {
            body["tools"] = Value::Array(payload.tools.to_vec());
            if let Some(tc) = self.encode_tool_choice(payload.tool_choice) {
                body["tool_choice"] = tc;
            }
        }

        let mut headers = HashMap::new();
        headers.insert("x-api-key".into(), api_key.to_string());
        headers.insert("anthropic-version".into(), ANTHROPIC_VERSION.into());

        Ok(DriverRequest {
            url: format!("{}/messages", base_url.trim_end_matches('/')),
            headers,
            body,
        })
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, Error> {
        // { content: [{type: "text"|"tool_use", ...}], stop_reason, usage }
        let blocks = body.get("content").and_then(|c| c.as_array()).ok_or_else(|| {
            Error::runtime_with_context(
                "Response has no content array",
                ErrorContext::new().with_source("anthropic_driver"),
            )
        })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        for block in blocks {
            match block.get("type").and_then(|t| t.as_str()) {
                Some("text") => {
                    if let Some(t) = block.get("text").and_then(|t| t.as_str()) {
                        text.push_str(t);
                    }
                }
                Some("tool_use") => {
                    let Some(name) = block.get("name").and_then(|n| n.as_str()) else {
                        continue;
                    };
                    tool_calls.push(ToolCall {
                        id: block["id"].as_str().unwrap_or_default().to_string(),
                        name: name.to_string(),
                        arguments: block.get("input").cloned().unwrap_or_else(|| serde_json::json!({})),
                    });
                }
                _ => {}
            }
        }

        let finish_reason = body
            .get("stop_reason")
            .and_then(|v| v.as_str())
            .map(normalize_stop_reason);

        let usage = body.get("usage").map(|u| {
            let input = u["input_tokens"].as_u64().unwrap_or(0);
            let output = u["output_tokens"].as_u64().unwrap_or(0);
            UsageInfo {
                prompt_tokens: input,
                completion_tokens: output,
                total_tokens: input.saturating_add(output),
            }
        });

        Ok(DriverResponse {
            content: if text.is_empty() { None } else { Some(text) },
            finish_reason,
            usage,
            tool_calls,
        })
    }

    fn tool_exchange_messages(
        &self,
        call_id: &str,
        name: &str,
        arguments: &Map<String, Value>,
        output: &Value,
    ) -> Vec<Value> {
        vec![
            serde_json::json!({
                "role": "assistant",
                "content": [Self::tool_use_block(call_id, name, Value::Object(arguments.clone()))],
            }),
            Self::tool_result_turn(call_id, output_as_text(output)),
        ]
    }
}
