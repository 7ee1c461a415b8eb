//! Gemini Generate API 驱动 — 实现 Google Gemini 特有的请求/响应格式转换
//!
//! Google Gemini generateContent API driver. Key differences:
//! - Uses `contents` instead of `messages`, with `parts` instead of `content`.
//! - Roles: `user` and `model` (not `assistant`). System uses `system_instruction`.
//! - `generationConfig` wraps temperature, max_tokens (→ `maxOutputTokens`), etc.
//! - Tools are grouped under one `functionDeclarations` entry; the directive
//!   lives in `toolConfig.functionCallingConfig`.
//! - Function results must be JSON objects.
//! - The model name is part of the URL path.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, ErrorContext};
use crate::normalize::{CallIdGenerator, SENTINEL_USER_TURN};
use crate::types::{Message, MessageRole, ToolCall, ToolChoice, ToolDefinition};

use super::{ApiStyle, ChatPayload, DriverRequest, DriverResponse, ProviderDriver, UsageInfo};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Schema keywords the Gemini function-declaration schema rejects.
const UNSUPPORTED_SCHEMA_KEYS: &[&str] = &["$schema", "additionalProperties"];

/// Google Gemini generateContent API driver.
#[derive(Debug)]
pub struct GeminiDriver {
    provider_id: String,
}

impl GeminiDriver {
    pub fn new(provider_id: impl Into<String>) -> Self {
        Self {
            provider_id: provider_id.into(),
        }
    }

    fn function_call_part(id: &str, name: &str, args: Value) -> Value {
        serde_json::json!({ "functionCall": { "id": id, "name": name, "args": args } })
    }

    fn function_response_part(id: &str, name: &str, response: Value) -> Value {
        serde_json::json!({
            "functionResponse": { "id": id, "name": name, "response": response }
        })
    }

    /// Function responses must be objects; anything else is wrapped.
    fn response_object(output: &Value) -> Value {
        match output {
            Value::Object(_) => output.clone(),
            Value::String(s) => match serde_json::from_str::<Value>(s) {
                Ok(parsed @ Value::Object(_)) => parsed,
                _ => serde_json::json!({ "content": s }),
            },
            other => serde_json::json!({ "content": other }),
        }
    }
}

fn strip_unsupported_schema_keys(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| !UNSUPPORTED_SCHEMA_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), strip_unsupported_schema_keys(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_unsupported_schema_keys).collect()),
        other => other.clone(),
    }
}

fn normalize_finish_reason(reason: &str) -> String {
    match reason {
        "STOP" => "stop".to_string(),
        "MAX_TOKENS" => "length".to_string(),
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" => "content_filter".to_string(),
        other => other.to_lowercase(),
    }
}

impl ProviderDriver for GeminiDriver {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn api_style(&self) -> ApiStyle {
        ApiStyle::GeminiGenerate
    }

    fn default_base_url(&self) -> &str {
        GEMINI_BASE_URL
    }

    fn to_vendor_messages(&self, messages: &[Message], ids: &mut CallIdGenerator) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                if let Some(call) = &m.function_call {
                    let id = ids.invocation_id(&call.name);
                    let mut parts = Vec::with_capacity(2);
                    if !m.content.trim().is_empty() {
                        parts.push(serde_json::json!({ "text": m.content }));
                    }
                    parts.push(Self::function_call_part(
                        &id,
                        &call.name,
                        call.parsed_arguments(),
                    ));
                    return serde_json::json!({ "role": "model", "parts": parts });
                }
                match m.role {
                    MessageRole::Function => {
                        let name = m.name.as_deref().unwrap_or_default();
                        let id = ids.result_id(name);
                        let response = Self::response_object(&Value::String(m.content.clone()));
                        serde_json::json!({
                            "role": "user",
                            "parts": [Self::function_response_part(&id, name, response)],
                        })
                    }
                    MessageRole::Assistant => {
                        serde_json::json!({ "role": "model", "parts": [{ "text": m.content }] })
                    }
                    MessageRole::User | MessageRole::System => {
                        serde_json::json!({ "role": "user", "parts": [{ "text": m.content }] })
                    }
                }
            })
            .collect()
    }

    fn format_tool(&self, tool: &ToolDefinition) -> Value {
        serde_json::json!({
            "name": tool.id,
            "description": tool.description,
            "parameters": strip_unsupported_schema_keys(&tool.parameters),
        })
    }

    fn encode_tool_choice(&self, choice: &ToolChoice) -> Option<Value> {
        let config = match choice {
            ToolChoice::Auto => serde_json::json!({ "mode": "AUTO" }),
            ToolChoice::None => serde_json::json!({ "mode": "NONE" }),
            forced => {
                let name = forced.forced_tool()?;
                serde_json::json!({ "mode": "ANY", "allowedFunctionNames": [name] })
            }
        };
        Some(serde_json::json!({ "functionCallingConfig": config }))
    }

    fn build_request(
        &self,
        payload: &ChatPayload<'_>,
        api_key: &str,
        base_url: &str,
    ) -> Result<DriverRequest, Error> {
        let contents: Vec<Value> = if payload.messages.is_empty() {
            vec![serde_json::json!({
                "role": "user",
                "parts": [{ "text": SENTINEL_USER_TURN }],
            })]
        } else {
            payload.messages.to_vec()
        };

        let mut body = serde_json::json!({
            "contents": contents,
        });

        if let Some(sys) = payload.system {
            body["system_instruction"] = serde_json::json!({ "parts": [{ "text": sys }] });
        }

        // Gemini uses `generationConfig` for parameters
        let mut gen_config = serde_json::json!({});
        if let Some(t) = payload.temperature {
            gen_config["temperature"] = serde_json::json!(t);
        }
        if let Some(mt) = payload.max_tokens {
            gen_config["maxOutputTokens"] = serde_json::json!(mt);
        }
        if gen_config != serde_json::json!({}) {
            body["generationConfig"] = gen_config;
        }

        if !payload.tools.is_empty() {
            body["tools"] = serde_json::json!([{ "functionDeclarations": payload.tools }]);
            if let Some(tc) = self.encode_tool_choice(payload.tool_choice) {
                body["toolConfig"] = tc;
            }
        }

        let mut headers = HashMap::new();
        headers.insert("x-goog-api-key".into(), api_key.to_string());

        Ok(DriverRequest {
            url: format!(
                "{}/models/{}:generateContent",
                base_url.trim_end_matches('/'),
                payload.model
            ),
            headers,
            body,
        })
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, Error> {
        let candidate = body.pointer("/candidates/0").ok_or_else(|| {
            Error::runtime_with_context(
                "Response has no candidates",
                ErrorContext::new().with_source("gemini_driver"),
            )
        })?;

        let mut text = String::new();
        let mut tool_calls = Vec::new();
        let parts = candidate
            .pointer("/content/parts")
            .and_then(|p| p.as_array())
            .map(Vec::as_slice)
            .unwrap_or_default();
        for part in parts {
            if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                text.push_str(t);
            }
            if let Some(call) = part.get("functionCall") {
                let Some(name) = call.get("name").and_then(|n| n.as_str()) else {
                    continue;
                };
                tool_calls.push(ToolCall {
                    id: call["id"].as_str().unwrap_or_default().to_string(),
                    name: name.to_string(),
                    arguments: call.get("args").cloned().unwrap_or_else(|| serde_json::json!({})),
                });
            }
        }

        let finish_reason = if tool_calls.is_empty() {
            candidate
                .get("finishReason")
                .and_then(|v| v.as_str())
                .map(normalize_finish_reason)
        } else {
            Some("tool_calls".to_string())
        };

        let usage = body.get("usageMetadata").map(|u| {
            let prompt = u["promptTokenCount"].as_u64().unwrap_or(0);
            let completion = u["candidatesTokenCount"].as_u64().unwrap_or(0);
            UsageInfo {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: u["totalTokenCount"].as_u64().unwrap_or(prompt.saturating_add(completion)),
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
                "role": "model",
                "parts": [Self::function_call_part(call_id, name, Value::Object(arguments.clone()))],
            }),
            serde_json::json!({
                "role": "user",
                "parts": [Self::function_response_part(call_id, name, Self::response_object(output))],
            }),
        ]
    }
}
