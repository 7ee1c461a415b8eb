//! Provider 驱动抽象层 — 通过 trait 实现多厂商 API 适配的动态分发
//!
//! Provider driver abstraction layer. Each driver is a thin wire-format
//! adapter: message rendering, tool schema translation, tool-choice
//! encoding, and response parsing. The multi-turn control flow lives once in
//! [`crate::client`] and is shared by every driver through
//! `Box<dyn ProviderDriver>`.

pub mod anthropic;
pub mod gemini;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Error, ErrorContext};
use crate::normalize::{CallIdGenerator, SystemPromptMode};
use crate::types::{Message, MessageRole, TokenUsage, ToolCall, ToolChoice, ToolDefinition};

pub use anthropic::AnthropicDriver;
pub use gemini::GeminiDriver;

/// Wire protocol family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    /// OpenAI chat completions format (also used by DeepSeek, Groq, xAI, etc.)
    OpenAiCompatible,
    /// Anthropic messages format
    AnthropicMessages,
    /// Google Gemini generateContent format
    GeminiGenerate,
}

impl std::str::FromStr for ApiStyle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "openai" | "openai_compatible" => Ok(ApiStyle::OpenAiCompatible),
            "anthropic" | "anthropic_messages" => Ok(ApiStyle::AnthropicMessages),
            "gemini" | "google" | "gemini_generate" => Ok(ApiStyle::GeminiGenerate),
            other => Err(Error::configuration_with_context(
                format!("Unknown API style: {}", other),
                ErrorContext::new().with_source("api_style"),
            )),
        }
    }
}

/// Unified HTTP request representation for provider communication.
#[derive(Debug, Clone)]
pub struct DriverRequest {
    /// Full target URL.
    pub url: String,
    /// Request headers, including credentials.
    pub headers: HashMap<String, String>,
    /// Serialized JSON request body.
    pub body: Value,
}

/// Vendor-neutral inputs for one vendor call.
#[derive(Debug, Clone, Copy)]
pub struct ChatPayload<'a> {
    pub model: &'a str,
    pub system: Option<&'a str>,
    /// Vendor-native message history.
    pub messages: &'a [Value],
    /// Vendor-native tool schemas (output of `format_tool`).
    pub tools: &'a [Value],
    pub tool_choice: &'a ToolChoice,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u32>,
}

/// Unified chat response from provider.
#[derive(Debug, Clone)]
pub struct DriverResponse {
    /// Extracted text content.
    pub content: Option<String>,
    /// Finish reason normalized to `stop` / `length` / `tool_calls` / `content_filter`.
    pub finish_reason: Option<String>,
    /// Token usage statistics; vendors may omit them.
    pub usage: Option<UsageInfo>,
    /// Tool invocations in vendor order.
    pub tool_calls: Vec<ToolCall>,
}

impl DriverResponse {
    /// Text content, if any non-whitespace text was returned.
    pub fn text(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl From<UsageInfo> for TokenUsage {
    fn from(u: UsageInfo) -> Self {
        TokenUsage::new(u.prompt_tokens, u.completion_tokens, u.total_tokens)
    }
}

/// Core trait for provider-specific API adaptation.
///
/// Each API style has one implementation. The trait is object-safe and
/// used via `Box<dyn ProviderDriver>`.
pub trait ProviderDriver: Send + Sync + std::fmt::Debug {
    /// Unique provider identifier.
    fn provider_id(&self) -> &str;

    /// API style this driver implements.
    fn api_style(&self) -> ApiStyle;

    /// How the vendor accepts a system prompt.
    fn system_prompt_mode(&self) -> SystemPromptMode {
        SystemPromptMode::Native
    }

    /// Base URL used when the client does not override it.
    fn default_base_url(&self) -> &str;

    /// Prefix for generated tool-use correlation ids.
    fn call_id_prefix(&self) -> &'static str {
        "call"
    }

    /// Render vendor-neutral turns into vendor-native messages.
    fn to_vendor_messages(&self, messages: &[Message], ids: &mut CallIdGenerator) -> Vec<Value>;

    /// Translate a tool definition into the vendor's tool schema.
    fn format_tool(&self, tool: &ToolDefinition) -> Value;

    /// Encode a tool-choice directive; `None` leaves the field out.
    fn encode_tool_choice(&self, choice: &ToolChoice) -> Option<Value>;

    /// Build a provider-specific HTTP request.
    fn build_request(
        &self,
        payload: &ChatPayload<'_>,
        api_key: &str,
        base_url: &str,
    ) -> Result<DriverRequest, Error>;

    /// Parse a non-streaming response into unified format.
    fn parse_response(&self, body: &Value) -> Result<DriverResponse, Error>;

    /// Messages recording one executed tool call: the assistant invocation
    /// followed by the paired tool result.
    fn tool_exchange_messages(
        &self,
        call_id: &str,
        name: &str,
        arguments: &Map<String, Value>,
        output: &Value,
    ) -> Vec<Value>;
}

/// Tool output as the text most vendors expect in a result message.
pub(crate) fn output_as_text(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Merge request-level extras into a JSON body.
fn set_sampling(body: &mut Value, temperature: Option<f64>, max_tokens: Option<u32>) {
    if let Some(t) = temperature {
        body["temperature"] = serde_json::json!(t);
    }
    if let Some(mt) = max_tokens {
        body["max_tokens"] = serde_json::json!(mt);
    }
}

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible driver — works for OpenAI, DeepSeek, Groq, xAI, etc.
#[derive(Debug)]
pub struct OpenAiDriver {
    provider_id: String,
    base_url: String,
    system_mode: SystemPromptMode,
}

impl OpenAiDriver {
    pub fn new(provider_id: impl Into<String>) -> Self {
        let provider_id = provider_id.into();
        let base_url = openai_compatible_base_url(&provider_id).to_string();
        Self {
            provider_id,
            base_url,
            system_mode: SystemPromptMode::Native,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// For models served without a system role.
    pub fn with_system_prompt_mode(mut self, mode: SystemPromptMode) -> Self {
        self.system_mode = mode;
        self
    }

    fn tool_call_value(id: &str, name: &str, arguments: String) -> Value {
        serde_json::json!({
            "id": id,
            "type": "function",
            "function": { "name": name, "arguments": arguments },
        })
    }
}

/// Known base URLs for OpenAI-compatible vendors.
fn openai_compatible_base_url(provider_id: &str) -> &'static str {
    match provider_id {
        "deepseek" => "https://api.deepseek.com/v1",
        "groq" => "https://api.groq.com/openai/v1",
        "xai" => "https://api.x.ai/v1",
        "mistral" => "https://api.mistral.ai/v1",
        "cerebras" => "https://api.cerebras.ai/v1",
        _ => OPENAI_BASE_URL,
    }
}

impl ProviderDriver for OpenAiDriver {
    fn provider_id(&self) -> &str {
        &self.provider_id
    }

    fn api_style(&self) -> ApiStyle {
        ApiStyle::OpenAiCompatible
    }

    fn system_prompt_mode(&self) -> SystemPromptMode {
        self.system_mode
    }

    fn default_base_url(&self) -> &str {
        &self.base_url
    }

    fn to_vendor_messages(&self, messages: &[Message], ids: &mut CallIdGenerator) -> Vec<Value> {
        messages
            .iter()
            .map(|m| {
                if let Some(call) = &m.function_call {
                    let id = ids.invocation_id(&call.name);
                    let content = if m.content.is_empty() {
                        Value::Null
                    } else {
                        Value::String(m.content.clone())
                    };
                    return serde_json::json!({
                        "role": "assistant",
                        "content": content,
                        "tool_calls": [Self::tool_call_value(&id, &call.name, call.arguments.clone())],
                    });
                }
                match m.role {
                    MessageRole::Function => {
                        let name = m.name.as_deref().unwrap_or_default();
                        serde_json::json!({
                            "role": "tool",
                            "tool_call_id": ids.result_id(name),
                            "content": m.content,
                        })
                    }
                    MessageRole::Assistant => {
                        serde_json::json!({ "role": "assistant", "content": m.content })
                    }
                    MessageRole::User | MessageRole::System => {
                        serde_json::json!({ "role": "user", "content": m.content })
                    }
                }
            })
            .collect()
    }

    fn format_tool(&self, tool: &ToolDefinition) -> Value {
        serde_json::json!({
            "type": "function",
            "function": {
                "name": tool.id,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        })
    }

    fn encode_tool_choice(&self, choice: &ToolChoice) -> Option<Value> {
        match choice {
            ToolChoice::Auto => Some(Value::String("auto".into())),
            ToolChoice::None => Some(Value::String("none".into())),
            forced => forced.forced_tool().map(|name| {
                serde_json::json!({ "type": "function", "function": { "name": name } })
            }),
        }
    }

    fn build_request(
        &self,
        payload: &ChatPayload<'_>,
        api_key: &str,
        base_url: &str,
    ) -> Result<DriverRequest, Error> {
        let mut messages: Vec<Value> = Vec::with_capacity(payload.messages.len() + 1);
        if let Some(system) = payload.system {
            messages.push(serde_json::json!({ "role": "system", "content": system }));
        }
        messages.extend(payload.messages.iter().cloned());

        let mut body = serde_json::json!({
            "model": payload.model,
            "messages": messages,
        });
        set_sampling(&mut body, payload.temperature, payload.max_tokens);

        if !payload.tools.is_empty() {
            body["tools"] = Value::Array(payload.tools.to_vec());
            if let Some(tc) = self.encode_tool_choice(payload.tool_choice) {
                body["tool_choice"] = tc;
            }
        }

        let mut headers = HashMap::new();
        headers.insert("authorization".into(), format!("Bearer {}", api_key));

        Ok(DriverRequest {
            url: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            headers,
            body,
        })
    }

    fn parse_response(&self, body: &Value) -> Result<DriverResponse, Error> {
        let message = body.pointer("/choices/0/message").ok_or_else(|| {
            Error::runtime_with_context(
                "Response has no choices[0].message",
                ErrorContext::new().with_source("openai_driver"),
            )
        })?;

        let content = message
            .get("content")
            .and_then(|v| v.as_str())
            .map(String::from);
        let finish_reason = body
            .pointer("/choices/0/finish_reason")
            .and_then(|v| v.as_str())
            .map(String::from);
        let usage = body.get("usage").map(|u| {
            let prompt = u["prompt_tokens"].as_u64().unwrap_or(0);
            let completion = u["completion_tokens"].as_u64().unwrap_or(0);
            UsageInfo {
                prompt_tokens: prompt,
                completion_tokens: completion,
                total_tokens: u["total_tokens"].as_u64().unwrap_or(prompt.saturating_add(completion)),
            }
        });

        // Arguments arrive as a JSON string; keep the raw string if it doesn't parse.
        let tool_calls = message
            .get("tool_calls")
            .and_then(|v| v.as_array())
            .map(|calls| {
                calls
                    .iter()
                    .filter_map(|c| {
                        let name = c.pointer("/function/name")?.as_str()?.to_string();
                        let raw_args = c.pointer("/function/arguments");
                        let arguments = match raw_args {
                            Some(Value::String(s)) if s.trim().is_empty() => serde_json::json!({}),
                            Some(Value::String(s)) => serde_json::from_str(s)
                                .unwrap_or_else(|_| Value::String(s.clone())),
                            Some(other) => other.clone(),
                            None => serde_json::json!({}),
                        };
                        Some(ToolCall {
                            id: c["id"].as_str().unwrap_or_default().to_string(),
                            name,
                            arguments,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(DriverResponse {
            content,
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
        let arguments = Value::Object(arguments.clone()).to_string();
        vec![
            serde_json::json!({
                "role": "assistant",
                "content": Value::Null,
                "tool_calls": [Self::tool_call_value(call_id, name, arguments)],
            }),
            serde_json::json!({
                "role": "tool",
                "tool_call_id": call_id,
                "content": output_as_text(output),
            }),
        ]
    }
}

/// Factory function to create the appropriate driver from an API style.
pub fn create_driver(api_style: ApiStyle, provider_id: &str) -> Box<dyn ProviderDriver> {
    match api_style {
        ApiStyle::OpenAiCompatible => Box::new(OpenAiDriver::new(provider_id)),
        ApiStyle::AnthropicMessages => Box::new(AnthropicDriver::new(provider_id)),
        ApiStyle::GeminiGenerate => Box::new(GeminiDriver::new(provider_id)),
    }
}

/// Pick a driver from a provider id ("anthropic", "google", "openai", "deepseek", ...).
///
/// Unknown ids fall back to the OpenAI-compatible format.
pub fn driver_for_provider(provider_id: &str) -> Box<dyn ProviderDriver> {
    let style = match provider_id {
        "anthropic" => ApiStyle::AnthropicMessages,
        "google" | "gemini" => ApiStyle::GeminiGenerate,
        _ => ApiStyle::OpenAiCompatible,
    };
    create_driver(style, provider_id)
}
