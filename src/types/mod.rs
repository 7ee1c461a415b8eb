//! 类型系统模块：请求、消息、工具与响应信封的核心数据类型。
//!
//! # Types Module
//!
//! Vendor-neutral data model shared by the normalizer, the drivers and the
//! execution loop.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ProviderRequest`] | Immutable request input |
//! | [`Message`] | Prior conversation turn |
//! | [`ToolDefinition`] | Declared tool with presets and usage constraint |
//! | [`ToolChoice`] | Per-call tool-choice directive |
//! | [`ResponseEnvelope`] | Uniform result with tokens and timing |
//!
//! ## Example
//!
//! ```rust
//! use ai_provider_runtime::types::{Message, ProviderRequest, ToolDefinition};
//!
//! let request = ProviderRequest::new("gpt-4o", "sk-test")
//!     .system_prompt("You are a weather assistant.")
//!     .messages(vec![Message::user("What's the weather in Paris?")])
//!     .tools(vec![ToolDefinition::new(
//!         "get_weather",
//!         "Get current weather for a city",
//!         serde_json::json!({
//!             "type": "object",
//!             "properties": { "city": { "type": "string" } },
//!             "required": ["city"]
//!         }),
//!     )]);
//! assert!(request.tool("get_weather").is_some());
//! ```

pub mod message;
pub mod request;
pub mod response;
pub mod tool;

pub use message::{FunctionCall, Message, MessageRole};
pub use request::{ProviderRequest, ResponseFormat};
pub use response::{
    FailureTiming, ResponseEnvelope, SegmentKind, TimeSegment, TimingSummary, TokenUsage,
};
pub use tool::{ToolCall, ToolCallRecord, ToolChoice, ToolDefinition, UsageControl};
