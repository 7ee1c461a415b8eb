//! # ai-provider-runtime
//!
//! 多厂商大模型调用运行时：统一请求、多轮工具调用与一致的响应信封。
//!
//! Provider execution loop for LLM backends. A workflow engine hands over a
//! provider-agnostic [`ProviderRequest`]; the runtime translates it into the
//! vendor's wire format, drives the model↔tool exchange until the model stops
//! asking for tools (or the iteration cap is hit), enforces forced-tool
//! policies across iterations, and returns a [`ResponseEnvelope`] with token
//! and timing telemetry that looks the same for every vendor.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use ai_provider_runtime::tools::{FnToolExecutor, ToolOutcome};
//! use ai_provider_runtime::{Message, ProviderClient, ProviderRequest, ToolDefinition};
//!
//! #[tokio::main]
//! async fn main() -> ai_provider_runtime::Result<()> {
//!     let executor = FnToolExecutor::new(|_name, args| async move {
//!         Ok(ToolOutcome::success(serde_json::json!({ "city": args["city"], "temp": 20 })))
//!     });
//!
//!     let client = ProviderClient::builder()
//!         .provider("openai")
//!         .tool_executor(Arc::new(executor))
//!         .build()?;
//!
//!     let request = ProviderRequest::new("gpt-4o", std::env::var("OPENAI_API_KEY").unwrap_or_default())
//!         .messages(vec![Message::user("What's the weather in Paris?")])
//!         .tools(vec![ToolDefinition::new(
//!             "get_weather",
//!             "Get current weather for a city",
//!             serde_json::json!({
//!                 "type": "object",
//!                 "properties": { "city": { "type": "string" } },
//!                 "required": ["city"]
//!             }),
//!         )]);
//!
//!     let envelope = client.execute_request(&request).await?;
//!     println!("{} ({} tokens)", envelope.content, envelope.tokens.total);
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `ProviderClient`, builder/config, execution loop, timing |
//! | [`drivers`] | Per-vendor wire formats (OpenAI-compatible, Anthropic, Gemini) |
//! | [`normalize`] | Vendor-neutral message normalization, correlation ids |
//! | [`tools`] | Tool-usage policy, forced-tool tracker, executor boundary |
//! | [`structured`] | Structured-output instructions and JSON isolation |
//! | [`transport`] | `ChatTransport` trait and the reqwest transport |
//! | [`types`] | Request, message, tool and response types |

pub mod client;
pub mod drivers;
pub mod normalize;
pub mod structured;
pub mod tools;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use client::{ClientConfig, ProviderClient, ProviderClientBuilder};
pub use drivers::{create_driver, ApiStyle, ProviderDriver};
pub use tools::{ToolExecutor, ToolOutcome};
pub use types::{
    Message, MessageRole, ProviderRequest, ResponseEnvelope, ResponseFormat, TokenUsage,
    ToolChoice, ToolDefinition, UsageControl,
};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
