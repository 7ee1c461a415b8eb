//! Shared fixtures: a scripted transport and vendor response builders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use ai_provider_runtime::drivers::DriverRequest;
use ai_provider_runtime::tools::{FnToolExecutor, ToolExecutor, ToolOutcome};
use ai_provider_runtime::transport::ChatTransport;
use ai_provider_runtime::{ClientConfig, Error, ProviderClientBuilder, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

/// Replays scripted responses in order and records every request it sees.
///
/// Once the script is exhausted the `repeat` response (if any) is returned
/// forever; otherwise the call fails.
#[derive(Default)]
pub struct StubTransport {
    script: Mutex<VecDeque<Result<Value>>>,
    repeat: Option<Value>,
    requests: Mutex<Vec<DriverRequest>>,
}

impl StubTransport {
    pub fn new(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Default::default()
        })
    }

    pub fn scripted(script: Vec<Result<Value>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            ..Default::default()
        })
    }

    pub fn repeating(response: Value) -> Arc<Self> {
        Arc::new(Self {
            repeat: Some(response),
            ..Default::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<DriverRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn body(&self, index: usize) -> Value {
        self.requests.lock().unwrap()[index].body.clone()
    }
}

#[async_trait]
impl ChatTransport for StubTransport {
    async fn send(&self, request: &DriverRequest) -> Result<Value> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(v) => Ok(v.clone()),
            None => Err(Error::Remote {
                status: 500,
                class: "server_error".into(),
                message: "stub transport script exhausted".into(),
            }),
        }
    }
}

/// Builder isolated from the process environment.
pub fn builder(provider: &str, transport: Arc<StubTransport>) -> ProviderClientBuilder {
    ProviderClientBuilder::with_config(ClientConfig::default())
        .provider(provider)
        .transport(transport)
}

/// Executor that echoes its arguments back as a successful result.
pub fn echo_executor() -> Arc<dyn ToolExecutor> {
    Arc::new(FnToolExecutor::new(|name, args| async move {
        Ok(ToolOutcome::success(json!({ "tool": name, "args": args })))
    }))
}

pub fn openai_text(text: &str, prompt: u64, completion: u64) -> Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": text}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": prompt, "completion_tokens": completion, "total_tokens": prompt + completion}
    })
}

/// OpenAI response requesting tool calls; `calls` are `(name, arguments)`.
pub fn openai_tool_calls(content: Option<&str>, calls: &[(&str, Value)], prompt: u64, completion: u64) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .enumerate()
        .map(|(i, (name, args))| {
            json!({
                "id": format!("call_vendor_{}", i),
                "type": "function",
                "function": {"name": name, "arguments": args.to_string()}
            })
        })
        .collect();
    json!({
        "choices": [{
            "message": {"role": "assistant", "content": content, "tool_calls": tool_calls},
            "finish_reason": "tool_calls"
        }],
        "usage": {"prompt_tokens": prompt, "completion_tokens": completion, "total_tokens": prompt + completion}
    })
}

pub fn anthropic_text(text: &str) -> Value {
    json!({
        "content": [{"type": "text", "text": text}],
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 3, "output_tokens": 2}
    })
}

pub fn anthropic_tool_use(name: &str, input: Value) -> Value {
    json!({
        "content": [{"type": "tool_use", "id": format!("toolu_{}", name), "name": name, "input": input}],
        "stop_reason": "tool_use",
        "usage": {"input_tokens": 3, "output_tokens": 2}
    })
}

pub fn weather_schema() -> Value {
    json!({
        "type": "object",
        "properties": {"city": {"type": "string", "description": "City name"}},
        "required": ["city"]
    })
}
