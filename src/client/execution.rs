//! 执行循环：模型调用与工具执行的多轮交替。
//!
//! Execution loop (one request). All mutable state lives in
//! [`ExecutionState`], so a shared [`ProviderClient`] never sees it.

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::assemble::assemble_envelope;
use super::core::ProviderClient;
use super::timing::TimingRecorder;
use crate::drivers::{ChatPayload, DriverResponse};
use crate::normalize::{normalize, CallIdGenerator};
use crate::structured::extract_json_object;
use crate::tools::{prepare_tools, track_forced_tool_usage};
use crate::types::{
    FailureTiming, ProviderRequest, ResponseEnvelope, SegmentKind, TokenUsage, ToolCall,
    ToolCallRecord, ToolChoice, ToolDefinition,
};
use crate::Result;

pub(crate) struct ExecutionState<'a> {
    client: &'a ProviderClient,
    request: &'a ProviderRequest,
    request_id: &'a str,
    system: Option<String>,
    /// Vendor-native conversation history.
    messages: Vec<Value>,
    tools: Vec<ToolDefinition>,
    wire_tools: Vec<Value>,
    tool_choice: ToolChoice,
    forced_tools: Vec<String>,
    used_forced_tools: Vec<String>,
    ids: CallIdGenerator,
    timing: TimingRecorder,
    tokens: TokenUsage,
    content: String,
    tool_calls: Vec<ToolCallRecord>,
    tool_results: Vec<Value>,
    iterations: u32,
}

impl<'a> ExecutionState<'a> {
    pub(crate) fn new(client: &'a ProviderClient, request: &'a ProviderRequest, request_id: &'a str) -> Self {
        let driver = client.driver.as_ref();
        let conversation = normalize(request, driver.system_prompt_mode());
        let mut ids = CallIdGenerator::new(driver.call_id_prefix());
        let messages = driver.to_vendor_messages(&conversation.messages, &mut ids);

        let prepared = prepare_tools(&request.tools, request.tool_choice.as_ref());
        let wire_tools = prepared.tools.iter().map(|t| driver.format_tool(t)).collect();

        Self {
            client,
            request,
            request_id,
            system: conversation.system,
            messages,
            tools: prepared.tools,
            wire_tools,
            tool_choice: prepared.tool_choice,
            forced_tools: prepared.forced_tools,
            used_forced_tools: Vec::new(),
            ids,
            timing: TimingRecorder::new(),
            tokens: TokenUsage::default(),
            content: String::new(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            iterations: 0,
        }
    }

    /// Drive model calls and tool executions until the model stops asking
    /// for tools or the vendor-call cap is reached.
    pub(crate) async fn run(&mut self) -> Result<()> {
        let mut response = self.call_model("initial response".to_string()).await?;

        while !response.tool_calls.is_empty() {
            if self.iterations + 1 >= self.client.max_iterations {
                info!(
                    request_id = self.request_id,
                    max_iterations = self.client.max_iterations,
                    pending_tool_calls = response.tool_calls.len(),
                    "iteration cap reached, returning last content"
                );
                break;
            }
            self.iterations += 1;

            // The directive in effect for `response`, before the tracker moves it on.
            let choice_in_effect = self.tool_choice.clone();
            self.execute_tools(&response.tool_calls).await;

            if choice_in_effect.is_forced() {
                let usage = track_forced_tool_usage(
                    &response.tool_calls,
                    &choice_in_effect,
                    &self.forced_tools,
                    &self.used_forced_tools,
                );
                if usage.has_used_forced_tool {
                    debug!(
                        request_id = self.request_id,
                        used = ?usage.used_forced_tools,
                        next = ?usage.next_choice,
                        "forced tool used"
                    );
                }
                self.used_forced_tools = usage.used_forced_tools;
                self.tool_choice = usage.next_choice;
            }

            let name = format!("model response (iteration {})", self.iterations);
            response = self.call_model(name).await?;
        }

        self.isolate_json();
        Ok(())
    }

    async fn call_model(&mut self, segment: String) -> Result<DriverResponse> {
        let client = self.client;
        let driver = client.driver.as_ref();
        let payload = ChatPayload {
            model: &self.request.model,
            system: self.system.as_deref(),
            messages: &self.messages,
            tools: &self.wire_tools,
            tool_choice: &self.tool_choice,
            temperature: self.request.temperature,
            max_tokens: self.request.max_tokens,
        };
        let http_request = driver.build_request(&payload, &self.request.api_key, &client.base_url)?;

        debug!(
            request_id = self.request_id,
            segment = segment.as_str(),
            url = http_request.url.as_str(),
            messages = self.messages.len(),
            tool_choice = ?self.tool_choice,
            "calling vendor"
        );

        let start = self.timing.begin();
        let result = client.transport.send(&http_request).await;
        let duration_ms = self.timing.finish(SegmentKind::Model, segment, start).duration_ms;

        let response = driver.parse_response(&result?)?;
        let usage: TokenUsage = response.usage.map(Into::into).unwrap_or_default();
        self.tokens.accumulate(&usage);

        if let Some(text) = response.text() {
            self.content = text.to_string();
        }

        debug!(
            request_id = self.request_id,
            duration_ms,
            tool_calls = response.tool_calls.len(),
            finish_reason = response.finish_reason.as_deref().unwrap_or(""),
            total_tokens = usage.total,
            "vendor response parsed"
        );
        Ok(response)
    }

    /// Execute every invocation in vendor order. Failures are logged and
    /// leave no trace in the records or in the conversation.
    async fn execute_tools(&mut self, calls: &[ToolCall]) {
        for call in calls {
            let Some(tool) = self.tools.iter().find(|t| t.id == call.name).cloned() else {
                warn!(
                    request_id = self.request_id,
                    tool = call.name.as_str(),
                    "model invoked an unknown tool, skipping"
                );
                continue;
            };

            let arguments = match &call.arguments {
                Value::Object(args) => tool.merge_arguments(args),
                Value::Null => tool.merge_arguments(&Map::new()),
                other => {
                    warn!(
                        request_id = self.request_id,
                        tool = call.name.as_str(),
                        arguments = %other,
                        "tool arguments are not a JSON object, skipping"
                    );
                    continue;
                }
            };

            let start = self.timing.begin();
            let outcome = self.client.executor.execute(&tool.id, &arguments).await;
            let segment = self.timing.finish(SegmentKind::Tool, tool.id.as_str(), start).clone();

            let output = match outcome {
                Ok(outcome) if outcome.success => outcome.output,
                Ok(outcome) => {
                    warn!(
                        request_id = self.request_id,
                        tool = tool.id.as_str(),
                        duration_ms = segment.duration_ms,
                        output = %outcome.output,
                        "tool execution failed"
                    );
                    continue;
                }
                Err(e) => {
                    warn!(
                        request_id = self.request_id,
                        tool = tool.id.as_str(),
                        duration_ms = segment.duration_ms,
                        error = %e,
                        "tool execution errored"
                    );
                    continue;
                }
            };

            debug!(
                request_id = self.request_id,
                tool = tool.id.as_str(),
                duration_ms = segment.duration_ms,
                "tool executed"
            );

            let call_id = self.ids.next_id();
            self.messages.extend(self.client.driver.tool_exchange_messages(
                &call_id,
                &tool.id,
                &arguments,
                &output,
            ));
            self.tool_results.push(output.clone());
            self.tool_calls.push(ToolCallRecord {
                name: tool.id,
                arguments,
                start_time: segment.start_time,
                end_time: segment.end_time,
                duration_ms: segment.duration_ms,
                result: output,
            });
        }
    }

    /// Replace the final content with its brace span, when it has one.
    fn isolate_json(&mut self) {
        match extract_json_object(&self.content) {
            Some(json) => self.content = json,
            None if self.request.response_format.is_some() => warn!(
                request_id = self.request_id,
                "structured output requested but no JSON object found in content"
            ),
            None => {}
        }
    }

    pub(crate) fn failure_timing(&self) -> FailureTiming {
        self.timing.failure()
    }

    pub(crate) fn into_envelope(self) -> ResponseEnvelope {
        let timing = self.timing.summary(self.iterations + 1);
        assemble_envelope(
            &self.request.model,
            self.content,
            self.tokens,
            self.tool_calls,
            self.tool_results,
            timing,
        )
    }
}
