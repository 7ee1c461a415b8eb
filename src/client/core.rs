use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

use super::builder::ProviderClientBuilder;
use super::execution::ExecutionState;
use crate::drivers::ProviderDriver;
use crate::tools::ToolExecutor;
use crate::transport::ChatTransport;
use crate::types::{ProviderRequest, ResponseEnvelope};
use crate::{Error, ErrorContext, Result};

/// Executes provider requests, including multi-turn tool calling.
///
/// Holds no per-request state; share it behind an `Arc` across tasks.
pub struct ProviderClient {
    pub(crate) driver: Box<dyn ProviderDriver>,
    pub(crate) transport: Arc<dyn ChatTransport>,
    pub(crate) executor: Arc<dyn ToolExecutor>,
    pub(crate) base_url: String,
    pub(crate) max_iterations: u32,
}

impl std::fmt::Debug for ProviderClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderClient")
            .field("driver", &self.driver)
            .field("base_url", &self.base_url)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

impl ProviderClient {
    pub fn builder() -> ProviderClientBuilder {
        ProviderClientBuilder::new()
    }

    pub fn provider_id(&self) -> &str {
        self.driver.provider_id()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Run one request to completion.
    ///
    /// Configuration problems fail before any vendor call and carry no
    /// timing. A failed vendor call aborts the request with
    /// [`Error::Provider`], which carries the timing up to the failure.
    /// Tool failures never abort the request.
    pub async fn execute_request(&self, request: &ProviderRequest) -> Result<ResponseEnvelope> {
        validate_request(request)?;

        let request_id = Uuid::new_v4().to_string();
        info!(
            request_id = request_id.as_str(),
            provider = self.provider_id(),
            model = request.model.as_str(),
            tools = request.tools.len(),
            messages = request.messages.len(),
            "provider request started"
        );

        let mut state = ExecutionState::new(self, request, &request_id);
        match state.run().await {
            Ok(()) => {
                let envelope = state.into_envelope();
                info!(
                    request_id = request_id.as_str(),
                    provider = self.provider_id(),
                    model = request.model.as_str(),
                    iterations = envelope.timing.iterations,
                    duration_ms = envelope.timing.duration_ms,
                    total_tokens = envelope.tokens.total,
                    tool_calls = envelope.tool_calls.as_ref().map_or(0, Vec::len),
                    "provider request completed"
                );
                Ok(envelope)
            }
            Err(e) => {
                let timing = state.failure_timing();
                error!(
                    request_id = request_id.as_str(),
                    provider = self.provider_id(),
                    model = request.model.as_str(),
                    duration_ms = timing.duration_ms,
                    error = %e,
                    "provider request failed"
                );
                Err(e.with_timing(timing))
            }
        }
    }
}

fn validate_request(request: &ProviderRequest) -> Result<()> {
    if request.api_key.trim().is_empty() {
        return Err(Error::configuration_with_context(
            "API key is required",
            ErrorContext::new()
                .with_field_path("request.api_key")
                .with_source("request_validator"),
        ));
    }
    if request.model.trim().is_empty() {
        return Err(Error::configuration_with_context(
            "Model is required",
            ErrorContext::new()
                .with_field_path("request.model")
                .with_source("request_validator"),
        ));
    }
    Ok(())
}
