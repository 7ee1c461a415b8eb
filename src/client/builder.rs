use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::client::core::ProviderClient;
use crate::drivers::{driver_for_provider, ProviderDriver};
use crate::tools::{NoToolExecutor, ToolExecutor};
use crate::transport::http::timeout_secs_from_env;
use crate::transport::{ChatTransport, HttpTransport};
use crate::{Error, ErrorContext, Result};

/// Vendor calls allowed per request (initial call included).
pub const DEFAULT_MAX_ITERATIONS: u32 = 10;

/// Client-level settings, env-overridable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Overrides the driver's default base URL.
    pub base_url: Option<String>,
    pub timeout: Duration,
    pub max_iterations: u32,
    pub proxy_url: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            proxy_url: None,
        }
    }
}

impl ClientConfig {
    /// Read settings from the environment:
    /// - `AI_HTTP_TIMEOUT_SECS` (fallback `AI_TIMEOUT_SECS`, default 30)
    /// - `AI_PROXY_URL`
    /// - `AI_PROVIDER_BASE_URL`
    /// - `AI_PROVIDER_MAX_ITERATIONS` (default 10)
    pub fn from_env() -> Self {
        let non_empty = |key: &str| env::var(key).ok().filter(|s| !s.trim().is_empty());
        Self {
            base_url: non_empty("AI_PROVIDER_BASE_URL"),
            timeout: Duration::from_secs(timeout_secs_from_env()),
            max_iterations: env::var("AI_PROVIDER_MAX_ITERATIONS")
                .ok()
                .and_then(|s| s.parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_ITERATIONS),
            proxy_url: non_empty("AI_PROXY_URL"),
        }
    }
}

/// Builder for creating clients with custom configuration.
pub struct ProviderClientBuilder {
    driver: Option<Box<dyn ProviderDriver>>,
    transport: Option<Arc<dyn ChatTransport>>,
    executor: Option<Arc<dyn ToolExecutor>>,
    config: ClientConfig,
}

impl ProviderClientBuilder {
    /// Start from [`ClientConfig::from_env`].
    pub fn new() -> Self {
        Self::with_config(ClientConfig::from_env())
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            driver: None,
            transport: None,
            executor: None,
            config,
        }
    }

    /// Use the driver registered for a provider id ("openai", "anthropic", "google", ...).
    pub fn provider(mut self, provider_id: &str) -> Self {
        self.driver = Some(driver_for_provider(provider_id));
        self
    }

    pub fn driver(mut self, driver: impl ProviderDriver + 'static) -> Self {
        self.driver = Some(Box::new(driver));
        self
    }

    pub fn boxed_driver(mut self, driver: Box<dyn ProviderDriver>) -> Self {
        self.driver = Some(driver);
        self
    }

    /// Replace the HTTP transport (mainly for tests).
    pub fn transport(mut self, transport: Arc<dyn ChatTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn tool_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Override the base URL (primarily for testing with mock servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    pub fn max_iterations(mut self, n: u32) -> Self {
        self.config.max_iterations = n;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub fn proxy(mut self, proxy_url: impl Into<String>) -> Self {
        self.config.proxy_url = Some(proxy_url.into());
        self
    }

    pub fn build(self) -> Result<ProviderClient> {
        let driver = self.driver.ok_or_else(|| {
            Error::configuration_with_context(
                "A provider driver is required",
                ErrorContext::new().with_source("client_builder"),
            )
        })?;

        if self.config.max_iterations == 0 {
            return Err(Error::configuration_with_context(
                "max_iterations must be at least 1",
                ErrorContext::new()
                    .with_field_path("config.max_iterations")
                    .with_source("client_builder"),
            ));
        }

        let transport: Arc<dyn ChatTransport> = match self.transport {
            Some(t) => t,
            None => Arc::new(HttpTransport::new(
                self.config.timeout,
                self.config.proxy_url.as_deref(),
            )?),
        };

        let base_url = self
            .config
            .base_url
            .unwrap_or_else(|| driver.default_base_url().to_string());

        Ok(ProviderClient {
            driver,
            transport,
            executor: self.executor.unwrap_or_else(|| Arc::new(NoToolExecutor)),
            base_url,
            max_iterations: self.config.max_iterations,
        })
    }
}

impl Default for ProviderClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
