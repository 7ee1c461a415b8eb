use crate::transport::TransportError;
use crate::types::response::FailureTiming;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field path that caused the error (e.g., "request.api_key", "tools[0].parameters")
    pub field_path: Option<String>,
    /// Source of the error (e.g., "request_validator", "anthropic_driver")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the provider runtime.
///
/// Only `Configuration` (raised before any network call) and `Provider`
/// (a vendor call failed mid-execution, with timing attached) ever leave
/// [`crate::ProviderClient::execute_request`]. Tool faults and structured
/// output extraction faults are logged and never surface here.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },

    #[error("Network transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Remote error: HTTP {status} ({class}): {message}")]
    Remote {
        status: u16,
        class: String,
        message: String,
    },

    #[error("Provider request failed after {}ms: {message}", .timing.duration_ms)]
    Provider {
        message: String,
        timing: FailureTiming,
        #[source]
        source: Box<Error>,
    },
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Wrap a failure that interrupted an execution, attaching the timing
    /// measured up to the failure point.
    pub fn with_timing(self, timing: FailureTiming) -> Self {
        Error::Provider {
            message: self.to_string(),
            timing,
            source: Box::new(self),
        }
    }

    /// Timing attached to a failed execution, if any.
    pub fn timing(&self) -> Option<&FailureTiming> {
        match self {
            Error::Provider { timing, .. } => Some(timing),
            _ => None,
        }
    }

    /// The underlying error for `Provider` failures, `self` otherwise.
    pub fn root(&self) -> &Error {
        match self {
            Error::Provider { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Configuration { .. })
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Configuration { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}
