//! 传输层：向厂商端点发送一次非流式 JSON 请求。
//!
//! Transport layer. The execution loop talks to vendors only through
//! [`ChatTransport`], so tests can substitute a scripted transport.

pub mod http;

use async_trait::async_trait;
use serde_json::Value;

use crate::drivers::DriverRequest;
use crate::Result;

pub use http::{HttpTransport, TransportError};

/// Sends one built vendor request and returns the decoded JSON body.
///
/// Non-2xx responses must surface as [`crate::Error::Remote`].
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &DriverRequest) -> Result<Value>;
}

/// Map an HTTP status to a standard error class.
pub fn error_class_for_status(status: u16) -> &'static str {
    match status {
        400 | 422 => "invalid_request",
        401 => "authentication",
        402 => "quota_exhausted",
        403 => "permission_denied",
        404 => "not_found",
        408 => "timeout",
        409 => "conflict",
        413 => "request_too_large",
        429 => "rate_limited",
        529 | 503 => "overloaded",
        500..=599 => "server_error",
        _ => "http_error",
    }
}
