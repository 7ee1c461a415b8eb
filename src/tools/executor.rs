//! Boundary to the external tool registry.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;
use std::pin::Pin;

/// Result reported by a tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(default)]
    pub output: Value,
}

impl ToolOutcome {
    pub fn success(output: Value) -> Self {
        Self {
            success: true,
            output,
        }
    }

    pub fn failure(output: Value) -> Self {
        Self {
            success: false,
            output,
        }
    }
}

/// Executes tools on behalf of the loop.
///
/// Ordinary tool-level failures should be reported as `success = false`.
/// An `Err` is treated the same way by the loop (logged, call dropped);
/// it never aborts the request.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, args: &Map<String, Value>) -> anyhow::Result<ToolOutcome>;
}

type ToolFuture = Pin<Box<dyn Future<Output = anyhow::Result<ToolOutcome>> + Send>>;

/// Adapts an async closure into a [`ToolExecutor`].
///
/// ```
/// use ai_provider_runtime::tools::{FnToolExecutor, ToolOutcome};
///
/// let executor = FnToolExecutor::new(|name, args| async move {
///     Ok(ToolOutcome::success(serde_json::json!({ "tool": name, "args": args })))
/// });
/// # let _ = executor;
/// ```
pub struct FnToolExecutor {
    f: Box<dyn Fn(String, Map<String, Value>) -> ToolFuture + Send + Sync>,
}

impl FnToolExecutor {
    pub fn new<F, Fut>(f: F) -> Self
    where
        F: Fn(String, Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<ToolOutcome>> + Send + 'static,
    {
        Self {
            f: Box::new(move |name, args| Box::pin(f(name, args))),
        }
    }
}

impl std::fmt::Debug for FnToolExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnToolExecutor").finish_non_exhaustive()
    }
}

#[async_trait]
impl ToolExecutor for FnToolExecutor {
    async fn execute(&self, name: &str, args: &Map<String, Value>) -> anyhow::Result<ToolOutcome> {
        (self.f)(name.to_string(), args.clone()).await
    }
}

/// Executor for requests that declare no tools; every call fails softly.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoToolExecutor;

#[async_trait]
impl ToolExecutor for NoToolExecutor {
    async fn execute(&self, name: &str, _args: &Map<String, Value>) -> anyhow::Result<ToolOutcome> {
        Ok(ToolOutcome::failure(Value::String(format!(
            "no tool executor configured for '{}'",
            name
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_fn_executor_passes_name_and_args() {
        let executor = FnToolExecutor::new(|name, args| async move {
            Ok(ToolOutcome::success(json!({ "name": name, "city": args["city"] })))
        });
        let mut args = Map::new();
        args.insert("city".into(), json!("Paris"));

        let outcome = executor.execute("get_weather", &args).await.unwrap();
        assert!(outcome.success);
        assert_eq!(outcome.output["name"], "get_weather");
        assert_eq!(outcome.output["city"], "Paris");
    }

    #[tokio::test]
    async fn test_no_tool_executor_reports_failure() {
        let outcome = NoToolExecutor.execute("x", &Map::new()).await.unwrap();
        assert!(!outcome.success);
    }
}
