//! ai-provider-run — 执行单个请求文件并打印响应信封
//!
//! Usage:
//!   ai-provider-run <provider> <request.json>
//!
//! The request file holds a `ProviderRequest` as JSON. When it carries no
//! `api_key`, `<PROVIDER>_API_KEY` is read from the environment. Tools are
//! answered by an echo executor that returns its arguments.
//!
//! Logging follows `RUST_LOG` (e.g. `RUST_LOG=ai_provider_runtime=debug`).

use std::sync::Arc;

use ai_provider_runtime::tools::{FnToolExecutor, ToolOutcome};
use ai_provider_runtime::{ProviderClient, ProviderRequest};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 || matches!(args[1].as_str(), "help" | "--help" | "-h") {
        print_usage();
        std::process::exit(if args.len() < 3 { 1 } else { 0 });
    }

    if let Err(e) = run(&args[1], &args[2]).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(provider: &str, path: &str) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(path)?;
    let mut request: ProviderRequest = serde_json::from_str(&raw)?;
    if request.api_key.trim().is_empty() {
        let env_var = format!("{}_API_KEY", provider.to_uppercase());
        request.api_key = std::env::var(env_var).unwrap_or_default();
    }

    let echo = FnToolExecutor::new(|name, args| async move {
        Ok(ToolOutcome::success(serde_json::json!({ "tool": name, "arguments": args })))
    });

    let client = ProviderClient::builder()
        .provider(provider)
        .tool_executor(Arc::new(echo))
        .build()?;

    let envelope = client.execute_request(&request).await?;
    println!("{}", serde_json::to_string_pretty(&envelope)?);
    Ok(())
}

fn print_usage() {
    eprintln!("ai-provider-run — execute one provider request");
    eprintln!();
    eprintln!("USAGE:");
    eprintln!("  ai-provider-run <provider> <request.json>");
    eprintln!();
    eprintln!("PROVIDERS:");
    eprintln!("  openai, deepseek, groq, xai, mistral, cerebras  (OpenAI-compatible)");
    eprintln!("  anthropic                                       (Anthropic Messages)");
    eprintln!("  google, gemini                                  (Gemini generateContent)");
    eprintln!();
    eprintln!("ENVIRONMENT:");
    eprintln!("  <PROVIDER>_API_KEY          credential when the file has none");
    eprintln!("  AI_PROVIDER_BASE_URL        base URL override");
    eprintln!("  AI_PROVIDER_MAX_ITERATIONS  vendor-call cap (default 10)");
    eprintln!("  AI_HTTP_TIMEOUT_SECS        HTTP timeout (default 30)");
    eprintln!("  AI_PROXY_URL                HTTP proxy");
}
