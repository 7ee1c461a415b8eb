//! Execution loop behavior against a scripted vendor.

mod common;

use std::sync::{Arc, Mutex};

use ai_provider_runtime::tools::{FnToolExecutor, ToolOutcome};
use ai_provider_runtime::types::SegmentKind;
use ai_provider_runtime::{Error, Message, ProviderRequest, ToolDefinition};
use common::*;
use serde_json::{json, Map, Value};

fn weather_request() -> ProviderRequest {
    ProviderRequest::new("gpt-4o", "sk-test")
        .system_prompt("You are a weather assistant.")
        .messages(vec![Message::user("What's the weather in Paris?")])
        .tools(vec![ToolDefinition::new(
            "get_weather",
            "Get current weather for a city",
            weather_schema(),
        )])
}

#[tokio::test]
async fn missing_credential_fails_before_any_vendor_call() {
    let transport = StubTransport::repeating(openai_text("unused", 1, 1));
    let client = builder("openai", transport.clone()).build().unwrap();

    let err = client
        .execute_request(&ProviderRequest::new("gpt-4o", ""))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Configuration { .. }));
    assert!(err.timing().is_none());
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn request_without_tools_makes_exactly_one_call() {
    let transport = StubTransport::new(vec![openai_text("Hello there!", 12, 4)]);
    let client = builder("openai", transport.clone()).build().unwrap();

    let request = ProviderRequest::new("gpt-4o", "sk-test")
        .system_prompt("Be brief.")
        .messages(vec![Message::user("Hi")]);
    let envelope = client.execute_request(&request).await.unwrap();

    assert_eq!(transport.calls(), 1);
    assert_eq!(envelope.content, "Hello there!");
    assert_eq!(envelope.model, "gpt-4o");
    assert_eq!(envelope.tokens.prompt, 12);
    assert_eq!(envelope.tokens.completion, 4);
    assert_eq!(envelope.tokens.total, 16);
    assert!(envelope.tool_calls.is_none());
    assert!(envelope.tool_results.is_none());

    let timing = &envelope.timing;
    assert_eq!(timing.iterations, 1);
    assert_eq!(timing.time_segments.len(), 1);
    assert_eq!(timing.time_segments[0].kind, SegmentKind::Model);
    assert_eq!(timing.time_segments[0].name, "initial response");
    assert_eq!(timing.first_response_time_ms, timing.time_segments[0].duration_ms);
    assert_eq!(timing.tools_time_ms, 0);

    let body = transport.body(0);
    assert!(body.get("tools").is_none());
    assert!(body.get("tool_choice").is_none());
    assert_eq!(body["messages"][0], json!({"role": "system", "content": "Be brief."}));
    assert_eq!(body["messages"][1], json!({"role": "user", "content": "Hi"}));
}

#[tokio::test]
async fn weather_tool_round_trip() {
    let transport = StubTransport::new(vec![
        openai_tool_calls(None, &[("get_weather", json!({"city": "Paris"}))], 50, 10),
        openai_text("It is 20°C in Paris.", 80, 12),
    ]);
    let seen: Arc<Mutex<Vec<(String, Map<String, Value>)>>> = Arc::default();
    let seen_by_tool = seen.clone();
    let executor = FnToolExecutor::new(move |name, args| {
        seen_by_tool.lock().unwrap().push((name, args));
        async move { Ok(ToolOutcome::success(json!({"temp": 20, "unit": "C"}))) }
    });

    let client = builder("openai", transport.clone())
        .tool_executor(Arc::new(executor))
        .build()
        .unwrap();
    let envelope = client.execute_request(&weather_request()).await.unwrap();

    assert_eq!(transport.calls(), 2);
    assert_eq!(envelope.content, "It is 20°C in Paris.");
    assert_eq!(envelope.timing.iterations, 2);
    assert_eq!(envelope.tokens.prompt, 130);
    assert_eq!(envelope.tokens.completion, 22);
    assert_eq!(envelope.tokens.total, 152);

    let calls = seen.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "get_weather");
    assert_eq!(calls[0].1["city"], "Paris");

    let records = envelope.tool_calls.as_ref().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "get_weather");
    assert_eq!(records[0].arguments["city"], "Paris");
    assert_eq!(records[0].result, json!({"temp": 20, "unit": "C"}));
    assert_eq!(envelope.tool_results.as_ref().unwrap(), &vec![json!({"temp": 20, "unit": "C"})]);

    let names: Vec<&str> = envelope.timing.time_segments.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["initial response", "get_weather", "model response (iteration 1)"]);
    assert_eq!(envelope.timing.time_segments[1].kind, SegmentKind::Tool);

    // The follow-up call carries the invocation and its result under one id.
    let messages = transport.body(1)["messages"].as_array().unwrap().clone();
    let invocation = &messages[messages.len() - 2];
    let result = &messages[messages.len() - 1];
    let call_id = invocation["tool_calls"][0]["id"].as_str().unwrap();
    assert_eq!(invocation["role"], "assistant");
    assert_eq!(invocation["tool_calls"][0]["function"]["name"], "get_weather");
    assert_eq!(result["role"], "tool");
    assert_eq!(result["tool_call_id"], call_id);
    assert_eq!(serde_json::from_str::<Value>(result["content"].as_str().unwrap()).unwrap()["temp"], 20);
}

#[tokio::test]
async fn iteration_cap_limits_vendor_calls() {
    let transport = StubTransport::repeating(openai_tool_calls(
        Some("still working"),
        &[("get_weather", json!({"city": "Paris"}))],
        1,
        1,
    ));
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .build()
        .unwrap();

    let envelope = client.execute_request(&weather_request()).await.unwrap();

    assert_eq!(transport.calls(), 10);
    assert_eq!(envelope.timing.iterations, 10);
    assert_eq!(envelope.content, "still working");
    assert_eq!(envelope.tokens.total, 20);
    assert_eq!(envelope.tool_calls.unwrap().len(), 9);
}

#[tokio::test]
async fn iteration_cap_is_configurable() {
    let transport = StubTransport::repeating(openai_tool_calls(
        None,
        &[("get_weather", json!({"city": "Oslo"}))],
        0,
        0,
    ));
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .max_iterations(3)
        .build()
        .unwrap();

    let envelope = client.execute_request(&weather_request()).await.unwrap();
    assert_eq!(transport.calls(), 3);
    assert_eq!(envelope.timing.iterations, 3);
}

#[tokio::test]
async fn failed_tools_are_excluded_from_results_and_history() {
    let transport = StubTransport::new(vec![
        openai_tool_calls(
            None,
            &[
                ("flaky", json!({})),
                ("broken", json!({})),
                ("get_weather", json!({"city": "Paris"})),
            ],
            5,
            5,
        ),
        openai_text("Done.", 5, 5),
    ]);
    let executor = FnToolExecutor::new(|name, _args| async move {
        match name.as_str() {
            "flaky" => Ok(ToolOutcome::failure(json!("upstream timeout"))),
            "broken" => Err(anyhow::anyhow!("sandbox crashed")),
            _ => Ok(ToolOutcome::success(json!({"temp": 20}))),
        }
    });
    let request = weather_request().tools(vec![
        ToolDefinition::new("flaky", "", json!({"type": "object", "properties": {}})),
        ToolDefinition::new("broken", "", json!({"type": "object", "properties": {}})),
        ToolDefinition::new("get_weather", "", weather_schema()),
    ]);
    let client = builder("openai", transport.clone())
        .tool_executor(Arc::new(executor))
        .build()
        .unwrap();

    let envelope = client.execute_request(&request).await.unwrap();

    assert_eq!(envelope.content, "Done.");
    let records = envelope.tool_calls.as_ref().unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "get_weather");
    assert_eq!(envelope.tool_results.as_ref().unwrap().len(), 1);

    // Every executed tool is timed, successful or not.
    let tool_segments = envelope
        .timing
        .time_segments
        .iter()
        .filter(|s| s.kind == SegmentKind::Tool)
        .count();
    assert_eq!(tool_segments, 3);

    let body = transport.body(1);
    let tool_messages: Vec<&Value> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["role"] == "tool")
        .collect();
    assert_eq!(tool_messages.len(), 1);
}

#[tokio::test]
async fn all_tools_failing_omits_tool_lists() {
    let transport = StubTransport::new(vec![
        openai_tool_calls(None, &[("get_weather", json!({"city": "Paris"}))], 1, 1),
        openai_text("Sorry, no data.", 1, 1),
    ]);
    let executor = FnToolExecutor::new(|_name, _args| async move { Ok(ToolOutcome::failure(json!("down"))) });
    let client = builder("openai", transport.clone())
        .tool_executor(Arc::new(executor))
        .build()
        .unwrap();

    let envelope = client.execute_request(&weather_request()).await.unwrap();
    assert_eq!(transport.calls(), 2);
    assert!(envelope.tool_calls.is_none());
    assert!(envelope.tool_results.is_none());
    assert_eq!(envelope.content, "Sorry, no data.");
}

#[tokio::test]
async fn unknown_tools_are_skipped() {
    let transport = StubTransport::new(vec![
        openai_tool_calls(None, &[("launch_rockets", json!({}))], 1, 1),
        openai_text("ok", 1, 1),
    ]);
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .build()
        .unwrap();

    let envelope = client.execute_request(&weather_request()).await.unwrap();
    assert_eq!(transport.calls(), 2);
    assert!(envelope.tool_calls.is_none());
    assert!(!envelope
        .timing
        .time_segments
        .iter()
        .any(|s| s.kind == SegmentKind::Tool));
}

#[tokio::test]
async fn preset_params_merge_under_model_arguments() {
    let transport = StubTransport::new(vec![
        openai_tool_calls(None, &[("get_weather", json!({"city": "Paris"}))], 1, 1),
        openai_text("ok", 1, 1),
    ]);
    let mut presets = Map::new();
    presets.insert("city".into(), json!("Berlin"));
    presets.insert("units".into(), json!("metric"));
    let request = weather_request().tools(vec![
        ToolDefinition::new("get_weather", "", weather_schema()).with_params(presets),
    ]);
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .build()
        .unwrap();

    let envelope = client.execute_request(&request).await.unwrap();
    let args = &envelope.tool_calls.unwrap()[0].arguments;
    assert_eq!(args["city"], "Paris");
    assert_eq!(args["units"], "metric");
}

#[tokio::test]
async fn missing_usage_counts_as_zero() {
    let mut no_usage = openai_tool_calls(None, &[("get_weather", json!({"city": "Paris"}))], 0, 0);
    no_usage.as_object_mut().unwrap().remove("usage");
    let transport = StubTransport::new(vec![no_usage, openai_text("ok", 7, 3)]);
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .build()
        .unwrap();

    let envelope = client.execute_request(&weather_request()).await.unwrap();
    assert_eq!(envelope.tokens.prompt, 7);
    assert_eq!(envelope.tokens.completion, 3);
    assert_eq!(envelope.tokens.total, 10);
}

#[tokio::test]
async fn empty_final_text_keeps_earlier_content() {
    let transport = StubTransport::new(vec![
        openai_tool_calls(
            Some("Checking the forecast."),
            &[("get_weather", json!({"city": "Paris"}))],
            1,
            1,
        ),
        openai_text("", 1, 1),
    ]);
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .build()
        .unwrap();

    let envelope = client.execute_request(&weather_request()).await.unwrap();
    assert_eq!(envelope.content, "Checking the forecast.");
}

#[tokio::test]
async fn vendor_failure_aborts_with_timing() {
    let transport = StubTransport::scripted(vec![
        Ok(openai_tool_calls(None, &[("get_weather", json!({"city": "Paris"}))], 1, 1)),
        Err(Error::Remote {
            status: 503,
            class: "overloaded".into(),
            message: "try later".into(),
        }),
    ]);
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .build()
        .unwrap();

    let err = client.execute_request(&weather_request()).await.unwrap_err();

    assert_eq!(transport.calls(), 2);
    let timing = err.timing().expect("failure carries timing");
    assert!(timing.end_time >= timing.start_time);
    assert!(matches!(err.root(), Error::Remote { status: 503, .. }));
    assert!(err.to_string().contains("try later"));
}

#[tokio::test]
async fn unparseable_vendor_body_is_a_provider_error() {
    let transport = StubTransport::new(vec![json!({"unexpected": true})]);
    let client = builder("openai", transport.clone()).build().unwrap();

    let err = client
        .execute_request(&ProviderRequest::new("gpt-4o", "sk").messages(vec![Message::user("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Provider { .. }));
    assert!(matches!(err.root(), Error::Runtime { .. }));
}

#[tokio::test]
async fn history_function_turns_are_paired() {
    let transport = StubTransport::new(vec![openai_text("Still 20°C.", 1, 1)]);
    let client = builder("openai", transport.clone()).build().unwrap();

    let request = weather_request().messages(vec![
        Message::user("Weather in Paris?"),
        Message::function_call("get_weather", r#"{"city":"Paris"}"#),
        Message::function_result("get_weather", r#"{"temp":20}"#),
        Message::assistant("It is 20°C."),
        Message::user("And now?"),
    ]);
    client.execute_request(&request).await.unwrap();

    let messages = transport.body(0)["messages"].as_array().unwrap().clone();
    // system + five history turns
    assert_eq!(messages.len(), 6);
    let call_id = messages[2]["tool_calls"][0]["id"].as_str().unwrap().to_string();
    assert_eq!(messages[3]["role"], "tool");
    assert_eq!(messages[3]["tool_call_id"], call_id.as_str());
}

#[tokio::test]
async fn correlation_ids_are_unique_within_a_request() {
    let transport = StubTransport::new(vec![
        openai_tool_calls(
            None,
            &[
                ("get_weather", json!({"city": "Paris"})),
                ("get_weather", json!({"city": "Rome"})),
            ],
            1,
            1,
        ),
        openai_text("ok", 1, 1),
    ]);
    let client = builder("openai", transport.clone())
        .tool_executor(echo_executor())
        .build()
        .unwrap();

    client.execute_request(&weather_request()).await.unwrap();

    let body = transport.body(1);
    let ids: Vec<&str> = body["messages"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["role"] == "tool")
        .map(|m| m["tool_call_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn shared_client_serves_concurrent_requests() {
    let transport = StubTransport::repeating(openai_text("pong", 1, 1));
    let client = Arc::new(builder("openai", transport.clone()).build().unwrap());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let request = ProviderRequest::new("gpt-4o", "sk")
                    .messages(vec![Message::user(format!("ping {}", i))]);
                client.execute_request(&request).await
            })
        })
        .collect();

    for handle in handles {
        let envelope = handle.await.unwrap().unwrap();
        assert_eq!(envelope.content, "pong");
        assert_eq!(envelope.timing.iterations, 1);
    }
    assert_eq!(transport.calls(), 4);
}
