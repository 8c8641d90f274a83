//! HTTP behavior of the OpenAI-compatible provider against a local mock server

use conductor_provider::{
    ChatParams, Message, OpenAiCompatProvider, Provider, ProviderError, Tool, ToolCallDef,
};
use mockito::Matcher;
use serde_json::json;
use std::time::{Duration, Instant};

fn params() -> ChatParams {
    ChatParams {
        model: "test-model".to_string(),
        messages: vec![Message::user("What is 15% of 400?")],
        ..ChatParams::default()
    }
}

#[tokio::test]
async fn test_chat_returns_text() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(json!({"model": "test-model"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "choices": [{"message": {"content": "60"}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 3, "completion_tokens": 1, "total_tokens": 4}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let provider = OpenAiCompatProvider::new("sk-test", Some(server.url()), "fallback");
    let response = provider.chat(params()).await.unwrap();

    assert_eq!(response.content.as_deref(), Some("60"));
    assert_eq!(response.usage.total_tokens, 4);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_sends_string_arguments_and_parses_tool_calls() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_body(Matcher::PartialJson(json!({
            "messages": [
                {"role": "user"},
                {"role": "assistant", "tool_calls": [{
                    "id": "c0",
                    "function": {"name": "calculate_expression", "arguments": "{\"expression\":\"400*0.15\"}"}
                }]},
                {"role": "tool", "tool_call_id": "c0", "content": "60.0"}
            ],
            "tool_choice": "auto"
        })))
        .with_status(200)
        .with_body(
            json!({
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "c1",
                            "type": "function",
                            "function": {"name": "get_current_datetime", "arguments": "{}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let mut p = params();
    p.messages.push(Message::assistant_calls(
        None,
        vec![ToolCallDef::new(
            "c0",
            "calculate_expression",
            json!({"expression": "400*0.15"}),
        )],
    ));
    p.messages
        .push(Message::tool("c0", "calculate_expression", "60.0"));
    p.tools.push(Tool::new(
        "calculate_expression",
        "Evaluate arithmetic",
        json!({"type": "object"}),
    ));

    let provider = OpenAiCompatProvider::new("sk-test", Some(server.url()), "fallback");
    let response = provider.chat(p).await.unwrap();

    assert!(response.content.is_none());
    assert_eq!(response.tool_calls[0].id, "c1");
    assert_eq!(response.tool_calls[0].name, "get_current_datetime");
    assert_eq!(response.tool_calls[0].arguments, json!({}));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_chat_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body("{}")
        .create_async()
        .await;

    let provider = OpenAiCompatProvider::new("sk-test", Some(server.url()), "m");
    let result = provider.chat(params()).await;
    assert!(matches!(result, Err(ProviderError::RateLimited)));
}

#[tokio::test]
async fn test_chat_api_error_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_body(json!({"error": {"message": "unknown model"}}).to_string())
        .create_async()
        .await;

    let provider = OpenAiCompatProvider::new("sk-test", Some(server.url()), "m");
    match provider.chat(params()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "unknown model"),
        other => panic!("expected Api error, got {:?}", other.is_ok()),
    }
}

#[tokio::test]
async fn test_chat_without_key_fails_fast() {
    let provider = OpenAiCompatProvider::new("", Some("http://127.0.0.1:9".into()), "m");
    let result = provider.chat(params()).await;
    assert!(matches!(result, Err(ProviderError::NoApiKey)));
}

#[tokio::test]
async fn test_chat_times_out_on_silent_server() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let provider = OpenAiCompatProvider::new("sk-test", Some(base), "fallback")
        .with_timeout(Duration::from_millis(200));
    let started = Instant::now();
    let result = tokio::time::timeout(Duration::from_secs(5), provider.chat(params()))
        .await
        .expect("request should be bounded by the client timeout");

    match result {
        Err(ProviderError::Request(e)) => assert!(e.is_timeout()),
        other => panic!("expected a request timeout, got {:?}", other.map(|r| r.content)),
    }
    assert!(started.elapsed() < Duration::from_secs(5));
}
