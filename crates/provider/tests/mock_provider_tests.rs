//! Mock Provider Tests
//!
//! The `Provider` trait must stay mockable: every agent in the
//! orchestrator is driven through it.

use async_trait::async_trait;
use mockall::mock;
use conductor_provider::{
    ChatParams, ChatResponse, Message, Provider, ProviderError, Tool, ToolCall, ToolChoice,
};
use serde_json::json;

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

#[tokio::test]
async fn test_mock_provider_final_text() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("There are 20 users.")));

    let response = mock.chat(ChatParams::default()).await.unwrap();
    assert_eq!(response.content.as_deref(), Some("There are 20 users."));
    assert!(!response.has_tool_calls());
}

#[tokio::test]
async fn test_mock_provider_requests_sub_agent() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .withf(|params| {
            params.messages.len() == 2
                && params.messages[0].is_role("system")
                && params.tools.iter().any(|t| t.name() == "call_sql_agent")
        })
        .returning(|_| {
            Ok(ChatResponse::tool_calls(vec![ToolCall::new(
                "call_1",
                "call_sql_agent",
                json!({"input_text": "How many users are there?"}),
            )]))
        });

    let params = ChatParams {
        model: "coordinator".to_string(),
        messages: vec![
            Message::system("You coordinate specialists."),
            Message::user("How many users are there?"),
        ],
        tools: vec![Tool::new(
            "call_sql_agent",
            "Ask the database specialist",
            json!({"type": "object", "properties": {"input_text": {"type": "string"}}}),
        )],
        ..ChatParams::default()
    };

    let response = mock.chat(params).await.unwrap();
    assert_eq!(response.tool_calls[0].name, "call_sql_agent");
    assert_eq!(
        response.tool_calls[0].arguments["input_text"],
        "How many users are there?"
    );
}

#[tokio::test]
async fn test_mock_provider_forced_tool_choice() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .withf(|params| params.tool_choice == ToolChoice::Required("submit_verdict".into()))
        .returning(|_| {
            Ok(ChatResponse::tool_calls(vec![ToolCall::new(
                "v",
                "submit_verdict",
                json!({"explanation": "matches", "is_answer_correct": true}),
            )]))
        });

    let params = ChatParams {
        tool_choice: ToolChoice::Required("submit_verdict".into()),
        ..ChatParams::default()
    };
    let response = mock.chat(params).await.unwrap();
    assert_eq!(response.tool_calls[0].arguments["is_answer_correct"], true);
}

#[tokio::test]
async fn test_mock_provider_errors_propagate() {
    let mut mock = MockProvider::new();
    let mut seq = mockall::Sequence::new();
    mock.expect_chat()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(ProviderError::RateLimited));
    mock.expect_chat()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(ProviderError::Api("model not found".into())));

    assert!(matches!(
        mock.chat(ChatParams::default()).await,
        Err(ProviderError::RateLimited)
    ));
    match mock.chat(ChatParams::default()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "model not found"),
        other => panic!("expected Api error, got {:?}", other.map(|r| r.content)),
    }
}

#[test]
fn test_mock_provider_metadata() {
    let mut mock = MockProvider::new();
    mock.expect_default_model()
        .returning(|| "google/gemini-2.5-flash".to_string());
    mock.expect_is_configured().returning(|| false);

    assert_eq!(mock.default_model(), "google/gemini-2.5-flash");
    assert!(!mock.is_configured());
}

#[tokio::test]
async fn test_mock_provider_as_trait_object() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|params| {
            let last = params
                .messages
                .last()
                .and_then(|m| m.content.clone())
                .unwrap_or_default();
            Ok(ChatResponse::text(format!("echo: {}", last)))
        });

    let provider: std::sync::Arc<dyn Provider> = std::sync::Arc::new(mock);
    let params = ChatParams {
        messages: vec![Message::user("ping")],
        ..ChatParams::default()
    };
    let response = provider.chat(params).await.unwrap();
    assert_eq!(response.content.as_deref(), Some("echo: ping"));
}
