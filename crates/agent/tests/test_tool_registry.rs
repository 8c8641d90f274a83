//! Tests for the tool registry

mod common;

use common::ProbeTool;
use conductor_agent::tools::{to_provider_tool, CalculatorTool, ToolRegistry, ToolTrait};
use conductor_agent::{AgentError, ToolErrorKind};
use serde_json::json;
use std::time::Duration;

fn calculator_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    for tool in CalculatorTool::ALL {
        registry.register(tool).unwrap();
    }
    registry
}

#[test]
fn test_registry_new() {
    let registry = ToolRegistry::new();
    assert!(registry.is_empty());
    assert!(registry.names().is_empty());
}

#[test]
fn test_registry_keeps_insertion_order() {
    let registry = calculator_registry();
    assert_eq!(
        registry.names(),
        vec![
            "calculate_expression",
            "get_current_datetime",
            "sort_values_based_on_key",
            "get_length_of_object"
        ]
    );
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_registry_rejects_duplicate_name() {
    let mut registry = calculator_registry();
    let err = registry
        .register(CalculatorTool::CalculateExpression)
        .unwrap_err();
    assert!(matches!(err, AgentError::DuplicateTool(ref n) if n == "calculate_expression"));
    assert_eq!(registry.len(), 4);
}

#[test]
fn test_registry_get() {
    let registry = calculator_registry();
    assert_eq!(
        registry.get("get_current_datetime").unwrap().name(),
        "get_current_datetime"
    );
    assert!(registry.get("eval").is_none());
    assert!(!registry.has("eval"));
}

#[test]
fn test_definitions_match_tools() {
    let registry = calculator_registry();
    let defs = registry.definitions();
    assert_eq!(defs.len(), 4);
    assert_eq!(defs[0].name(), "calculate_expression");
    assert_eq!(defs[0].tool_type, "function");
    assert_eq!(
        defs[0].function.parameters["required"],
        json!(["expression"])
    );

    let single = to_provider_tool(&CalculatorTool::LengthOf);
    assert_eq!(single.name(), "get_length_of_object");
}

#[tokio::test]
async fn test_execute_by_name() {
    let registry = calculator_registry();
    let outcome = registry
        .execute("calculate_expression", json!({"expression": "3 + 4 * 2"}))
        .await
        .unwrap();
    assert_eq!(outcome.render(), "11");
}

#[tokio::test]
async fn test_execute_unknown_tool_is_typed_error() {
    let registry = calculator_registry();
    let err = registry.execute("drop_tables", json!({})).await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownTool(ref n) if n == "drop_tables"));
    assert!(err.to_string().contains("TOOL NOT FOUND"));
}

#[tokio::test]
async fn test_execute_bad_arguments() {
    let registry = calculator_registry();
    let outcome = registry
        .execute("calculate_expression", json!({"expr": "1 + 1"}))
        .await
        .unwrap();
    assert_eq!(outcome.error_kind(), Some(ToolErrorKind::InvalidArguments));
}

#[tokio::test]
async fn test_whitelist_rejects_before_evaluating() {
    let registry = calculator_registry();
    for expr in ["2 ** 3; import os", "__import__('os')", "1e3", "2\t+ 2", "abs(-1)"] {
        let outcome = registry
            .execute("calculate_expression", json!({"expression": expr}))
            .await
            .unwrap();
        assert_eq!(
            outcome.error_kind(),
            Some(ToolErrorKind::Validation),
            "{} should be rejected",
            expr
        );
        assert!(outcome.render().contains("Rejected expression"));
    }
}

#[test]
fn test_registry_accepts_shared_tools() {
    let mut registry = ToolRegistry::new();
    registry
        .register_shared(std::sync::Arc::new(ProbeTool::new(
            "probe",
            Duration::ZERO,
        )))
        .unwrap();
    assert!(registry.has("probe"));
    assert!(format!("{:?}", registry).contains("probe"));
}
