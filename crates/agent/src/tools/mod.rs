//! Capability tools
//!
//! Every tool, raw or wrapping a whole sub-agent, is invoked the same way:
//! `(name, description, schema, execute)`. Faults never leave a tool as
//! `Err`; they come back as a tagged [`ToolOutcome`].

pub mod calculator;
pub mod database;
pub mod expression;
pub mod web;

pub use calculator::CalculatorTool;
pub use database::{DatabaseTool, StorageTool};
pub use web::WebSearchTool;

use async_trait::async_trait;
use conductor_provider::Tool;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;

use crate::{AgentError, Result};

/// Failure category carried by an error-shaped tool result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    UnknownTool,
    InvalidArguments,
    Validation,
    Resource,
    Timeout,
    Exhausted,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::InvalidArguments => "invalid_arguments",
            ToolErrorKind::Validation => "validation",
            ToolErrorKind::Resource => "resource",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::Exhausted => "exhausted",
        }
    }
}

impl fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tagged result of one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ToolOutcome {
    Ok { payload: Value },
    Err { kind: ToolErrorKind, message: String },
}

impl ToolOutcome {
    pub fn ok(payload: impl Into<Value>) -> Self {
        ToolOutcome::Ok {
            payload: payload.into(),
        }
    }

    pub fn error(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        ToolOutcome::Err {
            kind,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ToolOutcome::Ok { .. })
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        match self {
            ToolOutcome::Ok { .. } => None,
            ToolOutcome::Err { kind, .. } => Some(*kind),
        }
    }

    /// Short tag for logs: `ok` or the error kind
    pub fn tag(&self) -> &'static str {
        match self {
            ToolOutcome::Ok { .. } => "ok",
            ToolOutcome::Err { kind, .. } => kind.as_str(),
        }
    }

    /// Text folded into the calling agent's context
    pub fn render(&self) -> String {
        match self {
            ToolOutcome::Ok {
                payload: Value::String(text),
            } => text.clone(),
            ToolOutcome::Ok { payload } => payload.to_string(),
            ToolOutcome::Err { kind, message } => {
                json!({ "error": message, "kind": kind }).to_string()
            }
        }
    }
}

/// Deserialize tool arguments into a typed struct
pub fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> std::result::Result<T, ToolOutcome> {
    // Models sometimes send `null` for tools without parameters
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args).map_err(|e| {
        ToolOutcome::error(
            ToolErrorKind::InvalidArguments,
            format!("Invalid arguments for '{}': {}", tool, e),
        )
    })
}

/// Uniform tool interface
#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(&self, args: Value) -> ToolOutcome;
}

pub fn to_provider_tool(tool: &dyn ToolTrait) -> Tool {
    Tool::new(tool.name(), tool.description(), tool.parameters())
}

/// Insertion-ordered tool set with unique names
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn ToolTrait>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_shared(Arc::new(tool))
    }

    pub fn register_shared(&mut self, tool: Arc<dyn ToolTrait>) -> Result<()> {
        if self.has(tool.name()) {
            return Err(AgentError::DuplicateTool(tool.name().to_string()));
        }
        self.tools.push(tool);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn ToolTrait> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn definitions(&self) -> Vec<Tool> {
        self.tools.iter().map(|t| to_provider_tool(t.as_ref())).collect()
    }

    /// Invoke a tool by name; unregistered names are rejected
    pub async fn execute(&self, name: &str, args: Value) -> Result<ToolOutcome> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))?;
        Ok(tool.execute(args).await)
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_ok_string_verbatim() {
        assert_eq!(ToolOutcome::ok("60").render(), "60");
        assert_eq!(ToolOutcome::ok(json!(60)).render(), "60");
        assert_eq!(ToolOutcome::ok(json!(2.0)).render(), "2.0");
        assert_eq!(
            ToolOutcome::ok(json!({"row_count": 0})).render(),
            r#"{"row_count":0}"#
        );
    }

    #[test]
    fn test_render_error_shape() {
        let outcome = ToolOutcome::error(ToolErrorKind::Validation, "division by zero");
        let rendered: Value = serde_json::from_str(&outcome.render()).unwrap();
        assert_eq!(rendered["error"], "division by zero");
        assert_eq!(rendered["kind"], "validation");
        assert_eq!(outcome.tag(), "validation");
        assert!(!outcome.is_ok());
    }

    #[test]
    fn test_parse_args_null_is_empty_object() {
        #[derive(Deserialize)]
        struct NoArgs {}
        let parsed: std::result::Result<NoArgs, _> = parse_args("get_tables_from_db", Value::Null);
        assert!(parsed.is_ok());
    }

    #[test]
    fn test_parse_args_reports_tool() {
        #[derive(Debug, Deserialize)]
        #[allow(dead_code)]
        struct Args {
            expression: String,
        }
        let err = parse_args::<Args>("calculate_expression", json!({"expr": 1})).unwrap_err();
        assert_eq!(err.error_kind(), Some(ToolErrorKind::InvalidArguments));
        assert!(err.render().contains("calculate_expression"));
    }
}
