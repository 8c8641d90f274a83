//! Arithmetic and clock tools

use async_trait::async_trait;
use conductor_provider::{object_schema, ParamSpec, ParamType};
use serde::Deserialize;
use serde_json::Value;
use std::cmp::Ordering;
use tracing::debug;

use super::expression::{self, ExprError};
use super::{parse_args, ToolErrorKind, ToolOutcome, ToolTrait};

/// Tools available to the calculator agent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculatorTool {
    CalculateExpression,
    CurrentDatetime,
    SortValues,
    LengthOf,
}

impl CalculatorTool {
    pub const ALL: [CalculatorTool; 4] = [
        CalculatorTool::CalculateExpression,
        CalculatorTool::CurrentDatetime,
        CalculatorTool::SortValues,
        CalculatorTool::LengthOf,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tool_name() == name)
    }

    fn tool_name(&self) -> &'static str {
        match self {
            CalculatorTool::CalculateExpression => "calculate_expression",
            CalculatorTool::CurrentDatetime => "get_current_datetime",
            CalculatorTool::SortValues => "sort_values_based_on_key",
            CalculatorTool::LengthOf => "get_length_of_object",
        }
    }
}

#[derive(Deserialize)]
struct ExpressionArgs {
    expression: String,
}

#[derive(Deserialize)]
struct SortArgs {
    values: Vec<Value>,
    key: String,
}

#[derive(Deserialize)]
struct LengthArgs {
    obj: Value,
}

#[async_trait]
impl ToolTrait for CalculatorTool {
    fn name(&self) -> &str {
        self.tool_name()
    }

    fn description(&self) -> &str {
        match self {
            CalculatorTool::CalculateExpression => {
                "Evaluate an arithmetic expression. Allowed characters: digits, + - * / ( ) . and spaces. \
                 Supports // (floor division) and ** (power)."
            }
            CalculatorTool::CurrentDatetime => {
                "Return the current local date and time as 'YYYY-MM-DD HH:MM:SS'."
            }
            CalculatorTool::SortValues => {
                "Sort a list of objects in ascending order of the given key. Missing keys count as 0."
            }
            CalculatorTool::LengthOf => "Return the length of a list, object or string.",
        }
    }

    fn parameters(&self) -> Value {
        match self {
            CalculatorTool::CalculateExpression => object_schema(&[ParamSpec::required(
                "expression",
                ParamType::String,
                "Arithmetic expression, e.g. '12 * (3 + 2)'",
            )]),
            CalculatorTool::CurrentDatetime => object_schema(&[]),
            CalculatorTool::SortValues => object_schema(&[
                ParamSpec::required("values", ParamType::Array, "List of objects to sort")
                    .with_items(serde_json::json!({"type": "object"})),
                ParamSpec::required("key", ParamType::String, "Key to sort by"),
            ]),
            CalculatorTool::LengthOf => object_schema(&[ParamSpec::required(
                "obj",
                ParamType::Any,
                "List, object or string to measure",
            )]),
        }
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        match self {
            CalculatorTool::CalculateExpression => {
                match parse_args::<ExpressionArgs>(self.tool_name(), args) {
                    Ok(args) => calculate(&args.expression),
                    Err(outcome) => outcome,
                }
            }
            CalculatorTool::CurrentDatetime => ToolOutcome::ok(current_datetime()),
            CalculatorTool::SortValues => match parse_args::<SortArgs>(self.tool_name(), args) {
                Ok(args) => sort_by_key(args.values, &args.key),
                Err(outcome) => outcome,
            },
            CalculatorTool::LengthOf => match parse_args::<LengthArgs>(self.tool_name(), args) {
                Ok(args) => length_of(&args.obj),
                Err(outcome) => outcome,
            },
        }
    }
}

fn calculate(expr: &str) -> ToolOutcome {
    debug!("◆ CALCULATE {}", expr);
    match expression::evaluate(expr) {
        Ok(number) => ToolOutcome::ok(number.to_json()),
        Err(e @ ExprError::InvalidCharacter(_)) => ToolOutcome::error(
            ToolErrorKind::Validation,
            format!("Rejected expression: {}", e),
        ),
        Err(e) => ToolOutcome::error(
            ToolErrorKind::Validation,
            format!("Calculation failed: {}", e),
        ),
    }
}

pub fn current_datetime() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[derive(Debug, PartialEq, PartialOrd)]
enum SortKey {
    Num(f64),
    Text(String),
}

fn sort_key(item: &Value, key: &str) -> Result<SortKey, String> {
    let obj = item
        .as_object()
        .ok_or_else(|| format!("cannot read key '{}' from non-object value {}", key, item))?;
    match obj.get(key) {
        None => Ok(SortKey::Num(0.0)),
        Some(Value::Number(n)) => Ok(SortKey::Num(n.as_f64().unwrap_or(0.0))),
        Some(Value::Bool(b)) => Ok(SortKey::Num(if *b { 1.0 } else { 0.0 })),
        Some(Value::String(s)) => Ok(SortKey::Text(s.clone())),
        Some(other) => Err(format!("value {} under key '{}' is not sortable", other, key)),
    }
}

fn sort_by_key(values: Vec<Value>, key: &str) -> ToolOutcome {
    let keys = match values
        .iter()
        .map(|v| sort_key(v, key))
        .collect::<Result<Vec<_>, _>>()
    {
        Ok(keys) => keys,
        Err(message) => return ToolOutcome::error(ToolErrorKind::Validation, message),
    };

    let numeric = keys.iter().filter(|k| matches!(k, SortKey::Num(_))).count();
    if numeric != 0 && numeric != keys.len() {
        return ToolOutcome::error(
            ToolErrorKind::Validation,
            format!("values under key '{}' mix numbers and text", key),
        );
    }

    let mut paired: Vec<(SortKey, Value)> = keys.into_iter().zip(values).collect();
    // Stable, so ties keep their input order
    paired.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));
    ToolOutcome::ok(Value::Array(paired.into_iter().map(|(_, v)| v).collect()))
}

fn length_of(obj: &Value) -> ToolOutcome {
    let length = match obj {
        Value::Array(items) => items.len(),
        Value::Object(map) => map.len(),
        Value::String(s) => s.chars().count(),
        other => {
            let type_name = match other {
                Value::Null => "null",
                Value::Bool(_) => "boolean",
                _ => "number",
            };
            return ToolOutcome::error(
                ToolErrorKind::Validation,
                format!("object of type '{}' has no length", type_name),
            );
        }
    };
    ToolOutcome::ok(length)
}
