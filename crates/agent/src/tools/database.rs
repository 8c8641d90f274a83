//! Demo database tools
//!
//! Thin wrappers over the read-only [`Storage`] handle. Queries run on the
//! blocking pool so a slow scan never stalls the reactor.

use async_trait::async_trait;
use conductor_provider::{object_schema, ParamSpec, ParamType};
use conductor_storage::{Storage, StorageError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{parse_args, ToolErrorKind, ToolOutcome, ToolRegistry, ToolTrait};
use crate::Result;

/// Operations the database agent can call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseTool {
    GetTables,
    ColumnInfo,
    AllData,
    FilterNumeric,
    FilterInclusion,
    FilterLike,
    JoinTables,
}

impl DatabaseTool {
    pub const ALL: [DatabaseTool; 7] = [
        DatabaseTool::GetTables,
        DatabaseTool::ColumnInfo,
        DatabaseTool::AllData,
        DatabaseTool::FilterNumeric,
        DatabaseTool::FilterInclusion,
        DatabaseTool::FilterLike,
        DatabaseTool::JoinTables,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tool_name() == name)
    }

    pub fn tool_name(&self) -> &'static str {
        match self {
            DatabaseTool::GetTables => "get_tables_from_db",
            DatabaseTool::ColumnInfo => "get_column_info_from_table",
            DatabaseTool::AllData => "get_all_data_from_table",
            DatabaseTool::FilterNumeric => "filter_data_by_numeric_condition",
            DatabaseTool::FilterInclusion => "filter_data_by_inclusion",
            DatabaseTool::FilterLike => "filter_data_by_like",
            DatabaseTool::JoinTables => "join_tables_on_column",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            DatabaseTool::GetTables => "List every table in the database, sorted by name.",
            DatabaseTool::ColumnInfo => {
                "Describe the columns of a table: name, type, nullability, default and primary key."
            }
            DatabaseTool::AllData => "Return every row of a table.",
            DatabaseTool::FilterNumeric => {
                "Return rows whose numeric column lies within inclusive bounds. \
                 Give gte, lte, or both."
            }
            DatabaseTool::FilterInclusion => {
                "Return rows whose column value equals one of the given values."
            }
            DatabaseTool::FilterLike => {
                "Return rows whose column matches a SQL LIKE pattern, e.g. '%Research%'."
            }
            DatabaseTool::JoinTables => {
                "Inner join two tables where left.join_column_left = right.join_column_right. \
                 Each row is nested by table name."
            }
        }
    }

    fn parameters(&self) -> Value {
        let table = || ParamSpec::required("table_name", ParamType::String, "Table name");
        let column = || ParamSpec::required("column_name", ParamType::String, "Column name");
        match self {
            DatabaseTool::GetTables => object_schema(&[]),
            DatabaseTool::ColumnInfo | DatabaseTool::AllData => object_schema(&[table()]),
            DatabaseTool::FilterNumeric => object_schema(&[
                table(),
                column(),
                ParamSpec::optional("gte", ParamType::Number, "Lower bound, inclusive"),
                ParamSpec::optional("lte", ParamType::Number, "Upper bound, inclusive"),
            ]),
            DatabaseTool::FilterInclusion => object_schema(&[
                table(),
                column(),
                ParamSpec::required("include_values", ParamType::Array, "Values to match")
                    .with_items(json!({"type": "string"})),
            ]),
            DatabaseTool::FilterLike => object_schema(&[
                table(),
                column(),
                ParamSpec::required("like_pattern", ParamType::String, "SQL LIKE pattern"),
            ]),
            DatabaseTool::JoinTables => object_schema(&[
                ParamSpec::required("left_table", ParamType::String, "Left table"),
                ParamSpec::required("right_table", ParamType::String, "Right table"),
                ParamSpec::required(
                    "join_column_left",
                    ParamType::String,
                    "Join column in the left table",
                ),
                ParamSpec::required(
                    "join_column_right",
                    ParamType::String,
                    "Join column in the right table",
                ),
            ]),
        }
    }
}

#[derive(Deserialize)]
struct TableArgs {
    table_name: String,
}

#[derive(Deserialize)]
struct NumericArgs {
    table_name: String,
    column_name: String,
    gte: Option<f64>,
    lte: Option<f64>,
}

#[derive(Deserialize)]
struct InclusionArgs {
    table_name: String,
    column_name: String,
    include_values: Vec<Value>,
}

#[derive(Deserialize)]
struct LikeArgs {
    table_name: String,
    column_name: String,
    like_pattern: String,
}

#[derive(Deserialize)]
struct JoinArgs {
    left_table: String,
    right_table: String,
    join_column_left: String,
    join_column_right: String,
}

/// One database operation bound to a storage handle
#[derive(Clone)]
pub struct StorageTool {
    kind: DatabaseTool,
    storage: Storage,
}

impl StorageTool {
    pub fn new(kind: DatabaseTool, storage: Storage) -> Self {
        Self { kind, storage }
    }

    /// Registry holding every database operation
    pub fn registry(storage: &Storage) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for kind in DatabaseTool::ALL {
            registry.register(StorageTool::new(kind, storage.clone()))?;
        }
        Ok(registry)
    }

    /// Parse arguments, then run `query` against storage on the blocking pool
    async fn run<A, R, F>(&self, args: Value, query: F) -> ToolOutcome
    where
        A: DeserializeOwned + Send + 'static,
        R: Serialize + Send + 'static,
        F: FnOnce(&Storage, A) -> conductor_storage::Result<R> + Send + 'static,
    {
        let args: A = match parse_args(self.kind.tool_name(), args) {
            Ok(args) => args,
            Err(outcome) => return outcome,
        };
        let storage = self.storage.clone();
        let joined = tokio::task::spawn_blocking(move || query(&storage, args)).await;

        match joined {
            Ok(Ok(result)) => match serde_json::to_value(result) {
                Ok(payload) => ToolOutcome::ok(payload),
                Err(e) => ToolOutcome::error(ToolErrorKind::Resource, e.to_string()),
            },
            Ok(Err(e)) => storage_error(e),
            Err(e) => ToolOutcome::error(
                ToolErrorKind::Resource,
                format!("database task aborted: {}", e),
            ),
        }
    }
}

fn storage_error(err: StorageError) -> ToolOutcome {
    let kind = if err.is_validation() {
        ToolErrorKind::Validation
    } else {
        ToolErrorKind::Resource
    };
    ToolOutcome::error(kind, err.to_string())
}

#[derive(Deserialize)]
struct NoArgs {}

#[async_trait]
impl ToolTrait for StorageTool {
    fn name(&self) -> &str {
        self.kind.tool_name()
    }

    fn description(&self) -> &str {
        self.kind.description()
    }

    fn parameters(&self) -> Value {
        self.kind.parameters()
    }

    async fn execute(&self, args: Value) -> ToolOutcome {
        debug!("◆ DB {} {}", self.kind.tool_name(), args);
        match self.kind {
            DatabaseTool::GetTables => {
                self.run(args, |s, _: NoArgs| s.list_tables()).await
            }
            DatabaseTool::ColumnInfo => {
                self.run(args, |s, a: TableArgs| s.describe_columns(&a.table_name))
                    .await
            }
            DatabaseTool::AllData => {
                self.run(args, |s, a: TableArgs| s.all_rows(&a.table_name))
                    .await
            }
            DatabaseTool::FilterNumeric => {
                self.run(args, |s, a: NumericArgs| {
                    s.filter_numeric(&a.table_name, &a.column_name, a.gte, a.lte)
                })
                .await
            }
            DatabaseTool::FilterInclusion => {
                self.run(args, |s, a: InclusionArgs| {
                    s.filter_inclusion(&a.table_name, &a.column_name, &a.include_values)
                })
                .await
            }
            DatabaseTool::FilterLike => {
                self.run(args, |s, a: LikeArgs| {
                    s.filter_like(&a.table_name, &a.column_name, &a.like_pattern)
                })
                .await
            }
            DatabaseTool::JoinTables => {
                self.run(args, |s, a: JoinArgs| {
                    s.join(
                        &a.left_table,
                        &a.right_table,
                        &a.join_column_left,
                        &a.join_column_right,
                    )
                })
                .await
            }
        }
    }
}
