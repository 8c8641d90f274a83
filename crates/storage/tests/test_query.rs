//! Query operations against a small fixture database

use conductor_storage::{Storage, StorageError, StorageOptions};
use rusqlite::Connection;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

fn fixture() -> (TempDir, Storage) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("fixture.db");
    build_fixture(&path);
    let storage = Storage::open(&path, StorageOptions::default());
    (dir, storage)
}

fn build_fixture(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, age INTEGER);
         CREATE TABLE projects (id INTEGER PRIMARY KEY, title TEXT NOT NULL, budget REAL);
         CREATE TABLE project_users (project_id INTEGER, user_id INTEGER);
         INSERT INTO users VALUES (1, 'Minji Park', 31), (2, 'Joon Kim', 45), (3, 'Hana Lee', 27);
         INSERT INTO projects VALUES
            (1, 'Atlas Data Platform', 8000),
            (2, 'Beacon Mobile App', 10000),
            (3, 'Comet Search Revamp', 10000.5),
            (4, 'Delta Billing Migration', 2500),
            (5, 'Ember Analytics', 'unknown'),
            (6, 'Falcon Research', NULL);
         INSERT INTO project_users VALUES (1, 1), (1, 2), (2, 3);",
    )
    .unwrap();
}

#[test]
fn test_list_tables_sorted_and_idempotent() {
    let (_dir, storage) = fixture();
    let first = storage.list_tables().unwrap();
    let second = storage.list_tables().unwrap();
    assert_eq!(first, vec!["project_users", "projects", "users"]);
    assert_eq!(first, second);
}

#[test]
fn test_describe_columns() {
    let (_dir, storage) = fixture();
    let columns = storage.describe_columns("projects").unwrap();
    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["id", "title", "budget"]);
    assert!(columns[0].primary_key);
    assert!(!columns[1].nullable);
    assert_eq!(columns[2].data_type, "REAL");
}

#[test]
fn test_describe_unknown_table() {
    let (_dir, storage) = fixture();
    let err = storage.describe_columns("accounts").unwrap_err();
    assert!(matches!(err, StorageError::TableNotFound(ref t) if t == "accounts"));
}

#[test]
fn test_all_rows_shape() {
    let (_dir, storage) = fixture();
    let result = storage.all_rows("users").unwrap();
    assert_eq!(result.table, "users");
    assert_eq!(result.columns, vec!["id", "name", "age"]);
    assert_eq!(result.row_count, 3);
    assert!(result.filters.is_none());
    assert_eq!(result.rows[1]["name"], "Joon Kim");

    let value = serde_json::to_value(&result).unwrap();
    assert!(value.get("filters").is_none());
    assert_eq!(value["row_count"], 3);
}

#[test]
fn test_filter_numeric_inclusive_bounds() {
    let (_dir, storage) = fixture();
    let result = storage
        .filter_numeric("projects", "budget", Some(2500.0), Some(10000.0))
        .unwrap();

    let ids: Vec<i64> = result.rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 4]);
    for row in &result.rows {
        let budget = row["budget"].as_f64().unwrap();
        assert!((2500.0..=10000.0).contains(&budget));
    }
    assert_eq!(
        result.filters,
        Some(json!({"column": "budget", "gte": 2500.0, "lte": 10000.0}))
    );
}

#[test]
fn test_filter_numeric_upper_bound_sum() {
    let (_dir, storage) = fixture();
    let result = storage
        .filter_numeric("projects", "budget", None, Some(10000.0))
        .unwrap();
    let total: f64 = result
        .rows
        .iter()
        .map(|r| r["budget"].as_f64().unwrap())
        .sum();
    assert_eq!(result.row_count, 3);
    assert_eq!(total, 20500.0);
    assert!(result.filters.as_ref().unwrap().get("gte").is_none());
}

#[test]
fn test_filter_numeric_without_bounds_returns_all() {
    let (_dir, storage) = fixture();
    let result = storage.filter_numeric("projects", "budget", None, None).unwrap();
    assert_eq!(result.row_count, 6);
}

#[test]
fn test_filter_unknown_column_names_it() {
    let (_dir, storage) = fixture();
    let err = storage
        .filter_numeric("projects", "cost", None, Some(1.0))
        .unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("'cost'"));

    let err = storage.filter_like("users", "nickname", "%a%").unwrap_err();
    assert!(err.to_string().contains("'nickname'"));
}

#[test]
fn test_filter_inclusion() {
    let (_dir, storage) = fixture();
    let result = storage
        .filter_inclusion("users", "name", &[json!("Hana Lee"), json!("Nobody")])
        .unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["id"], 3);
    assert_eq!(
        result.filters.unwrap()["include_values"],
        json!(["Hana Lee", "Nobody"])
    );

    let result = storage
        .filter_inclusion("users", "id", &[json!(1), json!(2)])
        .unwrap();
    assert_eq!(result.row_count, 2);
}

#[test]
fn test_filter_inclusion_empty_list() {
    let (_dir, storage) = fixture();
    let result = storage.filter_inclusion("users", "id", &[]).unwrap();
    assert_eq!(result.row_count, 0);
    assert!(result.rows.is_empty());
}

#[test]
fn test_filter_like() {
    let (_dir, storage) = fixture();
    let result = storage.filter_like("projects", "title", "%Research%").unwrap();
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["title"], "Falcon Research");
    assert_eq!(result.filters.unwrap()["like"], "%Research%");
}

#[test]
fn test_join_nests_rows_by_table() {
    let (_dir, storage) = fixture();
    let result = storage
        .join("project_users", "users", "user_id", "id")
        .unwrap();

    assert_eq!(result.row_count, 3);
    assert_eq!(result.left_table, "project_users");
    assert_eq!(result.join_on.right_column, "id");
    assert_eq!(result.columns["users"], json!(["id", "name", "age"]));

    let first = &result.rows[0];
    assert_eq!(first["project_users"]["user_id"], first["users"]["id"]);
}

#[test]
fn test_self_join_keeps_both_sides() {
    let (_dir, storage) = fixture();
    let result = storage.join("users", "users", "id", "id").unwrap();
    assert_eq!(result.row_count, 3);
    assert!(result.rows[0].contains_key("users"));
    assert!(result.rows[0].contains_key("users_right"));
}

#[test]
fn test_join_unknown_right_column() {
    let (_dir, storage) = fixture();
    let err = storage
        .join("project_users", "users", "user_id", "uid")
        .unwrap_err();
    match err {
        StorageError::ColumnNotFound { table, column } => {
            assert_eq!(table, "users");
            assert_eq!(column, "uid");
        }
        other => panic!("unexpected error: {}", other),
    }
}

#[test]
fn test_handle_is_read_only() {
    let (_dir, storage) = fixture();
    let conn = storage.conn().unwrap();
    let result = conn.execute("DELETE FROM users", []);
    assert!(result.is_err());
    drop(conn);
    assert_eq!(storage.all_rows("users").unwrap().row_count, 3);
}

#[test]
fn test_missing_database_is_resource_error() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Storage::open(
        dir.path().join("absent.db"),
        StorageOptions {
            pool_size: 1,
            connection_timeout: Duration::from_millis(200),
        },
    );
    let err = storage.list_tables().unwrap_err();
    assert!(!err.is_validation());
    assert!(matches!(err, StorageError::Pool(_)));
}

#[test]
fn test_concurrent_readers() {
    let (_dir, storage) = fixture();
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let storage = storage.clone();
            std::thread::spawn(move || storage.filter_numeric("projects", "budget", None, Some(10000.0)))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap().row_count, 3);
    }
}
