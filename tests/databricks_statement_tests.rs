//! Databricks backend integration tests
//!
//! Statement Execution API traffic is served by `FakeTransport`; no network.

use medallion::http::{FakeTransport, Transport};
use medallion::warehouse::{DatabricksWarehouse, Warehouse, WarehouseError};

fn warehouse(transport: FakeTransport) -> DatabricksWarehouse {
    DatabricksWarehouse::with_transport(
        "dbc-123.cloud.databricks.com".to_string(),
        "dapi-secret".to_string(),
        "wh-42".to_string(),
        "main".to_string(),
        Transport::Fake(transport),
    )
}

fn succeeded(columns: &[&str], rows: serde_json::Value) -> String {
    let columns: Vec<serde_json::Value> = columns
        .iter()
        .map(|c| serde_json::json!({ "name": c }))
        .collect();
    serde_json::json!({
        "statement_id": "01ef",
        "status": { "state": "SUCCEEDED" },
        "manifest": { "schema": { "columns": columns } },
        "result": { "data_array": rows }
    })
    .to_string()
}

fn requests(warehouse: &DatabricksWarehouse) -> Vec<medallion::http::RecordedRequest> {
    warehouse
        .transport()
        .as_fake()
        .map(|fake| fake.requests())
        .unwrap_or_default()
}

// =============================================================================
// Request shape
// =============================================================================

#[test]
fn test_statement_request_shape() {
    let body = succeeded(
        &["database", "tableName", "isTemporary"],
        serde_json::json!([["bronze", "raw_customers", "false"], ["bronze", "raw_orders", "false"]]),
    );
    let warehouse = warehouse(FakeTransport::new(&body));

    let tables = warehouse.list_tables("bronze").unwrap();
    assert_eq!(tables, vec!["raw_customers", "raw_orders"]);

    let sent = requests(&warehouse);
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].url,
        "https://dbc-123.cloud.databricks.com/api/2.0/sql/statements"
    );
    assert!(sent[0]
        .headers
        .contains(&("Authorization".to_string(), "Bearer dapi-secret".to_string())));

    let payload: serde_json::Value = serde_json::from_str(&sent[0].body).unwrap();
    assert_eq!(payload["statement"], "SHOW TABLES IN main.bronze");
    assert_eq!(payload["warehouse_id"], "wh-42");
    assert_eq!(payload["catalog"], "main");
    assert_eq!(payload["wait_timeout"], "30s");
    assert_eq!(payload["disposition"], "INLINE");
    assert_eq!(payload["format"], "JSON_ARRAY");
}

#[test]
fn test_identifiers_are_validated_before_sending() {
    let warehouse = warehouse(FakeTransport::new("{}"));
    let result = warehouse.list_tables("bronze; DROP SCHEMA gold");
    assert!(matches!(result, Err(WarehouseError::InvalidIdentifier(_))));
    assert!(requests(&warehouse).is_empty());
}

// =============================================================================
// Responses
// =============================================================================

#[test]
fn test_table_schema_from_describe_and_count() {
    let describe = succeeded(
        &["col_name", "data_type", "comment"],
        serde_json::json!([
            ["contact_id", "int", null],
            ["email", "string", "primary contact"],
            ["", "", ""],
            ["# Partition Information", "", ""],
            ["email", "string", null]
        ]),
    );
    let count = succeeded(&["count(1)"], serde_json::json!([["1500"]]));
    let warehouse = warehouse(FakeTransport::with_responses([describe, count]));

    let schema = warehouse.get_table_schema("raw_customers", "bronze").unwrap();
    assert_eq!(schema.full_name(), "main.bronze.raw_customers");
    assert_eq!(schema.column_names(), vec!["contact_id", "email"]);
    assert_eq!(schema.columns[1].comment.as_deref(), Some("primary contact"));
    assert_eq!(schema.row_count, Some(1500));

    let statements: Vec<String> = requests(&warehouse)
        .iter()
        .map(|r| {
            let payload: serde_json::Value = serde_json::from_str(&r.body).unwrap();
            payload["statement"].as_str().unwrap_or_default().to_string()
        })
        .collect();
    assert_eq!(
        statements,
        vec![
            "DESCRIBE TABLE main.bronze.raw_customers",
            "SELECT COUNT(*) FROM main.bronze.raw_customers"
        ]
    );
}

#[test]
fn test_failed_statement_surfaces_error() {
    let body = serde_json::json!({
        "statement_id": "01ef",
        "status": {
            "state": "FAILED",
            "error": { "error_code": "BAD_REQUEST", "message": "[TABLE_OR_VIEW_NOT_FOUND] main.silver.x" }
        }
    })
    .to_string();
    let warehouse = warehouse(FakeTransport::new(&body));

    let err = warehouse
        .execute_command("CREATE OR REPLACE TABLE main.silver.y AS SELECT * FROM main.silver.x")
        .unwrap_err();
    match err {
        WarehouseError::Statement { state, message } => {
            assert_eq!(state, "FAILED");
            assert!(message.starts_with("[BAD_REQUEST]"));
            assert!(message.contains("TABLE_OR_VIEW_NOT_FOUND"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_network_failure_is_transport_error() {
    let warehouse = warehouse(FakeTransport::with_error("connection refused"));
    let err = warehouse.list_schemas().unwrap_err();
    assert!(matches!(err, WarehouseError::Transport(_)));
    assert!(err.to_string().contains("connection refused"));
}

#[test]
fn test_sample_rows_keep_nulls() {
    let body = succeeded(
        &["contact_id", "phone"],
        serde_json::json!([["1", "555-0101"], [null, null]]),
    );
    let warehouse = warehouse(FakeTransport::new(&body));

    let sample = warehouse.get_sample_rows("raw_customers", "bronze", 2).unwrap();
    assert_eq!(sample.columns, vec!["contact_id", "phone"]);
    assert_eq!(sample.rows[1], vec![None, None]);

    let payload: serde_json::Value = serde_json::from_str(&requests(&warehouse)[0].body).unwrap();
    assert_eq!(payload["statement"], "SELECT * FROM main.bronze.raw_customers LIMIT 2");
}
