//! Databricks SQL warehouse backend
//!
//! Runs statements through the SQL Statement Execution API
//! (`POST /api/2.0/sql/statements`) with inline JSON results. Statements wait
//! synchronously up to `wait_timeout`; anything still running after that is
//! cancelled server-side and reported as a failure.

use serde::Deserialize;

use crate::http::{SyncTransport, Transport};
use crate::warehouse::{
    qualified_name, validate_identifier, QueryResult, TableColumn, TableSchema, Warehouse,
    WarehouseError,
};

/// Server-side wait bounds accepted by the API (seconds)
const MIN_WAIT_SECS: u64 = 5;
const MAX_WAIT_SECS: u64 = 50;

/// Databricks SQL warehouse
#[derive(Debug)]
pub struct DatabricksWarehouse {
    /// Workspace hostname, without scheme
    host: String,
    token: String,
    warehouse_id: String,
    catalog: String,
    wait_timeout_secs: u64,
    transport: Transport,
}

impl DatabricksWarehouse {
    pub fn new(
        host: String,
        token: String,
        warehouse_id: String,
        catalog: String,
        timeout_secs: u64,
    ) -> Self {
        let wait_timeout_secs = timeout_secs.clamp(MIN_WAIT_SECS, MAX_WAIT_SECS);
        Self {
            host,
            token,
            warehouse_id,
            catalog,
            wait_timeout_secs,
            // Leave headroom over the server-side wait
            transport: Transport::real(wait_timeout_secs + 10),
        }
    }

    /// Create warehouse with custom transport (for testing)
    pub fn with_transport(
        host: String,
        token: String,
        warehouse_id: String,
        catalog: String,
        transport: Transport,
    ) -> Self {
        Self {
            host,
            token,
            warehouse_id,
            catalog,
            wait_timeout_secs: 30,
            transport,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn statements_url(&self) -> String {
        format!("https://{}/api/2.0/sql/statements", self.host)
    }

    fn build_request(&self, sql: &str) -> String {
        serde_json::json!({
            "warehouse_id": self.warehouse_id,
            "statement": sql,
            "catalog": self.catalog,
            "wait_timeout": format!("{}s", self.wait_timeout_secs),
            "on_wait_timeout": "CANCEL",
            "disposition": "INLINE",
            "format": "JSON_ARRAY",
        })
        .to_string()
    }

    fn run_statement(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        tracing::debug!(sql, "submitting statement");
        let auth_header = format!("Bearer {}", self.token);
        let headers = [
            ("Authorization", auth_header.as_str()),
            ("Content-Type", "application/json"),
        ];

        let body = self.build_request(sql);
        let response = self
            .transport
            .post_json(&self.statements_url(), &headers, &body)?;
        parse_statement_response(&response)
    }
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    status: StatementStatus,
    #[serde(default)]
    manifest: Option<Manifest>,
    #[serde(default)]
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct StatementStatus {
    state: String,
    #[serde(default)]
    error: Option<ServiceError>,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    schema: Option<ManifestSchema>,
}

#[derive(Debug, Deserialize)]
struct ManifestSchema {
    #[serde(default)]
    columns: Vec<ManifestColumn>,
}

#[derive(Debug, Deserialize)]
struct ManifestColumn {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    #[serde(default)]
    data_array: Option<Vec<Vec<Option<String>>>>,
}

/// Parse a Statement Execution API response body
///
/// Public for testing.
pub fn parse_statement_response(body: &str) -> Result<QueryResult, WarehouseError> {
    let response: StatementResponse = serde_json::from_str(body)?;

    if response.status.state != "SUCCEEDED" {
        let message = response
            .status
            .error
            .map(|e| match (e.error_code, e.message) {
                (Some(code), Some(msg)) => format!("[{}] {}", code, msg),
                (None, Some(msg)) => msg,
                (Some(code), None) => code,
                (None, None) => "no error details".to_string(),
            })
            .unwrap_or_else(|| "no error details".to_string());
        return Err(WarehouseError::Statement {
            state: response.status.state,
            message,
        });
    }

    let columns = response
        .manifest
        .and_then(|m| m.schema)
        .map(|s| s.columns.into_iter().map(|c| c.name).collect())
        .unwrap_or_default();
    let rows = response
        .result
        .and_then(|r| r.data_array)
        .unwrap_or_default();

    Ok(QueryResult { columns, rows })
}

impl Warehouse for DatabricksWarehouse {
    fn catalog(&self) -> &str {
        &self.catalog
    }

    fn endpoint(&self) -> String {
        self.host.clone()
    }

    fn list_schemas(&self) -> Result<Vec<String>, WarehouseError> {
        let result = self.run_statement(&format!("SHOW SCHEMAS IN {}", self.catalog))?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().next().flatten())
            .collect())
    }

    fn list_tables(&self, schema: &str) -> Result<Vec<String>, WarehouseError> {
        validate_identifier(schema)?;
        // SHOW TABLES returns: database, tableName, isTemporary
        let result =
            self.run_statement(&format!("SHOW TABLES IN {}.{}", self.catalog, schema))?;
        Ok(result
            .rows
            .into_iter()
            .filter_map(|row| row.into_iter().nth(1).flatten())
            .collect())
    }

    fn get_table_schema(&self, table: &str, schema: &str) -> Result<TableSchema, WarehouseError> {
        validate_identifier(table)?;
        validate_identifier(schema)?;
        let full_name = qualified_name(&self.catalog, schema, table);

        // DESCRIBE returns: col_name, data_type, comment
        let described = self.run_statement(&format!("DESCRIBE TABLE {}", full_name))?;
        let mut columns = Vec::new();
        for row in described.rows {
            let mut cells = row.into_iter();
            let name = cells.next().flatten().unwrap_or_default();
            // Partition and metadata sections start with '#'
            if name.starts_with('#') {
                break;
            }
            if name.is_empty() {
                continue;
            }
            let data_type = cells
                .next()
                .flatten()
                .unwrap_or_else(|| "unknown".to_string());
            let comment = cells.next().flatten().filter(|c| !c.is_empty());
            columns.push(TableColumn {
                name,
                data_type,
                nullable: true,
                comment,
            });
        }

        let row_count = self.count_rows(&full_name)?;

        Ok(TableSchema {
            catalog: self.catalog.clone(),
            schema: schema.to_string(),
            table: table.to_string(),
            columns,
            row_count: Some(row_count),
        })
    }

    fn get_sample_rows(
        &self,
        table: &str,
        schema: &str,
        limit: usize,
    ) -> Result<QueryResult, WarehouseError> {
        validate_identifier(table)?;
        validate_identifier(schema)?;
        self.run_statement(&format!(
            "SELECT * FROM {} LIMIT {}",
            qualified_name(&self.catalog, schema, table),
            limit
        ))
    }

    fn execute_query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        self.run_statement(sql)
    }

    fn execute_command(&self, sql: &str) -> Result<(), WarehouseError> {
        self.run_statement(sql).map(|_| ())
    }

    fn create_schema_if_not_exists(&self, schema: &str) -> Result<(), WarehouseError> {
        validate_identifier(schema)?;
        self.execute_command(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}.{}",
            self.catalog, schema
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_succeeded_response() {
        let body = r#"{
            "statement_id": "01ee",
            "status": {"state": "SUCCEEDED"},
            "manifest": {"schema": {"columns": [{"name": "id", "position": 0}, {"name": "email", "position": 1}]}},
            "result": {"data_array": [["1", "a@x.com"], ["2", null]]}
        }"#;

        let result = parse_statement_response(body).unwrap();
        assert_eq!(result.columns, vec!["id", "email"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(result.rows[1][1], None);
    }

    #[test]
    fn test_parse_command_without_result() {
        let body = r#"{"statement_id": "x", "status": {"state": "SUCCEEDED"}}"#;
        let result = parse_statement_response(body).unwrap();
        assert!(result.columns.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_parse_failed_response() {
        let body = r#"{
            "status": {"state": "FAILED", "error": {"error_code": "BAD_REQUEST", "message": "[TABLE_OR_VIEW_NOT_FOUND] nope"}}
        }"#;

        match parse_statement_response(body) {
            Err(WarehouseError::Statement { state, message }) => {
                assert_eq!(state, "FAILED");
                assert!(message.contains("BAD_REQUEST"));
                assert!(message.contains("TABLE_OR_VIEW_NOT_FOUND"));
            }
            other => panic!("expected statement error, got {:?}", other),
        }
    }

    #[test]
    fn test_wait_timeout_is_clamped() {
        let warehouse = DatabricksWarehouse::new(
            "host".to_string(),
            "t".to_string(),
            "w".to_string(),
            "main".to_string(),
            600,
        );
        assert_eq!(warehouse.wait_timeout_secs, MAX_WAIT_SECS);
    }
}
