//! Warehouse boundary
//!
//! Read-only metadata access plus statement execution against a layered
//! (bronze/silver/gold) warehouse. The session never reaches a SQL engine
//! except through [`Warehouse`].
//!
//! Backends:
//! - [`DatabricksWarehouse`]: SQL Statement Execution API over HTTP
//! - [`SqliteWarehouse`]: local attached databases, one per layer

pub mod databricks;
pub mod sample;
pub mod sqlite;

use std::fmt;

use crate::http::TransportError;

pub use databricks::DatabricksWarehouse;
pub use sample::seed_sample_data;
pub use sqlite::SqliteWarehouse;

/// Warehouse layer, in resolution priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Layer {
    Bronze,
    Silver,
    Gold,
}

impl Layer {
    /// Fixed priority order used for table resolution and probing
    pub const ALL: [Layer; 3] = [Layer::Bronze, Layer::Silver, Layer::Gold];

    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Bronze => "bronze",
            Layer::Silver => "silver",
            Layer::Gold => "gold",
        }
    }

    /// Case-insensitive lookup by schema name
    pub fn from_name(name: &str) -> Option<Layer> {
        Layer::ALL
            .into_iter()
            .find(|layer| layer.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single column of a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableColumn {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub comment: Option<String>,
}

impl TableColumn {
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            nullable: true,
            comment: None,
        }
    }
}

/// Immutable snapshot of a table's structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub catalog: String,
    pub schema: String,
    pub table: String,
    pub columns: Vec<TableColumn>,
    pub row_count: Option<u64>,
}

impl TableSchema {
    /// Fully-qualified `catalog.schema.table`
    pub fn full_name(&self) -> String {
        qualified_name(&self.catalog, &self.schema, &self.table)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Rows returned by a query; cells are rendered as text, `None` is SQL NULL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl QueryResult {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Interpret the first cell as a non-negative count (`SELECT COUNT(*)`)
    pub fn scalar_u64(&self) -> Result<u64, WarehouseError> {
        let cell = self
            .rows
            .first()
            .and_then(|row| row.first())
            .ok_or_else(|| WarehouseError::UnexpectedResult("empty count result".to_string()))?;

        match cell {
            // A count over an empty relation can come back as NULL from some engines
            None => Ok(0),
            Some(text) => text.trim().parse::<u64>().map_err(|_| {
                WarehouseError::UnexpectedResult(format!("not a row count: {}", text))
            }),
        }
    }
}

/// One schema and the tables it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaListing {
    pub schema: String,
    pub tables: Vec<String>,
}

/// Warehouse errors
#[derive(Debug, thiserror::Error)]
pub enum WarehouseError {
    /// HTTP transport failure (Databricks)
    #[error("Warehouse request failed: {0}")]
    Transport(#[from] TransportError),

    /// Statement did not succeed on the engine
    #[error("Statement {state}: {message}")]
    Statement { state: String, message: String },

    /// Local engine failure
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Schema not found: {0}")]
    SchemaNotFound(String),

    #[error("Table not found: {schema}.{table}")]
    TableNotFound { schema: String, table: String },

    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for WarehouseError {
    fn from(err: serde_json::Error) -> Self {
        WarehouseError::UnexpectedResult(err.to_string())
    }
}

/// Fetcher/executor interface consumed by the session
///
/// All names are unquoted identifiers; implementations validate them
/// with [`validate_identifier`] before interpolating into SQL.
pub trait Warehouse {
    /// Catalog used for fully-qualified names
    fn catalog(&self) -> &str;

    /// Human-readable endpoint for status output
    fn endpoint(&self) -> String;

    fn list_schemas(&self) -> Result<Vec<String>, WarehouseError>;

    fn list_tables(&self, schema: &str) -> Result<Vec<String>, WarehouseError>;

    /// Case-insensitive existence check
    fn table_exists(&self, table: &str, schema: &str) -> Result<bool, WarehouseError> {
        Ok(self
            .list_tables(schema)?
            .iter()
            .any(|t| t.eq_ignore_ascii_case(table)))
    }

    /// Columns plus row count
    fn get_table_schema(&self, table: &str, schema: &str) -> Result<TableSchema, WarehouseError>;

    fn get_sample_rows(
        &self,
        table: &str,
        schema: &str,
        limit: usize,
    ) -> Result<QueryResult, WarehouseError>;

    fn execute_query(&self, sql: &str) -> Result<QueryResult, WarehouseError>;

    fn execute_command(&self, sql: &str) -> Result<(), WarehouseError>;

    fn create_schema_if_not_exists(&self, schema: &str) -> Result<(), WarehouseError>;

    /// Count rows of a (possibly fully-qualified) table name
    fn count_rows(&self, qualified_table: &str) -> Result<u64, WarehouseError> {
        for part in qualified_table.split('.') {
            validate_identifier(part)?;
        }
        self.execute_query(&format!("SELECT COUNT(*) FROM {}", qualified_table))?
            .scalar_u64()
    }
}

/// Concrete backend enum
///
/// Lets the CLI pick a backend from configuration while the session stays
/// generic over [`Warehouse`].
#[derive(Debug)]
pub enum WarehouseBackend {
    Databricks(DatabricksWarehouse),
    Sqlite(SqliteWarehouse),
}

impl Warehouse for WarehouseBackend {
    fn catalog(&self) -> &str {
        match self {
            WarehouseBackend::Databricks(w) => w.catalog(),
            WarehouseBackend::Sqlite(w) => w.catalog(),
        }
    }

    fn endpoint(&self) -> String {
        match self {
            WarehouseBackend::Databricks(w) => w.endpoint(),
            WarehouseBackend::Sqlite(w) => w.endpoint(),
        }
    }

    fn list_schemas(&self) -> Result<Vec<String>, WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.list_schemas(),
            WarehouseBackend::Sqlite(w) => w.list_schemas(),
        }
    }

    fn list_tables(&self, schema: &str) -> Result<Vec<String>, WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.list_tables(schema),
            WarehouseBackend::Sqlite(w) => w.list_tables(schema),
        }
    }

    fn table_exists(&self, table: &str, schema: &str) -> Result<bool, WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.table_exists(table, schema),
            WarehouseBackend::Sqlite(w) => w.table_exists(table, schema),
        }
    }

    fn get_table_schema(&self, table: &str, schema: &str) -> Result<TableSchema, WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.get_table_schema(table, schema),
            WarehouseBackend::Sqlite(w) => w.get_table_schema(table, schema),
        }
    }

    fn get_sample_rows(
        &self,
        table: &str,
        schema: &str,
        limit: usize,
    ) -> Result<QueryResult, WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.get_sample_rows(table, schema, limit),
            WarehouseBackend::Sqlite(w) => w.get_sample_rows(table, schema, limit),
        }
    }

    fn execute_query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.execute_query(sql),
            WarehouseBackend::Sqlite(w) => w.execute_query(sql),
        }
    }

    fn execute_command(&self, sql: &str) -> Result<(), WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.execute_command(sql),
            WarehouseBackend::Sqlite(w) => w.execute_command(sql),
        }
    }

    fn create_schema_if_not_exists(&self, schema: &str) -> Result<(), WarehouseError> {
        match self {
            WarehouseBackend::Databricks(w) => w.create_schema_if_not_exists(schema),
            WarehouseBackend::Sqlite(w) => w.create_schema_if_not_exists(schema),
        }
    }
}

/// Reject anything that is not a plain `[A-Za-z0-9_]+` identifier
pub fn validate_identifier(name: &str) -> Result<&str, WarehouseError> {
    if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        Ok(name)
    } else {
        Err(WarehouseError::InvalidIdentifier(name.to_string()))
    }
}

/// `catalog.schema.table`
pub fn qualified_name(catalog: &str, schema: &str, table: &str) -> String {
    format!("{}.{}.{}", catalog, schema, table)
}

/// Enumerate tables of every layer in priority order
///
/// Per-schema failures are logged and skipped; the listing is best-effort.
pub fn list_layer_tables<W: Warehouse + ?Sized>(warehouse: &W) -> Vec<SchemaListing> {
    let mut listings = Vec::new();
    for layer in Layer::ALL {
        match warehouse.list_tables(layer.as_str()) {
            Ok(tables) => listings.push(SchemaListing {
                schema: layer.as_str().to_string(),
                tables,
            }),
            Err(e) => {
                tracing::warn!(schema = layer.as_str(), error = %e, "skipping schema in table listing");
            }
        }
    }
    listings
}

/// Plain-text table description (column list with nullability and comments)
pub fn format_table_info(schema: &TableSchema) -> String {
    let mut lines = vec![format!("Table: {}", schema.full_name())];
    match schema.row_count {
        Some(count) => lines.push(format!("Row Count: {}", group_thousands(count))),
        None => lines.push("Row Count: Unknown".to_string()),
    }
    lines.push(String::new());
    lines.push("Columns:".to_string());

    for col in &schema.columns {
        let nullable = if col.nullable { "nullable" } else { "not null" };
        let comment = col
            .comment
            .as_deref()
            .map(|c| format!(" -- {}", c))
            .unwrap_or_default();
        lines.push(format!(
            "  - {}: {} ({}){}",
            col.name, col.data_type, nullable, comment
        ));
    }

    lines.join("\n")
}

/// `1234567` → `1,234,567`
pub fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layer_order_and_names() {
        let names: Vec<&str> = Layer::ALL.iter().map(|l| l.as_str()).collect();
        assert_eq!(names, vec!["bronze", "silver", "gold"]);
        assert_eq!(Layer::from_name("GOLD"), Some(Layer::Gold));
        assert_eq!(Layer::from_name("staging"), None);
    }

    #[test]
    fn test_validate_identifier() {
        assert!(validate_identifier("raw_customers").is_ok());
        assert!(validate_identifier("t2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("x; DROP TABLE y").is_err());
        assert!(validate_identifier("a.b").is_err());
    }

    #[test]
    fn test_scalar_u64() {
        let result = QueryResult {
            columns: vec!["count(1)".to_string()],
            rows: vec![vec![Some("42".to_string())]],
        };
        assert_eq!(result.scalar_u64().unwrap(), 42);

        let null_count = QueryResult {
            columns: vec!["c".to_string()],
            rows: vec![vec![None]],
        };
        assert_eq!(null_count.scalar_u64().unwrap(), 0);

        assert!(QueryResult::default().scalar_u64().is_err());
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(1000), "1,000");
        assert_eq!(group_thousands(1234567), "1,234,567");
    }

    #[test]
    fn test_format_table_info() {
        let schema = TableSchema {
            catalog: "main".to_string(),
            schema: "bronze".to_string(),
            table: "raw_customers".to_string(),
            columns: vec![
                TableColumn {
                    name: "contact_id".to_string(),
                    data_type: "INT".to_string(),
                    nullable: false,
                    comment: Some("primary key".to_string()),
                },
                TableColumn::new("email", "STRING"),
            ],
            row_count: Some(1500),
        };

        let info = format_table_info(&schema);
        assert!(info.starts_with("Table: main.bronze.raw_customers"));
        assert!(info.contains("Row Count: 1,500"));
        assert!(info.contains("  - contact_id: INT (not null) -- primary key"));
        assert!(info.contains("  - email: STRING (nullable)"));
    }
}
