//! Local warehouse on SQLite
//!
//! Each layer is an attached database (`bronze`, `silver`, `gold`), either
//! in memory or as `<dir>/<layer>.db`. A small dialect shim makes the
//! statements the agent generates runnable:
//! - `<catalog>.<schema>.<table>` loses its catalog prefix
//! - `CREATE OR REPLACE TABLE t` becomes `DROP TABLE IF EXISTS t; CREATE TABLE t`,
//!   run in one transaction so a failed CREATE keeps the old table

use std::path::{Path, PathBuf};

use regex::Regex;
use rusqlite::types::ValueRef;
use rusqlite::Connection;

use crate::warehouse::{
    validate_identifier, Layer, QueryResult, TableColumn, TableSchema, Warehouse, WarehouseError,
};

/// SQLite-backed warehouse
#[derive(Debug)]
pub struct SqliteWarehouse {
    conn: Connection,
    catalog: String,
    /// Directory holding `<schema>.db` files; `None` for in-memory
    root: Option<PathBuf>,
    catalog_prefix: Regex,
    create_or_replace: Regex,
}

impl SqliteWarehouse {
    /// In-memory warehouse with all three layers attached
    pub fn open_in_memory(catalog: &str) -> Result<Self, WarehouseError> {
        let schemas: Vec<&str> = Layer::ALL.iter().map(|l| l.as_str()).collect();
        Self::open_in_memory_with_schemas(catalog, &schemas)
    }

    /// In-memory warehouse with only the given schemas attached
    pub fn open_in_memory_with_schemas(
        catalog: &str,
        schemas: &[&str],
    ) -> Result<Self, WarehouseError> {
        let warehouse = Self::from_connection(Connection::open_in_memory()?, catalog, None)?;
        for schema in schemas {
            warehouse.attach(schema)?;
        }
        Ok(warehouse)
    }

    /// File-backed warehouse under `dir`, one database file per layer
    pub fn open(dir: &Path, catalog: &str) -> Result<Self, WarehouseError> {
        std::fs::create_dir_all(dir)?;
        let warehouse =
            Self::from_connection(Connection::open_in_memory()?, catalog, Some(dir.to_path_buf()))?;
        for layer in Layer::ALL {
            warehouse.attach(layer.as_str())?;
        }
        Ok(warehouse)
    }

    fn from_connection(
        conn: Connection,
        catalog: &str,
        root: Option<PathBuf>,
    ) -> Result<Self, WarehouseError> {
        validate_identifier(catalog)?;
        let catalog_prefix = Regex::new(&format!(r"(?i)\b{}\.(\w+)\.", regex::escape(catalog)))
            .map_err(|e| WarehouseError::UnexpectedResult(e.to_string()))?;
        let create_or_replace = Regex::new(r"(?i)\bCREATE\s+OR\s+REPLACE\s+TABLE\s+([\w.]+)")
            .map_err(|e| WarehouseError::UnexpectedResult(e.to_string()))?;

        Ok(Self {
            conn,
            catalog: catalog.to_string(),
            root,
            catalog_prefix,
            create_or_replace,
        })
    }

    fn attach(&self, schema: &str) -> Result<(), WarehouseError> {
        validate_identifier(schema)?;
        let target = match &self.root {
            Some(dir) => dir.join(format!("{}.db", schema)).display().to_string(),
            None => ":memory:".to_string(),
        };
        self.conn
            .execute(&format!("ATTACH DATABASE ?1 AS {}", schema), [target.as_str()])?;
        tracing::debug!(schema, target = %target, "attached layer database");
        Ok(())
    }

    /// Rewrite warehouse SQL into something SQLite accepts
    pub fn to_dialect(&self, sql: &str) -> String {
        let stripped = self.catalog_prefix.replace_all(sql, "$1.");
        self.create_or_replace
            .replace(&stripped, "DROP TABLE IF EXISTS $1;\nCREATE TABLE $1")
            .into_owned()
    }

    fn ensure_schema(&self, schema: &str) -> Result<(), WarehouseError> {
        validate_identifier(schema)?;
        let attached = self.list_schemas()?;
        if attached.iter().any(|s| s.eq_ignore_ascii_case(schema)) {
            Ok(())
        } else {
            Err(WarehouseError::SchemaNotFound(schema.to_string()))
        }
    }
}

impl Warehouse for SqliteWarehouse {
    fn catalog(&self) -> &str {
        &self.catalog
    }

    fn endpoint(&self) -> String {
        match &self.root {
            Some(dir) => format!("sqlite:{}", dir.display()),
            None => "sqlite::memory:".to_string(),
        }
    }

    fn list_schemas(&self) -> Result<Vec<String>, WarehouseError> {
        let mut stmt = self.conn.prepare("PRAGMA database_list")?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names
            .into_iter()
            .filter(|name| name != "main" && name != "temp")
            .collect())
    }

    fn list_tables(&self, schema: &str) -> Result<Vec<String>, WarehouseError> {
        self.ensure_schema(schema)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT name FROM {}.sqlite_master WHERE type = 'table' ORDER BY name",
            schema
        ))?;
        let tables = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tables)
    }

    fn get_table_schema(&self, table: &str, schema: &str) -> Result<TableSchema, WarehouseError> {
        validate_identifier(table)?;
        if !self.table_exists(table, schema)? {
            return Err(WarehouseError::TableNotFound {
                schema: schema.to_string(),
                table: table.to_string(),
            });
        }

        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA {}.table_info({})", schema, table))?;
        let columns = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let data_type: String = row.get(2)?;
                let not_null: i64 = row.get(3)?;
                Ok(TableColumn {
                    name,
                    data_type: if data_type.is_empty() {
                        "unknown".to_string()
                    } else {
                        data_type
                    },
                    nullable: not_null == 0,
                    comment: None,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let row_count = self.count_rows(&format!("{}.{}", schema, table))?;

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
        self.execute_query(&format!("SELECT * FROM {}.{} LIMIT {}", schema, table, limit))
    }

    fn execute_query(&self, sql: &str) -> Result<QueryResult, WarehouseError> {
        let sql = self.to_dialect(sql);
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                values.push(render_value(row.get_ref(idx)?));
            }
            out.push(values);
        }

        Ok(QueryResult { columns, rows: out })
    }

    fn execute_command(&self, sql: &str) -> Result<(), WarehouseError> {
        let sql = self.to_dialect(sql);
        tracing::debug!(sql = %sql, "executing command");
        // The rewritten replace is DROP + CREATE; both land or neither does
        let tx = self.conn.unchecked_transaction()?;
        tx.execute_batch(&sql)?;
        tx.commit()?;
        Ok(())
    }

    fn create_schema_if_not_exists(&self, schema: &str) -> Result<(), WarehouseError> {
        match self.ensure_schema(schema) {
            Ok(()) => Ok(()),
            Err(WarehouseError::SchemaNotFound(_)) => self.attach(schema),
            Err(e) => Err(e),
        }
    }
}

fn render_value(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Some(format!("<{} bytes>", bytes.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialect_strips_catalog_and_rewrites_replace() {
        let warehouse = SqliteWarehouse::open_in_memory("local").unwrap();
        let sql = "CREATE OR REPLACE TABLE local.silver.customers AS SELECT * FROM local.bronze.raw";
        let rewritten = warehouse.to_dialect(sql);
        assert_eq!(
            rewritten,
            "DROP TABLE IF EXISTS silver.customers;\nCREATE TABLE silver.customers AS SELECT * FROM bronze.raw"
        );
    }

    #[test]
    fn test_dialect_leaves_plain_sql_alone() {
        let warehouse = SqliteWarehouse::open_in_memory("local").unwrap();
        assert_eq!(
            warehouse.to_dialect("SELECT COUNT(*) FROM bronze.raw"),
            "SELECT COUNT(*) FROM bronze.raw"
        );
    }

    #[test]
    fn test_layers_attached() {
        let warehouse = SqliteWarehouse::open_in_memory("local").unwrap();
        assert_eq!(
            warehouse.list_schemas().unwrap(),
            vec!["bronze".to_string(), "silver".to_string(), "gold".to_string()]
        );
        assert!(warehouse.list_tables("silver").unwrap().is_empty());
    }

    #[test]
    fn test_missing_schema_is_reported() {
        let warehouse = SqliteWarehouse::open_in_memory_with_schemas("local", &["bronze"]).unwrap();
        assert!(matches!(
            warehouse.list_tables("gold"),
            Err(WarehouseError::SchemaNotFound(_))
        ));
    }

    #[test]
    fn test_render_values() {
        let warehouse = SqliteWarehouse::open_in_memory("local").unwrap();
        let result = warehouse
            .execute_query("SELECT 1 AS i, 2.5 AS r, 'x' AS t, NULL AS n")
            .unwrap();
        assert_eq!(result.columns, vec!["i", "r", "t", "n"]);
        assert_eq!(
            result.rows[0],
            vec![
                Some("1".to_string()),
                Some("2.5".to_string()),
                Some("x".to_string()),
                None
            ]
        );
    }
}
