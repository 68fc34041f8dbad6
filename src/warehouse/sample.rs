//! Demo data for a fresh warehouse
//!
//! `bronze.raw_customers` ships with deliberate quality problems so the
//! clean-up flow has something to fix: exact duplicate rows (ids 1 and 5),
//! a NULL id, mixed name and email casing, NULL or empty phones, and
//! missing names.

use crate::warehouse::{Layer, TableSchema, Warehouse, WarehouseError};

pub const SAMPLE_TABLE: &str = "raw_customers";

const CREATE_SAMPLE_TABLE: &str = "CREATE OR REPLACE TABLE {catalog}.bronze.raw_customers (
    contact_id INT,
    first_name STRING,
    last_name STRING,
    email STRING,
    phone STRING,
    created_at TIMESTAMP
)";

const INSERT_SAMPLE_ROWS: &str = "INSERT INTO {catalog}.bronze.raw_customers VALUES
    (1, 'John', 'DOE', 'john.doe@email.com', '555-0101', '2024-01-15 10:30:00'),
    (1, 'John', 'DOE', 'john.doe@email.com', '555-0101', '2024-01-15 10:30:00'),
    (2, 'jane', 'SMITH', 'JANE.SMITH@EMAIL.COM', '555-0102', '2024-01-16 11:45:00'),
    (3, 'Bob', 'Johnson', 'bob.j@email.com', NULL, '2024-01-17 09:15:00'),
    (4, 'ALICE', 'williams', 'alice.w@email.com', '555-0104', '2024-01-18 14:20:00'),
    (5, 'Charlie', 'BROWN', 'charlie.brown@email.com', '555-0105', '2024-01-19 16:00:00'),
    (NULL, 'Invalid', 'User', 'invalid@email.com', '555-0106', '2024-01-20 08:30:00'),
    (6, 'Diana', 'Miller', 'diana.m@email.com', '555-0107', '2024-01-21 12:00:00'),
    (7, 'Edward', 'DAVIS', 'edward.davis@email.com', '', '2024-01-22 10:45:00'),
    (8, 'fiona', 'Garcia', 'FIONA.GARCIA@email.com', '555-0109', '2024-01-23 15:30:00'),
    (9, 'George', 'martinez', 'george.m@email.com', '555-0110', '2024-01-24 09:00:00'),
    (10, 'Hannah', 'ANDERSON', 'hannah.a@email.com', '555-0111', '2024-01-25 11:15:00'),
    (5, 'Charlie', 'BROWN', 'charlie.brown@email.com', '555-0105', '2024-01-19 16:00:00'),
    (11, NULL, 'Wilson', 'unknown@email.com', '555-0112', '2024-01-26 14:45:00'),
    (12, 'Jack', NULL, 'jack@email.com', '555-0113', '2024-01-27 10:00:00')";

/// Create every layer schema and (re)load `bronze.raw_customers`
///
/// Returns the freshly described table.
pub fn seed_sample_data<W: Warehouse + ?Sized>(
    warehouse: &W,
) -> Result<TableSchema, WarehouseError> {
    for layer in Layer::ALL {
        warehouse.create_schema_if_not_exists(layer.as_str())?;
    }

    let catalog = warehouse.catalog().to_string();
    warehouse.execute_command(&CREATE_SAMPLE_TABLE.replace("{catalog}", &catalog))?;
    warehouse.execute_command(&INSERT_SAMPLE_ROWS.replace("{catalog}", &catalog))?;
    tracing::info!(catalog = %catalog, table = SAMPLE_TABLE, "sample data loaded");

    warehouse.get_table_schema(SAMPLE_TABLE, Layer::Bronze.as_str())
}
