//! Table resolution against a real (SQLite) warehouse

use medallion::session::{TableRef, TableResolver};
use medallion::warehouse::{SqliteWarehouse, Warehouse};

fn warehouse_with(tables: &[&str]) -> SqliteWarehouse {
    let warehouse = SqliteWarehouse::open_in_memory("local").unwrap();
    for table in tables {
        warehouse
            .execute_command(&format!("CREATE TABLE local.{} (id INT)", table))
            .unwrap();
    }
    warehouse
}

#[test]
fn test_bronze_wins_name_collision() {
    let warehouse = warehouse_with(&["bronze.raw_customers", "silver.raw_customers"]);
    let found = TableResolver::new().resolve(&warehouse, "Clean raw_customers please");
    assert_eq!(found, Some(TableRef::new("bronze", "raw_customers")));
}

#[test]
fn test_layer_order_beats_message_order() {
    let warehouse = warehouse_with(&["gold.sales", "silver.orders"]);
    let found = TableResolver::new().resolve(&warehouse, "join sales with orders");
    assert_eq!(found, Some(TableRef::new("silver", "orders")));
}

#[test]
fn test_prefix_stripped_name() {
    let warehouse = warehouse_with(&["bronze.stg_invoices"]);
    let found = TableResolver::new().resolve(&warehouse, "dedupe the invoices");
    assert_eq!(found, Some(TableRef::new("bronze", "stg_invoices")));
}

#[test]
fn test_dotted_reference_outside_layers() {
    let warehouse = SqliteWarehouse::open_in_memory_with_schemas(
        "local",
        &["bronze", "silver", "gold", "staging"],
    )
    .unwrap();
    warehouse
        .execute_command("CREATE TABLE staging.events (id INT)")
        .unwrap();

    let resolver = TableResolver::new();
    assert_eq!(
        resolver.resolve(&warehouse, "clean staging.events"),
        Some(TableRef::new("staging", "events"))
    );
    assert_eq!(
        resolver.resolve(&warehouse, "clean local.staging.events"),
        Some(TableRef::new("staging", "events"))
    );
    assert_eq!(resolver.resolve(&warehouse, "clean staging.missing"), None);
}

#[test]
fn test_missing_layer_schema_is_skipped() {
    let warehouse =
        SqliteWarehouse::open_in_memory_with_schemas("local", &["silver"]).unwrap();
    warehouse
        .execute_command("CREATE TABLE silver.customers (id INT)")
        .unwrap();

    let found = TableResolver::new().resolve(&warehouse, "normalize customers");
    assert_eq!(found, Some(TableRef::new("silver", "customers")));
}

#[test]
fn test_email_addresses_are_not_table_references() {
    let warehouse = warehouse_with(&[]);
    let found = TableResolver::new().resolve(&warehouse, "fix john.doe@email.com");
    assert_eq!(found, None);
}
