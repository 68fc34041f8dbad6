//! Table resolution
//!
//! Finds the table a message talks about:
//! 1. walk bronze, silver, gold in order; a table matches when its name (or
//!    its name without a `raw_`/`stg_` prefix, if still longer than two
//!    characters) appears in the message. First match wins, so collisions
//!    resolve by layer priority.
//! 2. otherwise, the first dotted `schema.table` (or `catalog.schema.table`)
//!    reference that exists in the warehouse.
//!
//! Anaphora ("this table", "it") are left to the caller, which remembers the
//! last table mentioned.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::warehouse::{list_layer_tables, SchemaListing, Warehouse, WarehouseError};

static DOTTED_REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\.(\w+)(?:\.(\w+))?").expect("static regex"));

static ANAPHORA: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:this|that|the) table\b|\bit\b").expect("static regex")
});

/// Prefixes ignored when matching table names against free text
const STRIPPED_PREFIXES: [&str; 2] = ["raw_", "stg_"];

/// A `schema.table` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

impl TableRef {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table: table.into(),
        }
    }

    /// `schema.table`
    pub fn qualified(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Schema and table from a two- or three-part dotted name
    ///
    /// Backticks are ignored; anything else is `None`.
    pub fn from_qualified(name: &str) -> Option<Self> {
        let cleaned = name.replace('`', "");
        let parts: Vec<&str> = cleaned.trim().split('.').collect();
        match parts.as_slice() {
            [schema, table] | [_, schema, table] if !schema.is_empty() && !table.is_empty() => {
                Some(Self::new(*schema, *table))
            }
            _ => None,
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

/// Does the message point back at an earlier table?
pub fn mentions_anaphora(message: &str) -> bool {
    ANAPHORA.is_match(message)
}

/// Message → table resolver
#[derive(Debug, Clone, Default)]
pub struct TableResolver;

impl TableResolver {
    pub fn new() -> Self {
        Self
    }

    /// Resolve against a warehouse
    ///
    /// Per-schema listing failures are skipped; a failing existence probe
    /// counts as "does not exist".
    pub fn resolve<W: Warehouse + ?Sized>(&self, warehouse: &W, message: &str) -> Option<TableRef> {
        let listings = list_layer_tables(warehouse);
        self.resolve_in(message, &listings, |schema, table| {
            match warehouse.table_exists(table, schema) {
                Ok(exists) => exists,
                Err(WarehouseError::InvalidIdentifier(_) | WarehouseError::SchemaNotFound(_)) => {
                    false
                }
                Err(e) => {
                    tracing::warn!(schema, table, error = %e, "table probe failed");
                    false
                }
            }
        })
    }

    /// Resolve against pre-fetched listings
    ///
    /// `exists(schema, table)` confirms dotted references.
    pub fn resolve_in<F>(
        &self,
        message: &str,
        listings: &[SchemaListing],
        mut exists: F,
    ) -> Option<TableRef>
    where
        F: FnMut(&str, &str) -> bool,
    {
        let lowered = message.to_lowercase();

        for listing in listings {
            for table in &listing.tables {
                if name_matches(table, &lowered) {
                    return Some(TableRef::new(listing.schema.clone(), table.clone()));
                }
            }
        }

        for caps in DOTTED_REFERENCE.captures_iter(message) {
            let (schema, table) = match caps.get(3) {
                Some(table) => (&caps[2], table.as_str()),
                None => (&caps[1], &caps[2]),
            };
            if exists(schema, table) {
                return Some(TableRef::new(schema, table));
            }
        }

        None
    }
}

fn name_matches(table: &str, lowered_message: &str) -> bool {
    let table = table.to_lowercase();
    if lowered_message.contains(&table) {
        return true;
    }

    STRIPPED_PREFIXES
        .iter()
        .filter_map(|prefix| table.strip_prefix(prefix))
        .any(|stem| stem.len() > 2 && lowered_message.contains(stem))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listings(entries: &[(&str, &[&str])]) -> Vec<SchemaListing> {
        entries
            .iter()
            .map(|(schema, tables)| SchemaListing {
                schema: schema.to_string(),
                tables: tables.iter().map(|t| t.to_string()).collect(),
            })
            .collect()
    }

    fn never(_: &str, _: &str) -> bool {
        false
    }

    #[test]
    fn test_exact_and_case_insensitive() {
        let known = listings(&[("bronze", &["raw_customers"]), ("silver", &[]), ("gold", &[])]);
        let found = TableResolver::new().resolve_in("Clean RAW_CUSTOMERS please", &known, never);
        assert_eq!(found, Some(TableRef::new("bronze", "raw_customers")));
    }

    #[test]
    fn test_prefix_stripped_match() {
        let known = listings(&[("bronze", &["raw_customers", "stg_ab"])]);
        let resolver = TableResolver::new();
        assert_eq!(
            resolver.resolve_in("dedupe the customers", &known, never),
            Some(TableRef::new("bronze", "raw_customers"))
        );
        // "ab" is too short a stem to count
        assert_eq!(resolver.resolve_in("grab a table", &known, never), None);
    }

    #[test]
    fn test_schema_priority_on_collision() {
        let known = listings(&[
            ("bronze", &["raw_customers"]),
            ("silver", &["raw_customers"]),
        ]);
        let found = TableResolver::new().resolve_in("clean raw_customers", &known, never);
        assert_eq!(found, Some(TableRef::new("bronze", "raw_customers")));
    }

    #[test]
    fn test_dotted_reference_confirmed_by_lookup() {
        let known = listings(&[("bronze", &[])]);
        let resolver = TableResolver::new();

        let mut probes = Vec::new();
        let found = resolver.resolve_in("clean lake.silver.orders now", &known, |s, t| {
            probes.push(format!("{}.{}", s, t));
            s == "silver" && t == "orders"
        });
        assert_eq!(found, Some(TableRef::new("silver", "orders")));
        assert_eq!(probes, vec!["silver.orders"]);

        assert_eq!(resolver.resolve_in("clean gold.nothing", &known, never), None);
    }

    #[test]
    fn test_table_ref_parsing() {
        assert_eq!(
            TableRef::from_qualified("main.silver.customers_clean"),
            Some(TableRef::new("silver", "customers_clean"))
        );
        assert_eq!(
            TableRef::from_qualified("`bronze`.`raw`"),
            Some(TableRef::new("bronze", "raw"))
        );
        assert_eq!(TableRef::from_qualified("raw"), None);
        assert_eq!(TableRef::from_qualified("a.b.c.d"), None);
        assert_eq!(TableRef::new("bronze", "raw").to_string(), "bronze.raw");
    }

    #[test]
    fn test_anaphora() {
        assert!(mentions_anaphora("clean this table"));
        assert!(mentions_anaphora("dedupe it by id"));
        assert!(mentions_anaphora("What columns are in the table?"));
        assert!(!mentions_anaphora("edit the items"));
    }
}
