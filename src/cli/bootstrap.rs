//! Backend construction
//!
//! Turns validated [`Settings`] into the concrete warehouse and adapter the
//! session runs against. Nothing here talks to the network; the first
//! request happens on the first turn (or in `check`).

use crate::cli::{Error, Result};
use crate::config::{BackendKind, LlmSettings, Settings, WarehouseSettings};
use crate::llm::{create_adapter, Adapter};
use crate::session::Session;
use crate::warehouse::{DatabricksWarehouse, SqliteWarehouse, WarehouseBackend};

/// Open the configured warehouse
pub fn build_warehouse(settings: &WarehouseSettings) -> Result<WarehouseBackend> {
    match settings.backend {
        BackendKind::Databricks => {
            let field = |value: &Option<String>, name: &str| {
                value
                    .clone()
                    .filter(|v| !v.trim().is_empty())
                    .ok_or_else(|| Error::InvalidArgs(format!("warehouse.{} is not set", name)))
            };
            let host = field(&settings.host, "host")?;
            let token = field(&settings.token, "token")?;
            let warehouse_id = field(&settings.warehouse_id, "warehouse_id")?;

            tracing::info!(host = %host, catalog = %settings.catalog, "using databricks warehouse");
            Ok(WarehouseBackend::Databricks(DatabricksWarehouse::new(
                host,
                token,
                warehouse_id,
                settings.catalog.clone(),
                settings.timeout_secs,
            )))
        }
        BackendKind::Sqlite => {
            let warehouse = match &settings.path {
                Some(dir) => SqliteWarehouse::open(dir, &settings.catalog)?,
                None => SqliteWarehouse::open_in_memory(&settings.catalog)?,
            };
            tracing::info!(catalog = %settings.catalog, "using sqlite warehouse");
            Ok(WarehouseBackend::Sqlite(warehouse))
        }
    }
}

/// Create the configured LLM adapter
pub fn build_adapter(settings: &LlmSettings) -> Result<Adapter> {
    Ok(create_adapter(settings)?)
}

/// Validate settings and assemble a ready-to-use session
pub fn build_session(settings: &Settings) -> Result<Session<WarehouseBackend, Adapter>> {
    settings.validate()?;
    let options = settings.session_options()?;
    let warehouse = build_warehouse(&settings.warehouse)?;
    let adapter = build_adapter(&settings.llm)?;
    Ok(Session::new(warehouse, adapter, options))
}
