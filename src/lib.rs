//! Medallion: conversational transforms over a bronze/silver/gold warehouse
//!
//! A [`session::Session`] takes one chat message at a time, works out
//! whether it is a question, a command or a transform request, and for
//! transforms asks an LLM for a `CREATE OR REPLACE TABLE ... AS SELECT`
//! plan that only runs after the user confirms it.

pub mod cli;
pub mod config;
pub mod http;
pub mod llm;
pub mod session;
pub mod warehouse;

pub use config::Settings;
pub use llm::{Adapter, LlmAdapter, StubAdapter, TransformPlan};
pub use session::{Reply, ReplyKind, Session, SessionError, SessionOptions, SessionState};
pub use warehouse::{
    DatabricksWarehouse, Layer, SqliteWarehouse, TableSchema, Warehouse, WarehouseBackend,
    WarehouseError,
};
