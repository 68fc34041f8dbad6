//! CLI module
//!
//! Provides:
//! - Argument parsing (`chat`, `ask`, `check`, `init-sample`, `schedule`)
//! - Config path resolution (flag → env → cwd)
//! - Logging setup (stderr or a log file)
//! - Backend construction from settings
//! - Mode dispatch and the interactive REPL

pub mod args;
pub mod bootstrap;
pub mod config_path;
pub mod dispatch;
pub mod logging;
pub mod preflight;
pub mod repl;

pub use args::{parse_args, Args, Mode};
pub use bootstrap::{build_adapter, build_session, build_warehouse};
pub use config_path::resolve_config_path;
pub use dispatch::{run_cli_mode, ExitCode};
pub use logging::init_logging;
pub use preflight::{run_preflight, CheckStatus, PreflightReport};
pub use repl::run_repl;

use crate::config::ConfigError;
use crate::llm::{AdapterError, PlanError};
use crate::warehouse::WarehouseError;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid arguments: {0}")]
    InvalidArgs(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Warehouse error: {0}")]
    Warehouse(#[from] WarehouseError),

    #[error("LLM error: {0}")]
    Llm(#[from] AdapterError),

    #[error("{0}")]
    Plan(#[from] PlanError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Exit codes (deterministic)
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_CONFIG_ERROR: i32 = 2;
pub const EXIT_BACKEND_ERROR: i32 = 3;

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, Error>;
