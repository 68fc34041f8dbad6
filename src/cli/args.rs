//! CLI argument parsing
//!
//! Grammar:
//! ```text
//! medallion [--config <file>] [--log-file <file>] [--log-level <level>] [mode]
//!
//! MODES:
//!   (no mode) | chat        → interactive conversation
//!   ask <message...>        → one turn, reply on stdout
//!   check                   → configuration and connectivity report
//!   init-sample             → create layer schemas and bronze.raw_customers
//!   schedule <text...>      → natural-language schedule to cron
//! ```

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::cli::{Error, Result};

/// Parsed CLI arguments
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(
    name = "medallion",
    version,
    about = "Conversational transforms over bronze/silver/gold warehouse layers"
)]
pub struct Args {
    /// Config file (default: $MEDALLION_CONFIG, then ./medallion.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level or filter directive; RUST_LOG wins when set
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub mode: Option<Mode>,
}

/// CLI modes
#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Mode {
    /// Interactive conversation (default)
    Chat,

    /// Run a single turn and print the reply
    Ask {
        #[arg(required = true, trailing_var_arg = true)]
        message: Vec<String>,
    },

    /// Check configuration, warehouse and LLM connectivity
    Check,

    /// Create the layer schemas and a dirty sample table in bronze
    InitSample,

    /// Convert a natural-language schedule into a cron expression
    Schedule {
        #[arg(required = true, trailing_var_arg = true)]
        text: Vec<String>,
    },
}

impl Args {
    /// Selected mode, `chat` when none was given
    pub fn mode(&self) -> Mode {
        self.mode.clone().unwrap_or(Mode::Chat)
    }
}

/// Parse arguments without exiting the process
///
/// `--help`/`--version` come back as [`Error::InvalidArgs`] carrying clap's
/// rendered text; `main` uses `Args::parse()` so those print and exit.
pub fn parse_args<I, T>(args: I) -> Result<Args>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Args::try_parse_from(args).map_err(|e| Error::InvalidArgs(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args> {
        parse_args(std::iter::once("medallion").chain(args.iter().copied()))
    }

    #[test]
    fn test_no_mode_defaults_to_chat() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.mode, None);
        assert_eq!(args.mode(), Mode::Chat);
    }

    #[test]
    fn test_ask_joins_words() {
        let args = parse(&["ask", "show", "tables"]).unwrap();
        assert_eq!(
            args.mode(),
            Mode::Ask {
                message: vec!["show".to_string(), "tables".to_string()]
            }
        );
    }

    #[test]
    fn test_global_flags_after_mode() {
        let args = parse(&["check", "--config", "prod.toml", "--log-level", "debug"]).unwrap();
        assert_eq!(args.mode(), Mode::Check);
        assert_eq!(args.config, Some(PathBuf::from("prod.toml")));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_kebab_case_mode() {
        let args = parse(&["init-sample", "--log-file", "agent.log"]).unwrap();
        assert_eq!(args.mode(), Mode::InitSample);
        assert_eq!(args.log_file, Some(PathBuf::from("agent.log")));
    }

    #[test]
    fn test_ask_requires_message() {
        assert!(matches!(parse(&["ask"]), Err(Error::InvalidArgs(_))));
    }

    #[test]
    fn test_unknown_mode_fails() {
        assert!(matches!(parse(&["deploy"]), Err(Error::InvalidArgs(_))));
    }
}
