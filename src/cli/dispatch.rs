//! CLI mode dispatch
//!
//! Dispatches to the mode handlers:
//! - chat: interactive REPL over one session
//! - ask: single turn
//! - check: preflight report
//! - init-sample: seed the bronze layer
//! - schedule: natural language → cron

use std::io::{self, Write};

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;

use crate::cli::bootstrap::{build_adapter, build_session, build_warehouse};
use crate::cli::config_path::resolve_config_path;
use crate::cli::logging::init_logging;
use crate::cli::preflight::run_preflight;
use crate::cli::repl::run_repl;
use crate::cli::{
    Args, Error, Mode, Result, EXIT_BACKEND_ERROR, EXIT_CONFIG_ERROR, EXIT_FAILURE, EXIT_SUCCESS,
};
use crate::config::{BackendKind, Settings};
use crate::llm::parse_schedule;
use crate::session::ReplyKind;
use crate::warehouse::{format_table_info, seed_sample_data};

/// Exit code wrapper for CLI operations
pub type ExitCode = i32;

/// Run the selected mode and return the process exit code
pub fn run_cli_mode(args: Args) -> ExitCode {
    let (settings, _guard) = match start(&args) {
        Ok(started) => started,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return EXIT_CONFIG_ERROR;
        }
    };

    match run_mode(args.mode(), &settings) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {}", e);
            exit_code_for(&e)
        }
    }
}

/// Load configuration and install logging
fn start(args: &Args) -> anyhow::Result<(Settings, Option<WorkerGuard>)> {
    dotenvy::dotenv().ok();

    let path = resolve_config_path(args.config.as_deref()).context("resolving config file")?;
    let settings = Settings::load(path.as_deref()).with_context(|| match &path {
        Some(p) => format!("loading {}", p.display()),
        None => "loading configuration from environment".to_string(),
    })?;

    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| settings.agent.log_level.clone());
    let guard = init_logging(&level, args.log_file.as_deref()).context("initialising logging")?;

    tracing::debug!(source = ?settings.source, backend = %settings.warehouse.backend, "configuration loaded");
    Ok((settings, guard))
}

fn run_mode(mode: Mode, settings: &Settings) -> Result<ExitCode> {
    match mode {
        Mode::Chat => run_chat_mode(settings),
        Mode::Ask { message } => run_ask_mode(settings, &message.join(" ")),
        Mode::Check => run_check_mode(settings),
        Mode::InitSample => run_init_sample_mode(settings),
        Mode::Schedule { text } => run_schedule_mode(settings, &text.join(" ")),
    }
}

fn run_chat_mode(settings: &Settings) -> Result<ExitCode> {
    let mut session = build_session(settings)?;
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    let turns = run_repl(&mut session, stdin.lock(), &mut stdout)?;
    tracing::info!(turns, "chat ended");
    session.close();
    Ok(EXIT_SUCCESS)
}

fn run_ask_mode(settings: &Settings, message: &str) -> Result<ExitCode> {
    let mut session = build_session(settings)?;
    let reply = session.handle_turn(message);

    let mut stdout = io::stdout();
    writeln!(stdout, "{}", reply.text)?;

    if session.pending().is_some() {
        writeln!(
            stdout,
            "\n(One-shot mode: nothing was executed. Use `medallion chat` to confirm a transform.)"
        )?;
    }

    Ok(match reply.kind {
        ReplyKind::Error => EXIT_FAILURE,
        _ => EXIT_SUCCESS,
    })
}

fn run_check_mode(settings: &Settings) -> Result<ExitCode> {
    let report = run_preflight(settings);
    println!("{}", report.render());
    Ok(if report.passed() {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    })
}

fn run_init_sample_mode(settings: &Settings) -> Result<ExitCode> {
    if settings.warehouse.backend == BackendKind::Sqlite && settings.warehouse.path.is_none() {
        tracing::warn!("sqlite warehouse is in memory; sample data will not outlive this command");
    }

    let warehouse = build_warehouse(&settings.warehouse)?;
    let schema = seed_sample_data(&warehouse)?;

    println!("Sample data ready.\n");
    println!("{}", format_table_info(&schema));
    println!("\nTry: medallion ask \"Clean {}, remove nulls, dedupe by contact_id\"", schema.table);
    Ok(EXIT_SUCCESS)
}

fn run_schedule_mode(settings: &Settings, text: &str) -> Result<ExitCode> {
    let adapter = build_adapter(&settings.llm)?;
    let plan = parse_schedule(&adapter, text)?;

    println!("Cron:     {}", plan.cron_expression);
    println!("Meaning:  {}", plan.human_readable);
    println!("Timezone: {}", plan.timezone);
    Ok(EXIT_SUCCESS)
}

fn exit_code_for(err: &Error) -> ExitCode {
    match err {
        Error::InvalidArgs(_) | Error::Config(_) | Error::Logging(_) => EXIT_CONFIG_ERROR,
        Error::Warehouse(_) | Error::Llm(_) => EXIT_BACKEND_ERROR,
        _ => EXIT_FAILURE,
    }
}
