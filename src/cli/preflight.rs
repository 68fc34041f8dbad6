//! Connectivity check (`medallion check`)
//!
//! Reports configuration completeness, lists schemas through the warehouse
//! and sends a tiny prompt to the LLM. Never prompts, never writes config.

use std::fmt;

use crate::cli::bootstrap::{build_adapter, build_warehouse};
use crate::config::Settings;
use crate::llm::LlmAdapter;
use crate::warehouse::{Layer, Warehouse};

const PING_PROMPT: &str = "Reply with the single word OK.";
const PING_MAX_TOKENS: u32 = 8;

/// Outcome of one check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warning,
    Failed,
    Skipped,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Ok => "ok",
            CheckStatus::Warning => "warn",
            CheckStatus::Failed => "FAIL",
            CheckStatus::Skipped => "skip",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckItem {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

impl CheckItem {
    fn new(name: &'static str, status: CheckStatus, detail: impl Into<String>) -> Self {
        Self {
            name,
            status,
            detail: detail.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreflightReport {
    pub items: Vec<CheckItem>,
}

impl PreflightReport {
    /// No check failed (warnings allowed)
    pub fn passed(&self) -> bool {
        self.items.iter().all(|i| i.status != CheckStatus::Failed)
    }

    pub fn render(&self) -> String {
        self.items
            .iter()
            .map(|i| format!("[{:>4}] {:<10} {}", i.status, i.name, i.detail))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Run every check against `settings`
pub fn run_preflight(settings: &Settings) -> PreflightReport {
    let mut report = PreflightReport::default();

    let source = settings
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "defaults + environment".to_string());
    report.items.push(match settings.validate() {
        Ok(()) => CheckItem::new("config", CheckStatus::Ok, source),
        Err(e) => CheckItem::new("config", CheckStatus::Failed, format!("{} ({})", e, source)),
    });

    report.items.push(match build_warehouse(&settings.warehouse) {
        Ok(warehouse) => check_warehouse(&warehouse),
        Err(e) => CheckItem::new("warehouse", CheckStatus::Skipped, e.to_string()),
    });

    report.items.push(match build_adapter(&settings.llm) {
        Ok(adapter) => check_llm(&adapter),
        Err(e) => CheckItem::new("llm", CheckStatus::Skipped, e.to_string()),
    });

    report
}

/// List schemas and report missing layers
pub fn check_warehouse<W: Warehouse + ?Sized>(warehouse: &W) -> CheckItem {
    match warehouse.list_schemas() {
        Ok(schemas) => {
            let missing: Vec<&str> = Layer::ALL
                .iter()
                .map(|l| l.as_str())
                .filter(|layer| !schemas.iter().any(|s| s.eq_ignore_ascii_case(layer)))
                .collect();
            if missing.is_empty() {
                CheckItem::new(
                    "warehouse",
                    CheckStatus::Ok,
                    format!("{} ({} schemas)", warehouse.endpoint(), schemas.len()),
                )
            } else {
                CheckItem::new(
                    "warehouse",
                    CheckStatus::Warning,
                    format!(
                        "{}: missing layer schemas {} (try `medallion init-sample`)",
                        warehouse.endpoint(),
                        missing.join(", ")
                    ),
                )
            }
        }
        Err(e) => CheckItem::new(
            "warehouse",
            CheckStatus::Failed,
            format!("{}: {}", warehouse.endpoint(), e),
        ),
    }
}

/// Send a tiny prompt and expect any reply
pub fn check_llm<A: LlmAdapter + ?Sized>(adapter: &A) -> CheckItem {
    let label = format!("{}/{}", adapter.provider_name(), adapter.model());
    match adapter.generate(PING_PROMPT, PING_MAX_TOKENS) {
        Ok(_) => CheckItem::new("llm", CheckStatus::Ok, label),
        Err(e) => CheckItem::new("llm", CheckStatus::Failed, format!("{}: {}", label, e)),
    }
}
