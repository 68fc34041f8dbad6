//! Schedule conversion
//!
//! Stateless: turns "every Monday at 6am" into a five-field cron expression
//! via the LLM. Nothing is scheduled or run.

use serde::Deserialize;

use crate::llm::adapters::LlmAdapter;
use crate::llm::plan::{parse_json_reply, PlanError};
use crate::llm::prompts::schedule_prompt;

const SCHEDULE_MAX_TOKENS: u32 = 256;

/// A parsed schedule
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulePlan {
    pub cron_expression: String,
    #[serde(default)]
    pub human_readable: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Ask the LLM for a cron expression and validate its shape
pub fn parse_schedule<A: LlmAdapter + ?Sized>(
    adapter: &A,
    schedule_text: &str,
) -> Result<SchedulePlan, PlanError> {
    let raw = adapter.generate(&schedule_prompt(schedule_text), SCHEDULE_MAX_TOKENS)?;
    tracing::debug!(response = %raw, "raw schedule response");

    let value = parse_json_reply(&raw)?;
    let mut plan: SchedulePlan =
        serde_json::from_value(value).map_err(|e| PlanError::malformed(e.to_string(), &raw))?;

    plan.cron_expression = plan.cron_expression.split_whitespace().collect::<Vec<_>>().join(" ");
    if plan.timezone.trim().is_empty() {
        plan.timezone = default_timezone();
    }
    validate_cron(&plan.cron_expression)?;
    Ok(plan)
}

/// Five whitespace-separated fields drawn from `0-9 * , - /`
/// (plus names like `MON` or `JAN`)
pub fn validate_cron(expression: &str) -> Result<(), PlanError> {
    let fields: Vec<&str> = expression.split_whitespace().collect();
    let well_formed = fields.len() == 5
        && fields.iter().all(|f| {
            f.chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '*' | ',' | '-' | '/'))
        });

    if well_formed {
        Ok(())
    } else {
        Err(PlanError::InvalidCron(expression.to_string()))
    }
}
