//! Transform plans
//!
//! The LLM answers the transform prompt with a JSON object. Parsing is a
//! strict parse of the whole reply, then exactly one fallback: the first
//! balanced `{...}` object in the text (models like to wrap the payload in
//! commentary or code fences). Anything beyond that is a hard error carrying
//! an excerpt of the raw reply.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::http::truncate;
use crate::llm::adapters::AdapterError;
use crate::warehouse::{validate_identifier, Layer};

/// Raw replies embedded in errors are cut to this many characters
pub const RAW_EXCERPT_CHARS: usize = 500;

static CREATE_TABLE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?is)^CREATE\s+(?:OR\s+REPLACE\s+)?TABLE\s+(?:IF\s+NOT\s+EXISTS\s+)?([`\w.]+)",
    )
    .expect("static regex")
});

/// A generated transformation awaiting confirmation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformPlan {
    /// Fully-qualified `catalog.schema.table`
    pub target_table: String,
    /// Single `CREATE OR REPLACE TABLE ... AS SELECT` statement
    pub sql: String,
    /// Human-readable steps, in order
    pub transformations: Vec<String>,
    pub explanation: String,
    pub estimated_rows_after: Option<u64>,
    pub columns_modified: Option<Vec<String>>,
}

impl TransformPlan {
    /// Schema part of the target name
    pub fn target_schema(&self) -> Option<&str> {
        self.target_table.split('.').nth(1)
    }

    /// Table part of the target name
    pub fn target_name(&self) -> &str {
        self.target_table
            .rsplit('.')
            .next()
            .unwrap_or(&self.target_table)
    }
}

/// Plan generation / parsing errors
#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    /// Reply could not be read as a JSON object
    #[error("Malformed LLM response ({reason}). Response was: {excerpt}")]
    Malformed { reason: String, excerpt: String },

    #[error("LLM response is missing required field '{0}'")]
    MissingField(&'static str),

    #[error("Invalid target table '{0}': expected catalog.schema.table")]
    InvalidTarget(String),

    /// Generated SQL failed the shape check
    #[error("Rejected generated SQL: {0}")]
    UnsafeSql(String),

    #[error("Invalid cron expression '{0}'")]
    InvalidCron(String),

    #[error(transparent)]
    Backend(#[from] AdapterError),
}

impl PlanError {
    pub fn malformed(reason: impl Into<String>, raw: &str) -> Self {
        PlanError::Malformed {
            reason: reason.into(),
            excerpt: truncate(raw, RAW_EXCERPT_CHARS),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawPlan {
    #[serde(default)]
    target_table: Option<String>,
    #[serde(default)]
    sql: Option<String>,
    #[serde(default)]
    transformations_applied: Vec<String>,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    estimated_impact: Option<RawImpact>,
}

#[derive(Debug, Deserialize)]
struct RawImpact {
    #[serde(default)]
    estimated_rows_after: Option<JsonValue>,
    #[serde(default)]
    columns_modified: Option<Vec<String>>,
}

/// Locate the first balanced JSON object in `text`
///
/// Braces inside string literals (and escaped quotes) are skipped. Returns
/// `None` when there is no `{` or it is never closed.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Parse a JSON value: whole text first, then the first embedded object
pub fn parse_json_reply(raw: &str) -> Result<JsonValue, PlanError> {
    let trimmed = raw.trim();
    match serde_json::from_str::<JsonValue>(trimmed) {
        Ok(value) => Ok(value),
        Err(strict) => {
            tracing::debug!(error = %strict, "strict parse failed, extracting embedded object");
            let candidate = extract_json_object(trimmed)
                .ok_or_else(|| PlanError::malformed("no JSON object found", raw))?;
            serde_json::from_str(candidate).map_err(|e| PlanError::malformed(e.to_string(), raw))
        }
    }
}

/// Parse the LLM reply to the transform prompt
pub fn parse_plan_response(raw: &str) -> Result<TransformPlan, PlanError> {
    tracing::debug!(response = %raw, "raw plan response");

    let value = parse_json_reply(raw)?;
    let parsed: RawPlan =
        serde_json::from_value(value).map_err(|e| PlanError::malformed(e.to_string(), raw))?;

    let target_table = parsed
        .target_table
        .map(|t| t.replace('`', "").trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(PlanError::MissingField("target_table"))?;
    let sql = parsed
        .sql
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(PlanError::MissingField("sql"))?;

    let parts: Vec<&str> = target_table.split('.').collect();
    if parts.len() != 3 || parts.iter().any(|p| validate_identifier(p).is_err()) {
        return Err(PlanError::InvalidTarget(target_table));
    }

    let (estimated_rows_after, columns_modified) = match parsed.estimated_impact {
        Some(impact) => (
            impact.estimated_rows_after.as_ref().and_then(row_estimate),
            impact.columns_modified,
        ),
        None => (None, None),
    };

    Ok(TransformPlan {
        target_table,
        sql,
        transformations: parsed.transformations_applied,
        explanation: parsed.explanation.unwrap_or_default(),
        estimated_rows_after,
        columns_modified,
    })
}

/// Row estimates arrive as numbers, or as text like `"~1,200"`
fn row_estimate(value: &JsonValue) -> Option<u64> {
    match value {
        JsonValue::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f.round() as u64)),
        JsonValue::String(s) => {
            let digits: String = s.chars().filter(|c| c.is_ascii_digit()).collect();
            digits.parse().ok()
        }
        _ => None,
    }
}

/// Check that the plan is one `CREATE [OR REPLACE] TABLE` of its own target
/// inside `catalog` and the `expected` layer
pub fn check_sql_shape(
    plan: &TransformPlan,
    catalog: &str,
    expected: Layer,
) -> Result<(), PlanError> {
    let statements = split_statements(&plan.sql);
    if statements.len() != 1 {
        return Err(PlanError::UnsafeSql(format!(
            "expected a single statement, found {}",
            statements.len()
        )));
    }

    let created = CREATE_TABLE
        .captures(&statements[0])
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().replace('`', ""))
        .ok_or_else(|| {
            PlanError::UnsafeSql("statement must be CREATE [OR REPLACE] TABLE ... AS SELECT".to_string())
        })?;

    if !created.eq_ignore_ascii_case(&plan.target_table) {
        return Err(PlanError::UnsafeSql(format!(
            "statement creates {} but the plan targets {}",
            created, plan.target_table
        )));
    }

    let target_catalog = plan.target_table.split('.').next().unwrap_or_default();
    if !target_catalog.eq_ignore_ascii_case(catalog) {
        return Err(PlanError::UnsafeSql(format!(
            "target catalog {} is not the configured catalog {}",
            target_catalog, catalog
        )));
    }

    match plan.target_schema() {
        Some(schema) if schema.eq_ignore_ascii_case(expected.as_str()) => Ok(()),
        other => Err(PlanError::UnsafeSql(format!(
            "target schema {} is not the {} layer",
            other.unwrap_or("?"),
            expected
        ))),
    }
}

/// Split SQL into statements, dropping comments and empty statements
///
/// Quotes (`'`, `"`, `` ` ``) are respected so `;` or `--` inside literals
/// do not split.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(ch) = chars.next() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                // Doubled quote is an escaped quote
                if chars.peek() == Some(&q) {
                    if let Some(next) = chars.next() {
                        current.push(next);
                    }
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match ch {
            '\'' | '"' | '`' => {
                quote = Some(ch);
                current.push(ch);
            }
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                current.push(' ');
            }
            ';' => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    statements
}
