//! Reply text
//!
//! Markdown-flavoured plain text; every user-visible string the session
//! produces is built here.

use crate::llm::TransformPlan;
use crate::session::errors::{SessionError, TableAction};
use crate::session::resolver::TableRef;
use crate::session::session_state::{SessionState, TransformResult};
use crate::warehouse::{group_thousands, QueryResult, SchemaListing, TableSchema};

/// One schema's tables with their row counts, when known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableListingEntry {
    pub schema: String,
    pub tables: Vec<(String, Option<u64>)>,
}

pub fn help() -> String {
    "## Data Transform Agent - Help

### Ask Questions
  - \"What columns are in raw_customers?\"
  - \"How many rows are in the customers table?\"
  - \"Show me a preview of the data\"
  - \"What tables are available?\"

### Transform Data
  - \"Clean raw_customers, remove nulls, dedupe by contact_id\"
  - \"Standardize emails to lowercase\"
  - \"Aggregate sales by region, save to gold\"

### Commands
  - `show tables` - List all available tables
  - `describe <table>` - Show table schema and sample data
  - `status` - Show agent status
  - `help` - Show this message

### During Confirmation
  - `confirm` / `yes` - Execute the transform
  - `cancel` / `no` - Cancel and start over
  - `show sql` - View the generated SQL
"
    .to_string()
}

pub fn generic_answer() -> String {
    "I'm not sure how to answer that. Here's what I can help with:

**Questions I can answer:**
  - \"What columns are in raw_customers?\"
  - \"How many rows are in bronze.raw_customers?\"
  - \"Show me a preview of the customers table\"
  - \"What tables are available?\"

**Transformations I can do:**
  - \"Clean raw_customers, remove nulls, dedupe by contact_id\"
  - \"Standardize emails to lowercase\"

**Commands:**
  - `show tables` - List all tables
  - `describe <table>` - See table details
  - `help` - Full help guide
"
    .to_string()
}

fn qualified_names(listings: &[SchemaListing]) -> Vec<String> {
    listings
        .iter()
        .flat_map(|l| l.tables.iter().map(move |t| format!("{}.{}", l.schema, t)))
        .collect()
}

/// A question needs a table and none was named
pub fn ask_which_table(action: &str, listings: &[SchemaListing]) -> String {
    let names = qualified_names(listings);
    let available = if names.is_empty() {
        "No tables found".to_string()
    } else {
        names
            .iter()
            .map(|n| format!("`{}`", n))
            .collect::<Vec<_>>()
            .join(", ")
    };

    format!(
        "Which table would you like to {}?\n\n**Available tables:** {}\n\n**Example:** \"What columns are in raw_customers?\"\n",
        action, available
    )
}

/// A transform request named no table we could find
pub fn transform_table_clarification(listings: &[SchemaListing]) -> String {
    let names = qualified_names(listings);
    if names.is_empty() {
        return "No tables found in bronze, silver, or gold. Create some tables first (try `medallion init-sample`).".to_string();
    }

    let list: Vec<String> = names.iter().map(|n| format!("  - `{}`", n)).collect();
    format!(
        "I couldn't identify which table you want to transform.\n\n**Available tables:**\n{}\n\n**Please try again with the table name, for example:**\n  - \"Clean bronze.raw_customers and remove nulls\"\n  - \"Transform raw_customers to silver\"\n",
        list.join("\n")
    )
}

/// Clarifying question for a request whose table could not be resolved
pub fn clarification(action: TableAction, listings: &[SchemaListing]) -> String {
    match action {
        TableAction::Transform => transform_table_clarification(listings),
        other => ask_which_table(other.verb(), listings),
    }
}

/// Unclear message that did name a table
pub fn table_options(table: &TableRef) -> String {
    format!(
        "I found table `{}` in your message. What would you like to do?\n\n**Options:**\n  - \"Show me the columns\" - See table structure\n  - \"Preview the data\" - See sample rows\n  - \"Clean it and remove nulls\" - Start a transformation\n\nOr be more specific about what you'd like to know or do!\n",
        table
    )
}

pub fn table_list(entries: &[TableListingEntry]) -> String {
    let mut lines = vec!["## Available Tables".to_string(), String::new()];
    let mut any = false;

    for entry in entries.iter().filter(|e| !e.tables.is_empty()) {
        any = true;
        lines.push(format!("### {}", entry.schema.to_uppercase()));
        for (table, rows) in &entry.tables {
            match rows {
                Some(rows) => lines.push(format!(
                    "  - `{}.{}` ({} rows)",
                    entry.schema,
                    table,
                    group_thousands(*rows)
                )),
                None => lines.push(format!("  - `{}.{}`", entry.schema, table)),
            }
        }
        lines.push(String::new());
    }

    if !any {
        lines.push("No tables found in bronze, silver, or gold.".to_string());
    }
    lines.join("\n")
}

fn rows_label(schema: &TableSchema) -> String {
    schema
        .row_count
        .map(group_thousands)
        .unwrap_or_else(|| "unknown".to_string())
}

/// Header, divider, then rows; cells cut to `width` characters
fn sample_block(schema: &TableSchema, sample: &QueryResult, width: usize, rule: usize) -> Vec<String> {
    let header: Vec<&str> = if sample.columns.is_empty() {
        schema.column_names()
    } else {
        sample.columns.iter().map(String::as_str).collect()
    };

    let mut lines = vec!["```".to_string(), header.join(" | "), "-".repeat(rule)];
    for row in &sample.rows {
        let cells: Vec<String> = row
            .iter()
            .map(|v| match v {
                Some(text) => text.chars().take(width).collect(),
                None => "NULL".to_string(),
            })
            .collect();
        lines.push(cells.join(" | "));
    }
    lines.push("```".to_string());
    lines
}

pub fn columns(table: &TableRef, schema: &TableSchema) -> String {
    let mut lines = vec![
        format!("## Columns in `{}`", table),
        String::new(),
        format!("**Total Columns:** {}", schema.columns.len()),
        String::new(),
    ];
    for col in &schema.columns {
        let nullable = if col.nullable { "nullable" } else { "not null" };
        lines.push(format!("  - **{}** (`{}`) - {}", col.name, col.data_type, nullable));
    }
    lines.push(String::new());
    lines.push(format!("**Rows in table:** {}", rows_label(schema)));
    lines.push(String::new());
    lines.push(format!("*Tip: Say `describe {}` to see sample data too.*", table));
    lines.join("\n")
}

pub fn preview(table: &TableRef, schema: &TableSchema, sample: &QueryResult) -> String {
    let mut lines = vec![
        format!("## Preview: `{}`", table),
        String::new(),
        format!("**Total Rows:** {}", rows_label(schema)),
        String::new(),
        format!("### Sample Data ({} rows):", sample.row_count()),
    ];
    lines.extend(sample_block(schema, sample, 15, 70));
    lines.join("\n")
}

pub fn describe(schema: &TableSchema, sample: &QueryResult) -> String {
    let mut lines = vec![
        format!("## {}", schema.full_name()),
        String::new(),
        format!("**Rows:** {}", rows_label(schema)),
        String::new(),
        "### Columns:".to_string(),
    ];
    for col in &schema.columns {
        lines.push(format!("  - `{}`: {}", col.name, col.data_type));
    }
    lines.push(String::new());
    lines.push(format!("### Sample Data ({} rows):", sample.row_count()));
    lines.extend(sample_block(schema, sample, 20, 60));
    lines.join("\n")
}

pub fn plan(plan: &TransformPlan, source: &TableSchema) -> String {
    let mut lines = vec![
        "## Transform Plan".to_string(),
        String::new(),
        format!("**Source:** `{}` ({} rows)", source.full_name(), rows_label(source)),
        format!("**Target:** `{}`", plan.target_table),
        String::new(),
        "### Transformations:".to_string(),
    ];
    for step in &plan.transformations {
        lines.push(format!("  - {}", step));
    }
    if !plan.explanation.is_empty() {
        lines.push(String::new());
        lines.push(format!("**Explanation:** {}", plan.explanation));
    }
    if let Some(rows) = plan.estimated_rows_after {
        lines.push(String::new());
        lines.push(format!("**Estimated Output:** ~{} rows", group_thousands(rows)));
    }
    if let Some(cols) = plan.columns_modified.as_ref().filter(|c| !c.is_empty()) {
        lines.push(format!("**Columns Modified:** {}", cols.join(", ")));
    }
    lines.extend([
        String::new(),
        "### Generated SQL:".to_string(),
        "```sql".to_string(),
        plan.sql.clone(),
        "```".to_string(),
        String::new(),
        "---".to_string(),
        "**Commands:**".to_string(),
        "  - `confirm` - Execute this transform".to_string(),
        "  - `cancel` - Abort and start over".to_string(),
        "  - `show sql` - Show SQL again".to_string(),
    ]);
    lines.join("\n")
}

pub fn pending_sql(plan: &TransformPlan) -> String {
    format!(
        "## Generated SQL\n```sql\n{}\n```\n\n**Commands:** `confirm` to execute, `cancel` to abort.\n",
        plan.sql
    )
}

pub fn confirmation_prompt() -> String {
    "I have a transform ready to execute. Please respond with:\n\n  - `confirm` or `yes` - Execute the transform\n  - `cancel` or `no` - Cancel and start over\n  - `show sql` - View the SQL again\n".to_string()
}

pub fn cancelled() -> String {
    "Transform cancelled. Ready for a new request.".to_string()
}

pub fn executed(target_table: &str, rows: u64) -> String {
    let short_name = target_table.rsplit('.').next().unwrap_or(target_table);
    format!(
        "## Transform Complete!\n\n**Created:** `{}`\n**Rows:** {}\n\nYou can now:\n- Query the new table\n- Use it as a source for further transformations\n- Ask me to create another transform\n\n**Example:** \"What columns are in {}?\"\n",
        target_table,
        group_thousands(rows),
        short_name
    )
}

pub fn execution_failed(message: &str) -> String {
    format!(
        "**Execution failed:**\n\n```\n{}\n```\n\nThe transform was discarded. Please check the SQL and try again.",
        message
    )
}

/// Everything `status` shows
#[derive(Debug, Clone, Copy)]
pub struct StatusView<'a> {
    pub state: SessionState,
    pub endpoint: &'a str,
    pub catalog: &'a str,
    pub provider: &'a str,
    pub pending: Option<(&'a TableRef, &'a str)>,
    pub last_result: Option<&'a TransformResult>,
    pub last_mentioned: Option<&'a TableRef>,
}

pub fn status(view: &StatusView<'_>) -> String {
    let mut lines = vec![
        "## Agent Status".to_string(),
        String::new(),
        format!("**State:** {}", view.state),
        format!("**Connected to:** {}", view.endpoint),
        format!("**Catalog:** {}", view.catalog),
        format!("**LLM:** {}", view.provider),
    ];

    if let Some(table) = view.last_mentioned {
        lines.push(format!("**Current table:** {}", table));
    }

    if let Some((source, target)) = view.pending {
        lines.push(String::new());
        lines.push("**Pending Transform:**".to_string());
        lines.push(format!("  - Source: {}", source));
        lines.push(format!("  - Target: {}", target));
    }

    if let Some(result) = view.last_result {
        lines.push(String::new());
        lines.push("**Last Result:**".to_string());
        lines.push(format!(
            "  - {}",
            if result.success { "Success" } else { "Failed" }
        ));
        lines.push(format!("  - Table: {}", result.target_table));
        lines.push(format!("  - Rows: {}", group_thousands(result.rows_created)));
        if !result.success {
            lines.push(format!("  - Error: {}", result.message));
        }
    }

    lines.join("\n")
}

pub fn error(err: &SessionError) -> String {
    match err {
        SessionError::NoPendingTransform => {
            "No pending transform to act on. Describe a transformation first, for example \"Clean raw_customers and remove nulls\".".to_string()
        }
        SessionError::InvalidReference(message) => message.clone(),
        SessionError::ResolutionAmbiguous(action) => format!(
            "I couldn't work out which table to {}. Try `help` for examples.",
            action.verb()
        ),
        SessionError::PlanGeneration(e) => format!(
            "**Could not build a transform plan:**\n\n{}\n\nPlease try rephrasing the request.",
            e
        ),
        SessionError::BackendUnavailable(e) => format!(
            "**Error processing request:**\n\n{}\n\nPlease try rephrasing or use `help` to see available commands.",
            e
        ),
    }
}
