//! Prompt templates
//!
//! Pure string assembly; no decisions are made here.

use crate::warehouse::{group_thousands, QueryResult, TableSchema};

const TRANSFORM_TEMPLATE: &str = r#"You are an expert Databricks SQL developer. Generate SQL to transform data based on the user's request.

## Source Table Information

{schema_context}

## Sample Data (first {sample_count} rows)

{sample_data}

## User Request

{user_request}

## Target Layer

Create the output table in the `{target_schema}` schema.

## Rules

1. Use CREATE OR REPLACE TABLE {catalog}.{target_schema}.<table_name> AS SELECT ...
2. Generate a descriptive target table name based on the transformation
3. Handle NULL values appropriately
4. Use proper Databricks/Spark SQL syntax
5. Add SQL comments explaining key transformation steps
6. For deduplication, use ROW_NUMBER() with appropriate ordering
7. For name standardization, use INITCAP() for proper case
8. For email standardization, use LOWER()
9. Preserve data types appropriately
10. Produce exactly one statement

## Response Format

Return ONLY a valid JSON object with this exact structure (no markdown, no extra text):

{
    "target_table": "{catalog}.{target_schema}.table_name",
    "sql": "CREATE OR REPLACE TABLE ... (full SQL statement)",
    "transformations_applied": ["list", "of", "transformations"],
    "explanation": "Brief description of what the SQL does",
    "estimated_impact": {
        "rows_before": {row_count},
        "estimated_rows_after": <your estimate>,
        "columns_modified": ["list of modified columns"]
    }
}

Return ONLY the JSON object, nothing else."#;

const SCHEDULE_TEMPLATE: &str = r#"Convert this natural language schedule to a cron expression.

User Input: {schedule_text}

Return ONLY a JSON object:
{
    "cron_expression": "0 6 * * 1",
    "human_readable": "Every Monday at 6:00 AM",
    "timezone": "UTC"
}

Common patterns:
- "every day at 6am" → "0 6 * * *"
- "every Monday at 6am" → "0 6 * * 1"
- "hourly" → "0 * * * *"
- "every Sunday at midnight" → "0 0 * * 0"

Return ONLY the JSON object."#;

/// Everything the transform prompt needs
#[derive(Debug, Clone, Copy)]
pub struct TransformPromptInput<'a> {
    pub request: &'a str,
    pub schema: &'a TableSchema,
    pub sample: &'a QueryResult,
    pub target_schema: &'a str,
    pub catalog: &'a str,
}

/// Table name, row count and `name: type` column lines
pub fn schema_context(schema: &TableSchema) -> String {
    let columns: Vec<String> = schema
        .columns
        .iter()
        .map(|c| format!("  - {}: {}", c.name, c.data_type))
        .collect();

    format!(
        "Table: {}\nTotal Rows: {}\n\nColumns:\n{}",
        schema.full_name(),
        group_thousands(schema.row_count.unwrap_or(0)),
        columns.join("\n")
    )
}

/// Pipe-separated sample rows, `NULL` for nulls
pub fn sample_context(sample: &QueryResult) -> String {
    if sample.rows.is_empty() {
        return "(No sample data available)".to_string();
    }

    let mut lines = Vec::with_capacity(sample.rows.len() + 2);
    lines.push(sample.columns.join(" | "));
    lines.push("-".repeat(80));
    for row in &sample.rows {
        let values: Vec<&str> = row.iter().map(|v| v.as_deref().unwrap_or("NULL")).collect();
        lines.push(values.join(" | "));
    }
    lines.join("\n")
}

pub fn transform_prompt(input: &TransformPromptInput<'_>) -> String {
    // Data-bearing placeholders go last so their contents are never re-expanded
    TRANSFORM_TEMPLATE
        .replace("{sample_count}", &input.sample.row_count().to_string())
        .replace("{row_count}", &input.schema.row_count.unwrap_or(0).to_string())
        .replace("{target_schema}", input.target_schema)
        .replace("{catalog}", input.catalog)
        .replace("{schema_context}", &schema_context(input.schema))
        .replace("{sample_data}", &sample_context(input.sample))
        .replace("{user_request}", input.request)
}

pub fn schedule_prompt(schedule_text: &str) -> String {
    SCHEDULE_TEMPLATE.replace("{schedule_text}", schedule_text)
}
