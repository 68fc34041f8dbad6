//! Plan generation
//!
//! Glue between a resolved source table and the LLM: pick the target layer,
//! build the prompt, call the adapter, parse and (optionally) shape-check
//! the reply.

use crate::llm::adapters::LlmAdapter;
use crate::llm::plan::{check_sql_shape, parse_plan_response, PlanError, TransformPlan};
use crate::llm::prompts::{transform_prompt, TransformPromptInput};
use crate::warehouse::{Layer, QueryResult, TableSchema};

/// Vocabulary that sends a request straight to the gold layer
const GOLD_WORDS: [&str; 4] = ["aggregate", "summary", "report", "metrics"];

/// Target layer for a request over a table in `source_schema`
///
/// First match wins: an explicit "gold"/"silver" mention, then aggregation
/// vocabulary (gold), then promotion by one layer (bronze → silver,
/// silver → gold), else silver.
pub fn choose_target_layer(request: &str, source_schema: &str) -> Layer {
    let request = request.to_lowercase();

    if request.contains("gold") {
        return Layer::Gold;
    }
    if request.contains("silver") {
        return Layer::Silver;
    }
    if GOLD_WORDS.iter().any(|w| request.contains(w)) {
        return Layer::Gold;
    }

    match Layer::from_name(source_schema) {
        Some(Layer::Bronze) => Layer::Silver,
        Some(Layer::Silver) => Layer::Gold,
        _ => Layer::Silver,
    }
}

/// Turns (request, schema, sample) into a [`TransformPlan`]
#[derive(Debug, Clone)]
pub struct PlanGenerator {
    max_tokens: u32,
    enforce_sql_shape: bool,
}

impl Default for PlanGenerator {
    fn default() -> Self {
        Self::new(4096, true)
    }
}

impl PlanGenerator {
    pub fn new(max_tokens: u32, enforce_sql_shape: bool) -> Self {
        Self {
            max_tokens,
            enforce_sql_shape,
        }
    }

    pub fn generate_plan<A: LlmAdapter + ?Sized>(
        &self,
        adapter: &A,
        request: &str,
        schema: &TableSchema,
        sample: &QueryResult,
        target: Layer,
        catalog: &str,
    ) -> Result<TransformPlan, PlanError> {
        let prompt = transform_prompt(&TransformPromptInput {
            request,
            schema,
            sample,
            target_schema: target.as_str(),
            catalog,
        });

        tracing::info!(
            source = %schema.full_name(),
            target = %target,
            provider = adapter.provider_name(),
            "generating transform plan"
        );
        let raw = adapter.generate(&prompt, self.max_tokens)?;
        let plan = parse_plan_response(&raw)?;

        if self.enforce_sql_shape {
            check_sql_shape(&plan, catalog, target)?;
        }

        tracing::debug!(target_table = %plan.target_table, sql = %plan.sql, "plan parsed");
        Ok(plan)
    }
}
