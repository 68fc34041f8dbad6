//! LLM integration
//!
//! - `adapters`: provider boundary (`generate(prompt, max_tokens)`)
//! - `prompts`: template assembly
//! - `plan`: transform plan model, reply parsing, SQL shape check
//! - `generator`: target-layer policy and plan generation
//! - `schedule`: natural-language schedule → cron

pub mod adapters;
pub mod generator;
pub mod plan;
pub mod prompts;
pub mod schedule;

pub use adapters::{create_adapter, Adapter, AdapterError, LlmAdapter, StubAdapter};
pub use generator::{choose_target_layer, PlanGenerator};
pub use plan::{check_sql_shape, parse_plan_response, PlanError, TransformPlan};
pub use schedule::{parse_schedule, SchedulePlan};
