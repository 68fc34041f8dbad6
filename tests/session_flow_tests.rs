//! Session flow integration tests
//!
//! Drives a real session over an in-memory SQLite warehouse seeded with the
//! dirty `bronze.raw_customers` sample and a scripted LLM.

use medallion::llm::StubAdapter;
use medallion::session::{ReplyKind, Session, SessionOptions, SessionState, TableRef};
use medallion::warehouse::{seed_sample_data, SqliteWarehouse, Warehouse};

const CLEAN_REQUEST: &str = "Clean raw_customers, remove nulls, dedupe by contact_id";

const CLEAN_PLAN: &str = r#"Here is the plan:
```json
{
    "target_table": "local.silver.customers_clean",
    "sql": "CREATE OR REPLACE TABLE local.silver.customers_clean AS SELECT DISTINCT * FROM local.bronze.raw_customers WHERE contact_id IS NOT NULL",
    "transformations_applied": ["Remove rows with NULL contact_id", "Remove exact duplicates"],
    "explanation": "Keeps one copy of each complete customer row",
    "estimated_impact": {"rows_before": 15, "estimated_rows_after": 12, "columns_modified": []}
}
```"#;

fn seeded_session(adapter: StubAdapter) -> Session<SqliteWarehouse, StubAdapter> {
    let warehouse = SqliteWarehouse::open_in_memory("local").unwrap();
    seed_sample_data(&warehouse).unwrap();
    Session::new(warehouse, adapter, SessionOptions::default())
}

fn plan_with(target: &str, sql: &str) -> String {
    serde_json::json!({ "target_table": target, "sql": sql }).to_string()
}

// =============================================================================
// Literal commands
// =============================================================================

#[test]
fn test_show_tables_lists_only_populated_schemas() {
    let mut session = seeded_session(StubAdapter::new());
    let reply = session.handle_turn("show tables");

    assert_eq!(reply.kind, ReplyKind::TableList);
    assert!(reply.text.contains("`bronze.raw_customers` (15 rows)"));
    assert!(!reply.text.contains("SILVER"));
    assert!(!reply.text.contains("GOLD"));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_status_reports_backends() {
    let mut session = seeded_session(StubAdapter::new());
    let text = session.handle("status");

    assert!(text.contains("**State:** idle"));
    assert!(text.contains("sqlite::memory:"));
    assert!(text.contains("**Catalog:** local"));
    assert!(text.contains("**LLM:** stub"));
}

#[test]
fn test_describe_dotted_reference() {
    let mut session = seeded_session(StubAdapter::new());

    let reply = session.handle_turn("describe bronze.raw_customers");
    assert_eq!(reply.kind, ReplyKind::TableInfo);
    assert!(reply.text.contains("**Rows:** 15"));
    assert!(reply.text.contains("`contact_id`"));

    let reply = session.handle_turn("describe silver.raw_customers");
    assert_eq!(reply.kind, ReplyKind::Error);
    assert!(reply.text.contains("`silver.raw_customers` not found"));

    let reply = session.handle_turn("describe staging.raw_customers");
    assert_eq!(reply.kind, ReplyKind::Error);
    assert_eq!(session.state(), SessionState::Idle);
}

// =============================================================================
// Transform lifecycle
// =============================================================================

#[test]
fn test_transform_request_awaits_confirmation() {
    let adapter = StubAdapter::with_response(CLEAN_PLAN);
    let mut session = seeded_session(adapter);

    let reply = session.handle_turn(CLEAN_REQUEST);

    assert_eq!(reply.kind, ReplyKind::PlanProposed);
    assert!(reply.text.contains("**Target:** `local.silver.customers_clean`"));
    assert!(reply.text.contains("Remove exact duplicates"));
    assert!(reply.text.contains("~12 rows"));
    assert_eq!(session.state(), SessionState::AwaitingConfirmation);
    assert_eq!(
        session.last_mentioned(),
        Some(&TableRef::new("bronze", "raw_customers"))
    );

    let pending = session.pending().expect("pending transform");
    assert_eq!(pending.source, TableRef::new("bronze", "raw_customers"));
    assert_eq!(pending.plan.target_table, "local.silver.customers_clean");
    assert_eq!(pending.request, CLEAN_REQUEST);

    let prompts = session.adapter().prompts();
    assert_eq!(prompts.len(), 1);
    assert!(prompts[0].contains("local.bronze.raw_customers"));
    assert!(prompts[0].contains("`silver` schema"));
    assert!(prompts[0].contains(CLEAN_REQUEST));
}

#[test]
fn test_cancel_then_confirm_executes_nothing() {
    let mut session = seeded_session(StubAdapter::with_response(CLEAN_PLAN));
    session.handle(CLEAN_REQUEST);

    let reply = session.handle_turn("cancel");
    assert_eq!(reply.kind, ReplyKind::Cancelled);
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.pending().is_none());

    let reply = session.handle_turn("confirm");
    assert_eq!(reply.kind, ReplyKind::Error);
    assert!(reply.text.contains("No pending transform"));
    assert!(session.last_result().is_none());
    assert!(session.warehouse().list_tables("silver").unwrap().is_empty());
}

#[test]
fn test_show_sql_is_idempotent() {
    let mut session = seeded_session(StubAdapter::with_response(CLEAN_PLAN));
    session.handle(CLEAN_REQUEST);

    for word in ["show sql", "SQL", "show sql"] {
        let reply = session.handle_turn(word);
        assert_eq!(reply.kind, ReplyKind::SqlShown);
        assert!(reply.text.contains("SELECT DISTINCT *"));
        assert_eq!(session.state(), SessionState::AwaitingConfirmation);
        assert!(session.pending().is_some());
    }
}

#[test]
fn test_unrelated_message_keeps_plan() {
    let mut session = seeded_session(StubAdapter::with_response(CLEAN_PLAN));
    session.handle(CLEAN_REQUEST);

    for message in ["show tables", "help", "what is this?"] {
        let reply = session.handle_turn(message);
        assert_eq!(reply.kind, ReplyKind::ConfirmationPrompt, "{}", message);
    }
    assert!(session.pending().is_some());
    assert_eq!(session.adapter().call_count(), 1);
}

#[test]
fn test_confirm_executes_once() {
    let mut session = seeded_session(StubAdapter::with_response(CLEAN_PLAN));
    session.handle(CLEAN_REQUEST);

    let reply = session.handle_turn("YES");
    assert_eq!(reply.kind, ReplyKind::Executed);
    assert!(reply.text.contains("**Rows:** 12"));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.pending().is_none());

    let result = session.last_result().expect("last result");
    assert!(result.success);
    assert_eq!(result.rows_created, 12);
    assert_eq!(result.target_table, "local.silver.customers_clean");

    assert_eq!(
        session.warehouse().list_tables("silver").unwrap(),
        vec!["customers_clean".to_string()]
    );
    assert_eq!(
        session.last_mentioned(),
        Some(&TableRef::new("silver", "customers_clean"))
    );

    // A second confirm has nothing to run
    let reply = session.handle_turn("confirm");
    assert_eq!(reply.kind, ReplyKind::Error);
    assert_eq!(session.adapter().call_count(), 1);
}

#[test]
fn test_execution_failure_returns_to_idle() {
    let plan = plan_with(
        "local.silver.broken",
        "CREATE OR REPLACE TABLE local.silver.broken AS SELECT * FROM local.bronze.missing_table",
    );
    let mut session = seeded_session(StubAdapter::with_response(plan));
    session.handle(CLEAN_REQUEST);
    assert_eq!(session.state(), SessionState::AwaitingConfirmation);

    let reply = session.handle_turn("run");
    assert_eq!(reply.kind, ReplyKind::Error);
    assert!(reply.text.contains("Execution failed"));
    assert!(reply.text.contains("missing_table"));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.pending().is_none());

    let result = session.last_result().expect("failed result recorded");
    assert!(!result.success);
    assert_eq!(result.rows_created, 0);
    assert_eq!(
        session.last_mentioned(),
        Some(&TableRef::new("bronze", "raw_customers"))
    );
}

#[test]
fn test_failed_replace_keeps_existing_target() {
    let failing = plan_with(
        "local.silver.customers_clean",
        "CREATE OR REPLACE TABLE local.silver.customers_clean AS SELECT * FROM local.bronze.missing_table",
    );
    let mut session = seeded_session(StubAdapter::with_responses([CLEAN_PLAN.to_string(), failing]));

    session.handle(CLEAN_REQUEST);
    assert_eq!(session.handle_turn("confirm").kind, ReplyKind::Executed);
    assert_eq!(
        session.warehouse().list_tables("silver").unwrap(),
        vec!["customers_clean"]
    );

    session.handle("Clean raw_customers again and replace customers_clean");
    assert_eq!(session.state(), SessionState::AwaitingConfirmation);
    let reply = session.handle_turn("confirm");
    assert!(reply.text.contains("Execution failed"));
    assert_eq!(session.state(), SessionState::Idle);

    let warehouse = session.warehouse();
    assert_eq!(warehouse.list_tables("silver").unwrap(), vec!["customers_clean"]);
    assert_eq!(warehouse.count_rows("local.silver.customers_clean").unwrap(), 12);
}

#[test]
fn test_malformed_plan_is_reported() {
    let mut session = seeded_session(StubAdapter::with_response("Sorry, I can't do that."));
    let reply = session.handle_turn(CLEAN_REQUEST);

    assert_eq!(reply.kind, ReplyKind::Error);
    assert!(reply.text.contains("Could not build a transform plan"));
    assert!(reply.text.contains("Sorry, I can't do that."));
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.pending().is_none());
}

#[test]
fn test_plan_outside_target_layer_is_rejected() {
    let plan = plan_with(
        "local.gold.customers_clean",
        "CREATE OR REPLACE TABLE local.gold.customers_clean AS SELECT * FROM local.bronze.raw_customers",
    );
    let mut session = seeded_session(StubAdapter::with_response(plan));
    let reply = session.handle_turn(CLEAN_REQUEST);

    assert_eq!(reply.kind, ReplyKind::Error);
    assert!(reply.text.contains("not the silver layer"));
    assert!(session.pending().is_none());
}

#[test]
fn test_llm_outage_is_backend_error() {
    let adapter = StubAdapter::with_responses(Vec::<String>::new());
    adapter.push_error("connection reset");
    let mut session = seeded_session(adapter);

    let reply = session.handle_turn(CLEAN_REQUEST);
    assert_eq!(reply.kind, ReplyKind::Error);
    assert!(reply.text.contains("Error processing request"));
    assert!(reply.text.contains("connection reset"));
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_gold_request_targets_gold() {
    let plan = plan_with(
        "local.gold.customer_summary",
        "CREATE OR REPLACE TABLE local.gold.customer_summary AS SELECT COUNT(*) AS customers FROM local.bronze.raw_customers",
    );
    let mut session = seeded_session(StubAdapter::with_response(plan));

    session.handle("Aggregate raw_customers into a summary, save to gold");
    assert_eq!(session.state(), SessionState::AwaitingConfirmation);
    assert!(session.adapter().prompts()[0].contains("`gold` schema"));

    let reply = session.handle_turn("y");
    assert_eq!(reply.kind, ReplyKind::Executed);
    assert_eq!(
        session.warehouse().list_tables("gold").unwrap(),
        vec!["customer_summary".to_string()]
    );
}

// =============================================================================
// Resolution and questions
// =============================================================================

#[test]
fn test_anaphora_uses_last_mentioned_table() {
    let mut session = seeded_session(StubAdapter::with_response(CLEAN_PLAN));
    session.handle("describe raw_customers");

    let reply = session.handle_turn("clean it and remove nulls");
    assert_eq!(reply.kind, ReplyKind::PlanProposed);
    assert_eq!(
        session.pending().map(|p| p.source.clone()),
        Some(TableRef::new("bronze", "raw_customers"))
    );
}

#[test]
fn test_unresolved_transform_asks_for_table() {
    let mut session = seeded_session(StubAdapter::with_response(CLEAN_PLAN));
    let reply = session.handle_turn("clean the orders data");

    assert_eq!(reply.kind, ReplyKind::Clarification);
    assert!(reply.text.contains("`bronze.raw_customers`"));
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(session.adapter().call_count(), 0);
}

#[test]
fn test_question_routing() {
    let mut session = seeded_session(StubAdapter::new());

    let reply = session.handle_turn("What columns are in raw_customers?");
    assert_eq!(reply.kind, ReplyKind::TableInfo);
    assert!(reply.text.contains("## Columns in `bronze.raw_customers`"));
    assert!(reply.text.contains("**email**"));

    let reply = session.handle_turn("How many rows are in raw_customers?");
    assert_eq!(reply.kind, ReplyKind::TableInfo);
    assert!(reply.text.contains("**Total Rows:** 15"));
    assert!(reply.text.contains("Sample Data (5 rows)"));

    let reply = session.handle_turn("Show me a preview of the data");
    assert_eq!(reply.kind, ReplyKind::Clarification);
    assert!(reply.text.starts_with("Which table would you like to preview?"));

    let reply = session.handle_turn("What tables are available?");
    assert_eq!(reply.kind, ReplyKind::TableList);

    let reply = session.handle_turn("What can you do?");
    assert_eq!(reply.kind, ReplyKind::Help);

    assert_eq!(session.adapter().call_count(), 0);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_unclear_message_naming_a_table() {
    let mut session = seeded_session(StubAdapter::new());
    let reply = session.handle_turn("raw_customers");

    assert_eq!(reply.kind, ReplyKind::Clarification);
    assert!(reply.text.contains("I found table `bronze.raw_customers`"));
    assert_eq!(
        session.last_mentioned(),
        Some(&TableRef::new("bronze", "raw_customers"))
    );

    let reply = session.handle_turn("hello");
    assert_eq!(reply.kind, ReplyKind::Answer);
}

#[test]
fn test_history_records_every_turn() {
    let mut session = seeded_session(StubAdapter::with_response(CLEAN_PLAN));
    for message in ["help", CLEAN_REQUEST, "show sql", "cancel"] {
        session.handle(message);
    }

    let kinds: Vec<ReplyKind> = session.history().iter().map(|t| t.reply.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ReplyKind::Help,
            ReplyKind::PlanProposed,
            ReplyKind::SqlShown,
            ReplyKind::Cancelled
        ]
    );
    assert_eq!(session.history()[1].message, CLEAN_REQUEST);
    assert!(session.history()[0].at <= session.history()[3].at);
}
