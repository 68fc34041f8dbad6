//! Conversation state machine
//!
//! ```text
//!            transform request
//!   Idle ───────────────────────────▶ AwaitingConfirmation
//!    ▲  ◀── cancel ──────────────────────┘   │        ▲
//!    │                                       │ confirm│ show sql / other
//!    └──────────── Executing ◀───────────────┘        └──────┘
//! ```
//!
//! One [`Session`] per conversation; it owns its warehouse handle and LLM
//! adapter and is driven one turn at a time through [`Session::handle`].

use std::fmt;

use chrono::{DateTime, Utc};

use crate::llm::{choose_target_layer, LlmAdapter, PlanGenerator, TransformPlan};
use crate::session::commands::{parse_command, parse_confirmation, Command, ConfirmationReply};
use crate::session::errors::{SessionError, TableAction};
use crate::session::intent::{question_topic, Intent, IntentClassifier, PatternSet, QuestionTopic};
use crate::session::render::{self, StatusView, TableListingEntry};
use crate::session::resolver::{mentions_anaphora, TableRef, TableResolver};
use crate::warehouse::{
    list_layer_tables, qualified_name, Layer, TableSchema, Warehouse, WarehouseError,
};

/// Where the conversation is
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingConfirmation,
    /// Only observable from inside a turn
    Executing,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Idle => f.write_str("idle"),
            SessionState::AwaitingConfirmation => f.write_str("awaiting_confirmation"),
            SessionState::Executing => f.write_str("executing"),
        }
    }
}

/// A plan waiting for the user's go-ahead
#[derive(Debug, Clone)]
pub struct PendingTransform {
    pub plan: TransformPlan,
    pub source: TableRef,
    pub source_schema: TableSchema,
    pub request: String,
}

/// Outcome of the last executed transform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformResult {
    pub success: bool,
    pub target_table: String,
    pub rows_created: u64,
    pub message: String,
    pub sql_executed: String,
}

/// What kind of answer a reply is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Help,
    TableList,
    TableInfo,
    Answer,
    Clarification,
    PlanProposed,
    SqlShown,
    ConfirmationPrompt,
    Executed,
    Cancelled,
    Error,
}

/// Tagged reply; [`Session::handle`] returns only the text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub text: String,
}

impl Reply {
    fn new(kind: ReplyKind, text: String) -> Self {
        Self { kind, text }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// One exchange of the transcript
#[derive(Debug, Clone)]
pub struct Turn {
    pub at: DateTime<Utc>,
    pub message: String,
    pub reply: Reply,
}

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Rows sent to the LLM and shown in previews
    pub sample_rows: usize,
    /// Rows shown by `describe`
    pub describe_sample_rows: usize,
    pub max_tokens: u32,
    pub enforce_sql_shape: bool,
    pub patterns: PatternSet,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sample_rows: 5,
            describe_sample_rows: 3,
            max_tokens: 4096,
            enforce_sql_shape: true,
            patterns: PatternSet::builtin(),
        }
    }
}

/// Conversational transform session
pub struct Session<W: Warehouse, A: LlmAdapter> {
    warehouse: W,
    adapter: A,
    classifier: IntentClassifier,
    resolver: TableResolver,
    generator: PlanGenerator,
    sample_rows: usize,
    describe_sample_rows: usize,
    state: SessionState,
    pending: Option<PendingTransform>,
    last_result: Option<TransformResult>,
    last_mentioned: Option<TableRef>,
    history: Vec<Turn>,
}

impl<W: Warehouse, A: LlmAdapter> Session<W, A> {
    pub fn new(warehouse: W, adapter: A, options: SessionOptions) -> Self {
        Self {
            warehouse,
            adapter,
            classifier: IntentClassifier::new(options.patterns),
            resolver: TableResolver::new(),
            generator: PlanGenerator::new(options.max_tokens, options.enforce_sql_shape),
            sample_rows: options.sample_rows.max(1),
            describe_sample_rows: options.describe_sample_rows,
            state: SessionState::Idle,
            pending: None,
            last_result: None,
            last_mentioned: None,
            history: Vec::new(),
        }
    }

    /// Handle one user message and return the reply text
    pub fn handle(&mut self, message: &str) -> String {
        self.handle_turn(message).text
    }

    /// Handle one user message and return the tagged reply
    pub fn handle_turn(&mut self, message: &str) -> Reply {
        tracing::debug!(state = %self.state, message, "turn received");

        let reply = match self.state {
            SessionState::AwaitingConfirmation => self.handle_confirmation(message),
            SessionState::Idle | SessionState::Executing => self.handle_idle(message),
        };

        self.history.push(Turn {
            at: Utc::now(),
            message: message.to_string(),
            reply: reply.clone(),
        });
        reply
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn pending(&self) -> Option<&PendingTransform> {
        self.pending.as_ref()
    }

    pub fn last_result(&self) -> Option<&TransformResult> {
        self.last_result.as_ref()
    }

    pub fn last_mentioned(&self) -> Option<&TableRef> {
        self.last_mentioned.as_ref()
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn warehouse(&self) -> &W {
        &self.warehouse
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Back to a fresh conversation over the same backends
    pub fn reset(&mut self) {
        self.transition(SessionState::Idle);
        self.pending = None;
        self.last_result = None;
        self.last_mentioned = None;
        self.history.clear();
    }

    /// End the session and hand back the warehouse handle
    pub fn close(self) -> W {
        tracing::info!(turns = self.history.len(), "session closed");
        self.warehouse
    }

    fn transition(&mut self, next: SessionState) {
        if self.state != next {
            tracing::info!(from = %self.state, to = %next, "session state change");
            self.state = next;
        }
    }

    fn handle_idle(&mut self, message: &str) -> Reply {
        if let Some(command) = parse_command(message) {
            return self.run_command(command);
        }

        if parse_confirmation(message) != ConfirmationReply::Other {
            return error_reply(&SessionError::NoPendingTransform);
        }

        let intent = self.classifier.classify(message, || {
            self.resolver.resolve(&self.warehouse, message).is_some()
        });
        tracing::debug!(?intent, "message classified");

        match intent {
            Intent::Question => self.answer_question(message),
            Intent::Transform => self.propose_transform(message),
            Intent::Command => Reply::new(ReplyKind::Help, render::help()),
            Intent::Unclear => self.handle_unclear(message),
        }
    }

    fn handle_confirmation(&mut self, message: &str) -> Reply {
        let Some(pending) = self.pending.as_ref() else {
            self.transition(SessionState::Idle);
            return error_reply(&SessionError::NoPendingTransform);
        };

        match parse_confirmation(message) {
            ConfirmationReply::Confirm => self.execute_pending(),
            ConfirmationReply::Cancel => {
                tracing::info!(target_table = %pending.plan.target_table, "transform cancelled");
                self.pending = None;
                self.transition(SessionState::Idle);
                Reply::new(ReplyKind::Cancelled, render::cancelled())
            }
            ConfirmationReply::ShowSql => {
                Reply::new(ReplyKind::SqlShown, render::pending_sql(&pending.plan))
            }
            ConfirmationReply::Other => {
                Reply::new(ReplyKind::ConfirmationPrompt, render::confirmation_prompt())
            }
        }
    }

    fn run_command(&mut self, command: Command) -> Reply {
        match command {
            Command::Help => Reply::new(ReplyKind::Help, render::help()),
            Command::ShowTables => self.show_tables(),
            Command::Status => Reply::new(ReplyKind::Answer, self.status_text()),
            Command::Describe(reference) => match self.describe(&reference) {
                Ok(text) => Reply::new(ReplyKind::TableInfo, text),
                Err(e) => error_reply(&e),
            },
        }
    }

    fn show_tables(&self) -> Reply {
        let catalog = self.warehouse.catalog();
        let entries: Vec<TableListingEntry> = list_layer_tables(&self.warehouse)
            .into_iter()
            .map(|listing| {
                let tables = listing
                    .tables
                    .iter()
                    .map(|table| {
                        let name = qualified_name(catalog, &listing.schema, table);
                        let rows = match self.warehouse.count_rows(&name) {
                            Ok(rows) => Some(rows),
                            Err(e) => {
                                tracing::warn!(table = %name, error = %e, "row count failed");
                                None
                            }
                        };
                        (table.clone(), rows)
                    })
                    .collect();
                TableListingEntry {
                    schema: listing.schema,
                    tables,
                }
            })
            .collect();

        Reply::new(ReplyKind::TableList, render::table_list(&entries))
    }

    fn status_text(&self) -> String {
        render::status(&StatusView {
            state: self.state,
            endpoint: &self.warehouse.endpoint(),
            catalog: self.warehouse.catalog(),
            provider: self.adapter.provider_name(),
            pending: self
                .pending
                .as_ref()
                .map(|p| (&p.source, p.plan.target_table.as_str())),
            last_result: self.last_result.as_ref(),
            last_mentioned: self.last_mentioned.as_ref(),
        })
    }

    fn describe(&mut self, reference: &str) -> Result<String, SessionError> {
        let table = self.locate(reference)?;
        let schema = self.warehouse.get_table_schema(&table.table, &table.schema)?;
        let sample =
            self.warehouse
                .get_sample_rows(&table.table, &table.schema, self.describe_sample_rows)?;
        self.last_mentioned = Some(table);
        Ok(render::describe(&schema, &sample))
    }

    /// Turn a `describe` argument into an existing table
    fn locate(&self, reference: &str) -> Result<TableRef, SessionError> {
        let cleaned = reference.replace('`', "");
        let parts: Vec<&str> = cleaned.split('.').collect();

        match parts.as_slice() {
            [table] => {
                for layer in Layer::ALL {
                    match self.warehouse.table_exists(table, layer.as_str()) {
                        Ok(true) => return Ok(TableRef::new(layer.as_str(), *table)),
                        Ok(false) => {}
                        Err(e) => {
                            tracing::debug!(schema = layer.as_str(), error = %e, "probe skipped");
                        }
                    }
                }
                Err(SessionError::InvalidReference(format!(
                    "Table `{}` not found in bronze, silver, or gold schemas",
                    table
                )))
            }
            [schema, table] | [_, schema, table] => {
                match self.warehouse.table_exists(table, schema) {
                    Ok(true) => Ok(TableRef::new(*schema, *table)),
                    Ok(false)
                    | Err(WarehouseError::SchemaNotFound(_))
                    | Err(WarehouseError::InvalidIdentifier(_)) => Err(
                        SessionError::InvalidReference(format!("Table `{}.{}` not found", schema, table)),
                    ),
                    Err(e) => Err(e.into()),
                }
            }
            _ => Err(SessionError::InvalidReference(format!(
                "`{}` is not a table reference; use `table` or `schema.table`",
                reference
            ))),
        }
    }

    /// Named table, else the last one mentioned when the message points back
    fn resolve_table(&self, message: &str) -> Option<TableRef> {
        self.resolver
            .resolve(&self.warehouse, message)
            .or_else(|| {
                if mentions_anaphora(message) {
                    self.last_mentioned.clone()
                } else {
                    None
                }
            })
    }

    fn answer_question(&mut self, message: &str) -> Reply {
        let topic = question_topic(message);
        let table = self.resolve_table(message);
        if let Some(table) = &table {
            self.last_mentioned = Some(table.clone());
        }

        let answer = match (topic, table) {
            (QuestionTopic::Columns, Some(table)) => self
                .warehouse
                .get_table_schema(&table.table, &table.schema)
                .map(|schema| Reply::new(ReplyKind::TableInfo, render::columns(&table, &schema)))
                .map_err(SessionError::from),
            (QuestionTopic::Columns, None) => {
                Err(SessionError::ResolutionAmbiguous(TableAction::ListColumns))
            }
            (QuestionTopic::Preview, Some(table)) => self.preview(&table),
            (QuestionTopic::Preview, None) => {
                Err(SessionError::ResolutionAmbiguous(TableAction::Preview))
            }
            (QuestionTopic::TableListing, _) => Ok(self.show_tables()),
            (_, Some(table)) => self
                .describe(&table.qualified())
                .map(|text| Reply::new(ReplyKind::TableInfo, text)),
            (QuestionTopic::Capabilities, None) => Ok(Reply::new(ReplyKind::Help, render::help())),
            (QuestionTopic::Other, None) => {
                Ok(Reply::new(ReplyKind::Answer, render::generic_answer()))
            }
        };

        answer.unwrap_or_else(|e| self.failure_reply(&e))
    }

    fn preview(&self, table: &TableRef) -> Result<Reply, SessionError> {
        let schema = self.warehouse.get_table_schema(&table.table, &table.schema)?;
        let sample = self
            .warehouse
            .get_sample_rows(&table.table, &table.schema, self.sample_rows)?;
        Ok(Reply::new(
            ReplyKind::TableInfo,
            render::preview(table, &schema, &sample),
        ))
    }

    /// Unresolved tables become a clarifying question, everything else an error
    fn failure_reply(&self, err: &SessionError) -> Reply {
        match err {
            SessionError::ResolutionAmbiguous(action) => {
                let listings = list_layer_tables(&self.warehouse);
                Reply::new(
                    ReplyKind::Clarification,
                    render::clarification(*action, &listings),
                )
            }
            other => error_reply(other),
        }
    }

    fn handle_unclear(&mut self, message: &str) -> Reply {
        match self.resolver.resolve(&self.warehouse, message) {
            Some(table) => {
                let text = render::table_options(&table);
                self.last_mentioned = Some(table);
                Reply::new(ReplyKind::Clarification, text)
            }
            None => Reply::new(ReplyKind::Answer, render::generic_answer()),
        }
    }

    fn propose_transform(&mut self, message: &str) -> Reply {
        let Some(source) = self.resolve_table(message) else {
            return self.failure_reply(&SessionError::ResolutionAmbiguous(TableAction::Transform));
        };
        self.last_mentioned = Some(source.clone());

        match self.build_plan(message, source) {
            Ok(pending) => {
                let text = render::plan(&pending.plan, &pending.source_schema);
                tracing::info!(
                    source = %pending.source,
                    target_table = %pending.plan.target_table,
                    "transform plan awaiting confirmation"
                );
                self.pending = Some(pending);
                self.transition(SessionState::AwaitingConfirmation);
                Reply::new(ReplyKind::PlanProposed, text)
            }
            Err(e) => {
                tracing::warn!(error = %e, "transform plan not produced");
                error_reply(&e)
            }
        }
    }

    fn build_plan(&self, request: &str, source: TableRef) -> Result<PendingTransform, SessionError> {
        let source_schema = self
            .warehouse
            .get_table_schema(&source.table, &source.schema)?;
        let sample = self
            .warehouse
            .get_sample_rows(&source.table, &source.schema, self.sample_rows)?;
        let target = choose_target_layer(request, &source.schema);

        let plan = self.generator.generate_plan(
            &self.adapter,
            request,
            &source_schema,
            &sample,
            target,
            self.warehouse.catalog(),
        )?;

        Ok(PendingTransform {
            plan,
            source,
            source_schema,
            request: request.to_string(),
        })
    }

    fn execute_pending(&mut self) -> Reply {
        let Some(pending) = self.pending.take() else {
            self.transition(SessionState::Idle);
            return error_reply(&SessionError::NoPendingTransform);
        };

        self.transition(SessionState::Executing);
        let target = pending.plan.target_table;
        let sql = pending.plan.sql;

        tracing::info!(target_table = %target, "executing transform");
        tracing::debug!(sql = %sql, "transform sql");
        let outcome = self
            .warehouse
            .execute_command(&sql)
            .and_then(|()| self.warehouse.count_rows(&target));
        self.transition(SessionState::Idle);

        match outcome {
            Ok(rows) => {
                tracing::info!(target_table = %target, rows, "transform executed");
                let text = render::executed(&target, rows);
                if let Some(created) = TableRef::from_qualified(&target) {
                    self.last_mentioned = Some(created);
                }
                self.last_result = Some(TransformResult {
                    success: true,
                    message: format!("Created {} with {} rows", target, rows),
                    target_table: target,
                    rows_created: rows,
                    sql_executed: sql,
                });
                Reply::new(ReplyKind::Executed, text)
            }
            Err(e) => {
                tracing::warn!(target_table = %target, error = %e, "transform execution failed");
                let message = e.to_string();
                let text = render::execution_failed(&message);
                self.last_result = Some(TransformResult {
                    success: false,
                    target_table: target,
                    rows_created: 0,
                    message,
                    sql_executed: sql,
                });
                Reply::new(ReplyKind::Error, text)
            }
        }
    }
}

fn error_reply(err: &SessionError) -> Reply {
    Reply::new(ReplyKind::Error, render::error(err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::StubAdapter;
    use crate::warehouse::{seed_sample_data, SqliteWarehouse};

    const PLAN: &str = r#"{
        "target_table": "local.silver.customers_clean",
        "sql": "CREATE OR REPLACE TABLE local.silver.customers_clean AS SELECT DISTINCT * FROM local.bronze.raw_customers WHERE contact_id IS NOT NULL",
        "transformations_applied": ["Remove rows with null contact_id", "Remove duplicates"],
        "explanation": "Drops incomplete rows and duplicates",
        "estimated_impact": {"rows_before": 15, "estimated_rows_after": 12}
    }"#;

    fn session(adapter: StubAdapter) -> Session<SqliteWarehouse, StubAdapter> {
        let warehouse = SqliteWarehouse::open_in_memory("local").unwrap();
        seed_sample_data(&warehouse).unwrap();
        Session::new(warehouse, adapter, SessionOptions::default())
    }

    #[test]
    fn test_default_state() {
        let session = session(StubAdapter::new());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.pending().is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_unrelated_input_keeps_pending() {
        let mut session = session(StubAdapter::with_response(PLAN));
        session.handle("Clean raw_customers, remove nulls, dedupe by contact_id");
        assert_eq!(session.state(), SessionState::AwaitingConfirmation);

        let reply = session.handle_turn("what about the weather?");
        assert_eq!(reply.kind, ReplyKind::ConfirmationPrompt);
        assert_eq!(session.state(), SessionState::AwaitingConfirmation);
        assert!(session.pending().is_some());
    }

    #[test]
    fn test_history_and_reset() {
        let mut session = session(StubAdapter::with_response(PLAN));
        session.handle("help");
        session.handle("Clean raw_customers, remove nulls");
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].reply.kind, ReplyKind::Help);

        session.reset();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.pending().is_none());
        assert!(session.last_mentioned().is_none());
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_describe_bare_name_probes_layers() {
        let mut session = session(StubAdapter::new());
        let reply = session.handle_turn("describe raw_customers");
        assert_eq!(reply.kind, ReplyKind::TableInfo);
        assert!(reply.text.contains("local.bronze.raw_customers"));
        assert!(reply.text.contains("Sample Data (3 rows)"));
        assert_eq!(
            session.last_mentioned(),
            Some(&TableRef::new("bronze", "raw_customers"))
        );

        let reply = session.handle_turn("describe nothing_here");
        assert_eq!(reply.kind, ReplyKind::Error);
        assert!(reply.text.contains("not found in bronze, silver, or gold"));
    }

    #[test]
    fn test_close_returns_warehouse() {
        let session = session(StubAdapter::new());
        let warehouse = session.close();
        assert_eq!(warehouse.catalog(), "local");
    }
}
