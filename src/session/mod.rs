//! Conversation layer
//!
//! Two-tier dispatch: literal commands ([`commands`]) first, then the
//! pattern classifier ([`intent`]). The [`Session`] state machine owns the
//! pending transform and the confirm/cancel gate in front of execution.

pub mod commands;
pub mod errors;
pub mod intent;
pub mod render;
pub mod resolver;
pub mod session_state;

pub use commands::{parse_command, parse_confirmation, Command, ConfirmationReply};
pub use errors::{BackendFailure, SessionError, TableAction};
pub use intent::{question_topic, Intent, IntentClassifier, PatternSet, QuestionTopic};
pub use resolver::{mentions_anaphora, TableRef, TableResolver};
pub use session_state::{
    PendingTransform, Reply, ReplyKind, Session, SessionOptions, SessionState, TransformResult,
    Turn,
};
