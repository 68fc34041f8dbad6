//! Session errors
//!
//! None of these escape [`Session::handle`](crate::session::Session::handle);
//! they are rendered into the reply and the session falls back to idle.

use crate::llm::{AdapterError, PlanError};
use crate::warehouse::WarehouseError;

/// Which backend failed
#[derive(Debug, thiserror::Error)]
pub enum BackendFailure {
    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Llm(#[from] AdapterError),
}

/// What the user wanted to do with a table nobody named
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAction {
    ListColumns,
    Preview,
    Transform,
}

impl TableAction {
    pub fn verb(&self) -> &'static str {
        match self {
            TableAction::ListColumns => "see the columns of",
            TableAction::Preview => "preview",
            TableAction::Transform => "transform",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No table could be determined; answered with a clarifying question
    #[error("Could not determine which table to {}", .0.verb())]
    ResolutionAmbiguous(TableAction),

    /// Fetch, execution or LLM call failed
    #[error("{0}")]
    BackendUnavailable(#[from] BackendFailure),

    /// LLM reply could not be turned into a usable plan
    #[error("{0}")]
    PlanGeneration(PlanError),

    /// Reference does not resolve to a known table
    #[error("{0}")]
    InvalidReference(String),

    #[error("No pending transform")]
    NoPendingTransform,
}

impl From<WarehouseError> for SessionError {
    fn from(err: WarehouseError) -> Self {
        SessionError::BackendUnavailable(BackendFailure::Warehouse(err))
    }
}

impl From<AdapterError> for SessionError {
    fn from(err: AdapterError) -> Self {
        SessionError::BackendUnavailable(BackendFailure::Llm(err))
    }
}

impl From<PlanError> for SessionError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::Backend(e) => e.into(),
            other => SessionError::PlanGeneration(other),
        }
    }
}
