//! Engine error kinds.
//!
//! Every mutating operation leaves no partial state behind on any of these
//! errors, and each carries enough context (entity kind, id, current status,
//! attempted operation) for a caller to render a precise message. Nothing is
//! retried inside the engine; retries are the caller's responsibility.

use serde::{Deserialize, Serialize};

/// The kind of entity an error or audit entry refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Request,
    Application,
    Transplant,
    Candidate,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            EntityKind::Request => "organ request",
            EntityKind::Application => "application",
            EntityKind::Transplant => "transplant",
            EntityKind::Candidate => "candidate",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Malformed or missing required input. The caller should fix the input
    /// and retry.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A referenced entity id does not exist. Not retryable without a
    /// different id.
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    /// The operation violates a state or uniqueness invariant (double-accept,
    /// double-breach-record, ...). The caller must refresh its view of the
    /// entity before deciding what to do next.
    #[error("cannot {operation} {entity} {id} while it is {status}")]
    Conflict {
        entity: EntityKind,
        id: String,
        status: String,
        operation: &'static str,
    },

    /// The requested transition is not reachable from the current state.
    #[error("{entity} {id} cannot move from {from} to {attempted}")]
    InvalidState {
        entity: EntityKind,
        id: String,
        from: String,
        attempted: String,
    },
}

impl From<tmc_types::TypeError> for EngineError {
    fn from(err: tmc_types::TypeError) -> Self {
        EngineError::Validation(err.to_string())
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
