//! Error types for the ticket client

use thiserror::Error;
use uuid::Uuid;

/// Failures of a single call to the ticket API
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),

    /// The backend answered with a non-success status
    #[error("server error (status {status}): {body}")]
    Server { status: u16, body: String },

    /// The backend has no ticket with this id
    #[error("ticket {id} not found")]
    NotFound { id: Uuid },

    /// The response body is not a valid ticket
    #[error("invalid response body: {0}")]
    Decode(String),

    /// The ticket could not be put on the wire
    #[error("cannot encode ticket: {0}")]
    Encode(String),
}

/// Rejected form input
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field}: unknown option '{value}'")]
    UnknownOption { field: &'static str, value: String },

    #[error("{field}: invalid value '{value}' ({reason})")]
    Invalid {
        field: &'static str,
        value: String,
        reason: &'static str,
    },

    #[error("{field}: expected a {expected} value")]
    WrongKind {
        field: &'static str,
        expected: &'static str,
    },

    #[error("unknown field '{0}'")]
    UnknownField(String),
}

/// Failures surfaced by the list reconciler
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Only one ticket may be edited at a time
    #[error("ticket {editing} is already being edited")]
    SessionBusy { editing: Uuid },

    #[error("no ticket is being edited")]
    NoSession,

    #[error("ticket {id} is not in the list")]
    UnknownTicket { id: Uuid },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}
