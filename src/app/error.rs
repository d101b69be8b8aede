//! Fehler der Session-Engine.

use crate::core::{EntityId, EntityKind, ValidationError};
use thiserror::Error;

/// Ergebnis einer Engine-Operation
pub type EditResult<T> = Result<T, EditError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    /// Entity existiert nicht (mehr) in ihrem Pool
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: EntityId },

    /// Das Domänenmodell hat die Mutation abgelehnt
    #[error(transparent)]
    Rejected(#[from] ValidationError),

    /// Operation ist für diese Entity-Art nicht registriert
    #[error("operation {operation} is not supported for {kind}")]
    ContractViolation {
        operation: &'static str,
        kind: EntityKind,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Mailbox voll, Operation wurde zurückgenommen
    #[error("{mailbox} is busy, operation was reverted")]
    Busy { mailbox: &'static str },

    /// Worker läuft nicht mehr
    #[error("{mailbox} is closed")]
    Closed { mailbox: &'static str },

    #[error("no network loaded")]
    NoNetwork,
}

impl EditError {
    #[must_use]
    pub fn not_found(kind: EntityKind, id: EntityId) -> Self {
        Self::NotFound { kind, id }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}
