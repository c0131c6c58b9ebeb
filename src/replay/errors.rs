//! Error types for script replay
//!
//! [`ReplayError`] covers everything that stops a replay: names used before
//! they are bound, host-side memory accesses out of bounds, rejected chain
//! declarations and a full snapshot history. Allocator exhaustion is *not*
//! one of them; the guest just gets address 0 back, as it would for real.

use crate::errors::{HeapError, HostError};
use crate::script::SourceLocation;
use crate::snapshot::SnapshotLimitExceeded;
use thiserror::Error;

/// Errors that stop a replay or a history operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplayError {
    /// The region could not be bound as a guest heap
    #[error("cannot bind heap: {source}")]
    Bind { source: HeapError },

    /// A name was used before any statement bound it
    #[error("undefined name '{name}' at line {}", .location.line)]
    UndefinedName {
        name: String,
        location: SourceLocation,
    },

    /// A host-side access or chain declaration was rejected
    #[error("{source} at line {}", .location.line)]
    Heap {
        source: HeapError,
        location: SourceLocation,
    },

    /// The foreign-function table refused the call
    #[error("{source} at line {}", .location.line)]
    Host {
        source: HostError,
        location: SourceLocation,
    },

    #[error(transparent)]
    SnapshotLimitExceeded(#[from] SnapshotLimitExceeded),

    /// Stepping past either end of the history, or running twice
    #[error("{message}")]
    History { message: String },
}

impl ReplayError {
    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            ReplayError::UndefinedName { location, .. } => Some(location),
            ReplayError::Heap { location, .. } => Some(location),
            ReplayError::Host { location, .. } => Some(location),
            ReplayError::Bind { .. } => None,
            ReplayError::SnapshotLimitExceeded(_) => None,
            ReplayError::History { .. } => None,
        }
    }

    pub(crate) fn history(message: &str) -> Self {
        ReplayError::History {
            message: message.to_string(),
        }
    }
}
