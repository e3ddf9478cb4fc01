//! Error taxonomy for the documentation engine.

use crate::record::RecordKind;
use thiserror::Error;

/// A specialized Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced through the engine's public API.
///
/// The enum is `Clone` because a failed build is fanned out to every caller
/// awaiting the same coalesced rebuild future.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EngineError {
    /// Malformed or over-limit request, rejected before any generation is read.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// No record exists under the requested identifier.
    #[error("no record with id '{0}'")]
    NotFound(String),

    /// A record tried to redefine the kind of an existing id within one build.
    #[error("record '{id}' is already a {existing:?} and cannot be redefined as a {incoming:?}")]
    Schema {
        id: String,
        existing: RecordKind,
        incoming: RecordKind,
    },

    /// A corpus build failed. Whatever generation was serving before is retained.
    #[error("build failed for library '{library}': {reason}")]
    Build { library: String, reason: String },
}

impl EngineError {
    pub(crate) fn invalid_query(reason: impl Into<String>) -> Self {
        Self::InvalidQuery(reason.into())
    }

    pub(crate) fn build(library: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Build {
            library: library.into(),
            reason: reason.into(),
        }
    }
}
