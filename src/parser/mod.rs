//! Parser adapter contract and the per-library adapter registry.
//!
//! The engine is parametrized over a parsing capability, never over a
//! concrete parser: ingestion hands raw source to whichever adapter the
//! registry maps the library to. One reference adapter ships with the
//! crate ([`MarkdownParser`]); anything else is registered by the embedder.

use crate::record::DocRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

mod markdown;

pub use markdown::MarkdownParser;

/// A non-fatal problem encountered while parsing a fragment.
///
/// Warnings ride alongside the successfully parsed records; they never fail
/// the parse as a whole.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseWarning {
    pub message: String,
    /// Line in the raw source the offending fragment started at, when known.
    pub line: Option<usize>,
}

impl ParseWarning {
    pub fn new(message: impl Into<String>, line: Option<usize>) -> Self {
        Self {
            message: message.into(),
            line,
        }
    }
}

/// Everything a parse run produced: records plus fragment-level warnings.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    pub records: Vec<DocRecord>,
    pub warnings: Vec<ParseWarning>,
}

/// Capability a per-library parser must satisfy.
///
/// `parse` must be deterministic (byte-identical input yields the identical
/// record sequence) and total: malformed fragments surface as
/// [`ParseWarning`]s while the rest of the input still parses. Dropping a
/// fragment without a warning violates the contract.
pub trait ParserAdapter: Send + Sync {
    fn parse(&self, raw: &str) -> ParseOutcome;
}

/// Maps a library id to the adapter that parses its documentation dumps.
///
/// Tagged dispatch over a plain map; there is no inheritance hierarchy to
/// plug into. The registry is handed to the engine at construction and is
/// immutable afterwards.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    parsers: HashMap<String, Arc<dyn ParserAdapter>>,
}

impl ParserRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, library: impl Into<String>, parser: Arc<dyn ParserAdapter>) {
        self.parsers.insert(library.into(), parser);
    }

    pub fn get(&self, library: &str) -> Option<Arc<dyn ParserAdapter>> {
        self.parsers.get(library).cloned()
    }

    pub fn len(&self) -> usize {
        self.parsers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsers.is_empty()
    }
}

impl std::fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut libraries: Vec<&str> = self.parsers.keys().map(String::as_str).collect();
        libraries.sort_unstable();
        f.debug_struct("ParserRegistry")
            .field("libraries", &libraries)
            .finish()
    }
}
