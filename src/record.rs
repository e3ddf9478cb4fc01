//! Normalized documentation records and the per-generation record store.

use crate::error::{EngineError, Result};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// What kind of documented entity a record describes.
///
/// The kind of an id is immutable within one corpus generation; a later
/// generation may redefine it (a library re-released with a different
/// structure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    Function,
    Class,
    Module,
    Guide,
    Example,
}

/// A runnable snippet attached to a record, with prose context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleSnippet {
    pub code: String,
    pub description: String,
}

/// Pointer back into the raw document a record was extracted from,
/// kept for re-ingestion diffing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Identifier of the originating raw document (as named by the
    /// ingestion collaborator).
    pub document: String,
    /// Line in the raw document the fragment started at, when known.
    pub line: Option<usize>,
}

/// One documented entity in normalized form.
///
/// `id` is library-qualified (e.g. `numpy.array`) and unique within a
/// library's record store. All fields survive serialization losslessly so
/// the protocol layer can forward records field-for-field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocRecord {
    pub id: String,
    pub kind: RecordKind,
    /// Alternative names the entity is reachable under in the exact-name
    /// index (e.g. `np.array` for `numpy.array`).
    #[serde(default)]
    pub aliases: Vec<String>,
    pub signature: Option<String>,
    pub summary: String,
    pub body: String,
    #[serde(default)]
    pub examples: Vec<ExampleSnippet>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub source_ref: Option<SourceRef>,
}

impl DocRecord {
    /// A minimal record with the given id and kind; remaining fields empty.
    pub fn new(id: impl Into<String>, kind: RecordKind) -> Self {
        Self {
            id: id.into(),
            kind,
            aliases: Vec::new(),
            signature: None,
            summary: String::new(),
            body: String::new(),
            examples: Vec::new(),
            tags: BTreeSet::new(),
            source_ref: None,
        }
    }
}

/// Insertion-ordered store of records for one build-in-progress generation.
///
/// Records are addressed by slot internally; the derived indexes reference
/// slots so every index entry is guaranteed to resolve within the same
/// generation.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: Vec<DocRecord>,
    by_id: AHashMap<String, usize>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record by id.
    ///
    /// Replacing is allowed as long as the kind stays the same; a kind
    /// change for an existing id is a schema conflict and fails the build.
    pub fn put(&mut self, record: DocRecord) -> Result<()> {
        match self.by_id.get(&record.id) {
            Some(&slot) => {
                let existing = &self.records[slot];
                if existing.kind != record.kind {
                    return Err(EngineError::Schema {
                        id: record.id,
                        existing: existing.kind,
                        incoming: record.kind,
                    });
                }
                self.records[slot] = record;
            }
            None => {
                self.by_id.insert(record.id.clone(), self.records.len());
                self.records.push(record);
            }
        }
        Ok(())
    }

    /// Look up a record by id.
    pub fn get(&self, id: &str) -> Result<&DocRecord> {
        self.slot(id)
            .map(|slot| &self.records[slot])
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// All records in insertion order. Restartable; used by the indexer
    /// during build, never by query-time code.
    pub fn all(&self) -> impl Iterator<Item = &DocRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn slot(&self, id: &str) -> Option<usize> {
        self.by_id.get(id).copied()
    }

    pub(crate) fn by_slot(&self, slot: usize) -> &DocRecord {
        &self.records[slot]
    }

    /// Slot-annotated iteration for index builds.
    pub(crate) fn slots(&self) -> impl Iterator<Item = (usize, &DocRecord)> {
        self.records.iter().enumerate()
    }
}
