//! Immutable corpus generations and freshness reporting.

use crate::error::Result;
use crate::parser::{ParseWarning, ParserAdapter};
use crate::record::{DocRecord, RecordStore};
use crate::search::{ExactIndex, KeywordIndex};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant, SystemTime};
use xxhash_rust::xxh3::xxh3_64;

/// One atomically-swappable snapshot of a library's records and indexes.
///
/// Everything inside is built together from one parse and is immutable
/// afterwards, so a query holding an `Arc<Generation>` can never observe
/// index entries from a different generation than its records.
#[derive(Debug)]
pub struct Generation {
    store: RecordStore,
    exact: ExactIndex,
    keywords: KeywordIndex,
    number: u64,
    /// Monotonic build instant, used for TTL staleness checks.
    built_at: Instant,
    /// Wall-clock build time, reported through `status`.
    fetched_at: SystemTime,
    source_hash: u64,
}

impl Generation {
    /// Parse raw source and build a complete generation off to the side.
    ///
    /// All-or-nothing: any failure discards the partial build and leaves
    /// whatever generation is currently serving untouched. Parse warnings
    /// are returned alongside, never stored.
    pub(crate) fn build(
        library: &str,
        number: u64,
        raw_source: &str,
        parser: &dyn ParserAdapter,
    ) -> Result<(Self, Vec<ParseWarning>)> {
        let started = Instant::now();
        let outcome = parser.parse(raw_source);

        let mut store = RecordStore::new();
        for record in outcome.records {
            store.put(record)?;
        }
        let exact = ExactIndex::build(&store);
        let keywords = KeywordIndex::build(&store);

        tracing::info!(
            library,
            generation = number,
            records = store.len(),
            warnings = outcome.warnings.len(),
            elapsed = ?started.elapsed(),
            "built corpus generation"
        );

        let generation = Self {
            store,
            exact,
            keywords,
            number,
            built_at: Instant::now(),
            fetched_at: SystemTime::now(),
            source_hash: xxh3_64(raw_source.as_bytes()),
        };
        Ok((generation, outcome.warnings))
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn fetched_at(&self) -> SystemTime {
        self.fetched_at
    }

    /// Content hash of the raw source this generation was built from.
    pub fn source_hash(&self) -> u64 {
        self.source_hash
    }

    pub fn record_count(&self) -> usize {
        self.store.len()
    }

    /// Look up a record by id or fail with `NotFound`.
    pub fn record(&self, id: &str) -> Result<&DocRecord> {
        self.store.get(id)
    }

    pub(crate) fn is_stale(&self, ttl: Duration) -> bool {
        self.built_at.elapsed() > ttl
    }

    pub(crate) fn exact(&self) -> &ExactIndex {
        &self.exact
    }

    pub(crate) fn keywords(&self) -> &KeywordIndex {
        &self.keywords
    }

    pub(crate) fn record_by_slot(&self, slot: usize) -> &DocRecord {
        self.store.by_slot(slot)
    }
}

/// Freshness of one library corpus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreshnessState {
    /// No generation has ever been built.
    Cold,
    Fresh,
    Stale,
    Rebuilding,
}

/// Snapshot of a corpus for health/metrics collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusStatus {
    pub state: FreshnessState,
    pub generation: Option<u64>,
    pub fetched_at: Option<SystemTime>,
}

impl CorpusStatus {
    pub(crate) fn cold() -> Self {
        Self {
            state: FreshnessState::Cold,
            generation: None,
            fetched_at: None,
        }
    }
}
