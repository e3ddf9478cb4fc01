//! The engine facade: ingestion, queries, status, and freshness control.
//!
//! Concurrency model: readers share `Arc<Generation>` snapshots; a rebuild
//! constructs the next generation off to the side and only the final
//! pointer swap mutates shared state. At most one build runs per library
//! at a time — concurrent triggers coalesce onto one shared future instead
//! of queueing.

use crate::config::EngineConfig;
use crate::corpus::{CorpusStatus, FreshnessState, Generation};
use crate::error::{EngineError, Result};
use crate::parser::{ParseWarning, ParserAdapter, ParserRegistry};
use crate::record::{DocRecord, ExampleSnippet};
use crate::search::query::{self, Query, QueryResult};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{Mutex, RwLock, Semaphore};

/// In-flight build, shared so every concurrent trigger awaits the same work.
type BuildFuture = Shared<BoxFuture<'static, std::result::Result<Arc<Generation>, EngineError>>>;

/// What an ingestion produced: the new generation number and any non-fatal
/// warnings the parser reported.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub generation: u64,
    pub warnings: Vec<ParseWarning>,
}

/// Per-library mutable state. The current-generation pointer is the only
/// value queries and rebuilds contend on.
struct LibraryEntry {
    name: String,
    /// Latest raw source handed to `ingest`; rebuilds re-parse this rather
    /// than fetching anything themselves.
    source: RwLock<Option<Arc<str>>>,
    /// Currently serving generation.
    current: RwLock<Option<Arc<Generation>>>,
    /// Coalescing gate: `Some` while a rebuild is in flight.
    in_flight: Mutex<Option<BuildFuture>>,
    /// Serializes builders so generation numbers and swaps stay ordered.
    writer: Mutex<()>,
    /// Successful builds so far; the next build becomes `count + 1`.
    generations: AtomicU64,
}

impl LibraryEntry {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            source: RwLock::new(None),
            current: RwLock::new(None),
            in_flight: Mutex::new(None),
            writer: Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }
}

/// Documentation indexing and query engine over any number of libraries.
///
/// Safe to share (`Arc<DocEngine>`) between concurrent readers and the
/// ingestion collaborator; `query` never blocks on a rebuild it triggers,
/// except on a corpus that has never been built.
pub struct DocEngine {
    config: EngineConfig,
    parsers: ParserRegistry,
    libraries: RwLock<HashMap<String, Arc<LibraryEntry>>>,
    rebuild_permits: Arc<Semaphore>,
}

impl std::fmt::Debug for DocEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocEngine")
            .field("config", &self.config)
            .field("parsers", &self.parsers)
            .finish_non_exhaustive()
    }
}

impl DocEngine {
    pub fn new(config: EngineConfig, parsers: ParserRegistry) -> Self {
        let permits = config.max_concurrent_rebuilds.max(1);
        Self {
            config,
            parsers,
            libraries: RwLock::new(HashMap::new()),
            rebuild_permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Ingest new raw source for a library and build a fresh generation.
    ///
    /// Idempotent per source content: byte-identical input produces an
    /// observably identical corpus, though the generation number still
    /// increments. Schema conflicts inside the dump fail the build and
    /// leave any previously serving generation in place.
    pub async fn ingest(&self, library: &str, raw_source: &str) -> Result<IngestReport> {
        let parser = self
            .parsers
            .get(library)
            .ok_or_else(|| EngineError::build(library, "no parser registered for library"))?;
        let entry = self.entry_or_insert(library).await;
        *entry.source.write().await = Some(Arc::from(raw_source));

        let (generation, warnings) =
            build_and_swap(entry, parser, self.rebuild_permits.clone()).await?;
        Ok(IngestReport {
            generation: generation.number(),
            warnings,
        })
    }

    /// Resolve a query against the current generations of the scoped
    /// libraries. Never mutates served state; safe to call concurrently
    /// with `ingest`.
    ///
    /// A stale corpus is served as-is while a background rebuild is kicked
    /// off (at most one per library). A corpus that has never been built
    /// blocks the caller until its first build resolves, and only that
    /// caller sees a `Build` error on failure.
    pub async fn query(&self, query: &Query) -> Result<QueryResult> {
        let limit = query::validate(query)?;

        let entries: Vec<Arc<LibraryEntry>> = match &query.library_scope {
            Some(scope) => {
                let libraries = self.libraries.read().await;
                let mut seen = Vec::new();
                let mut picked = Vec::new();
                for name in scope {
                    if seen.contains(name) {
                        continue;
                    }
                    seen.push(name.clone());
                    // Unknown libraries yield no corpus, not an error.
                    if let Some(entry) = libraries.get(name) {
                        picked.push(entry.clone());
                    }
                }
                picked
            }
            None => {
                let libraries = self.libraries.read().await;
                let mut entries: Vec<_> = libraries.values().cloned().collect();
                entries.sort_by(|a, b| a.name.cmp(&b.name));
                entries
            }
        };

        let mut corpora = Vec::with_capacity(entries.len());
        for entry in entries {
            if let Some(generation) = self.generation_for_query(&entry).await? {
                corpora.push((entry.name.clone(), generation));
            }
        }
        Ok(query::execute(query, limit, &corpora))
    }

    /// Fetch a record by id from a library's current generation.
    pub async fn get(&self, library: &str, id: &str) -> Result<DocRecord> {
        let not_found = || EngineError::NotFound(id.to_string());
        let entry = self.entry(library).await.ok_or_else(not_found)?;
        let generation = entry.current.read().await.clone().ok_or_else(not_found)?;
        generation.record(id).cloned()
    }

    /// Fetch just the example snippets attached to a record.
    pub async fn examples(&self, library: &str, id: &str) -> Result<Vec<ExampleSnippet>> {
        self.get(library, id).await.map(|record| record.examples)
    }

    /// Freshness snapshot for health and metrics collaborators.
    pub async fn status(&self, library: &str) -> CorpusStatus {
        let Some(entry) = self.entry(library).await else {
            return CorpusStatus::cold();
        };
        let rebuilding = entry.in_flight.lock().await.is_some();
        match entry.current.read().await.as_ref() {
            None => CorpusStatus {
                state: if rebuilding {
                    FreshnessState::Rebuilding
                } else {
                    FreshnessState::Cold
                },
                generation: None,
                fetched_at: None,
            },
            Some(generation) => CorpusStatus {
                state: if rebuilding {
                    FreshnessState::Rebuilding
                } else if generation.is_stale(self.config.ttl()) {
                    FreshnessState::Stale
                } else {
                    FreshnessState::Fresh
                },
                generation: Some(generation.number()),
                fetched_at: Some(generation.fetched_at()),
            },
        }
    }

    /// Names of all libraries that have been ingested at least once.
    pub async fn libraries(&self) -> Vec<String> {
        let mut names: Vec<String> = self.libraries.read().await.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// The generation a query should read for this library, applying the
    /// stale-while-revalidate policy.
    async fn generation_for_query(
        &self,
        entry: &Arc<LibraryEntry>,
    ) -> Result<Option<Arc<Generation>>> {
        let current = entry.current.read().await.clone();
        match current {
            Some(generation) => {
                if generation.is_stale(self.config.ttl()) {
                    // Serve the stale snapshot; refresh in the background.
                    let future = self.rebuild_future(entry).await;
                    tokio::spawn(future);
                }
                Ok(Some(generation))
            }
            None => {
                if entry.source.read().await.is_none() {
                    return Ok(None);
                }
                // Cold start: wait for the first build and surface its error.
                let future = self.rebuild_future(entry).await;
                let generation = future.await?;
                Ok(Some(generation))
            }
        }
    }

    /// Join the in-flight rebuild for this library, or start one.
    async fn rebuild_future(&self, entry: &Arc<LibraryEntry>) -> BuildFuture {
        let mut in_flight = entry.in_flight.lock().await;
        if let Some(existing) = in_flight.as_ref() {
            return existing.clone();
        }

        let entry = entry.clone();
        let parser = self.parsers.get(&entry.name);
        let permits = self.rebuild_permits.clone();
        let future: BoxFuture<'static, std::result::Result<Arc<Generation>, EngineError>> =
            Box::pin(async move {
                let result = match parser {
                    Some(parser) => build_and_swap(entry.clone(), parser, permits).await,
                    None => Err(EngineError::build(
                        &entry.name,
                        "no parser registered for library",
                    )),
                };
                *entry.in_flight.lock().await = None;

                match result {
                    Ok((generation, warnings)) => {
                        for warning in &warnings {
                            tracing::warn!(
                                library = %entry.name,
                                line = ?warning.line,
                                "parse warning during rebuild: {}",
                                warning.message
                            );
                        }
                        Ok(generation)
                    }
                    Err(error) => {
                        tracing::warn!(
                            library = %entry.name,
                            %error,
                            "rebuild failed, previous generation retained"
                        );
                        // Rebuild failures surface uniformly as build errors.
                        Err(match error {
                            build @ EngineError::Build { .. } => build,
                            other => EngineError::build(&entry.name, other.to_string()),
                        })
                    }
                }
            });

        let shared = future.shared();
        *in_flight = Some(shared.clone());
        shared
    }

    async fn entry(&self, library: &str) -> Option<Arc<LibraryEntry>> {
        self.libraries.read().await.get(library).cloned()
    }

    async fn entry_or_insert(&self, library: &str) -> Arc<LibraryEntry> {
        if let Some(entry) = self.entry(library).await {
            return entry;
        }
        let mut libraries = self.libraries.write().await;
        libraries
            .entry(library.to_string())
            .or_insert_with(|| Arc::new(LibraryEntry::new(library)))
            .clone()
    }
}

/// Build the next generation from the entry's retained source and swap it
/// in. The writer lock keeps one builder per library; parsing and indexing
/// happen on the blocking pool, off the async workers.
async fn build_and_swap(
    entry: Arc<LibraryEntry>,
    parser: Arc<dyn ParserAdapter>,
    permits: Arc<Semaphore>,
) -> Result<(Arc<Generation>, Vec<ParseWarning>)> {
    let _permit = permits
        .acquire_owned()
        .await
        .map_err(|_| EngineError::build(&entry.name, "engine is shutting down"))?;
    let _writer = entry.writer.lock().await;

    let source = entry
        .source
        .read()
        .await
        .clone()
        .ok_or_else(|| EngineError::build(&entry.name, "no source has been ingested"))?;
    let number = entry.generations.load(Ordering::Acquire) + 1;
    let library = entry.name.clone();

    let (generation, warnings) =
        tokio::task::spawn_blocking(move || Generation::build(&library, number, &source, parser.as_ref()))
            .await
            .map_err(|join_error| {
                EngineError::build(&entry.name, format!("build task panicked: {join_error}"))
            })??;

    let generation = Arc::new(generation);
    {
        let mut current = entry.current.write().await;
        entry.generations.store(number, Ordering::Release);
        *current = Some(generation.clone());
    }
    Ok((generation, warnings))
}
