//! Query model, validation, and the per-mode planner/ranker.
//!
//! A query runs against a snapshot of `(library, generation)` pairs handed
//! over by the engine — already scope-filtered and in preference order —
//! so planning never touches shared mutable state.

use super::tokenize::{default_stemmer, tokenize};
use crate::corpus::Generation;
use crate::error::{EngineError, Result};
use crate::record::DocRecord;
use ahash::AHashSet;
use rapidfuzz::distance::jaro_winkler;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Result rows returned when the caller does not ask for a limit.
pub const DEFAULT_LIMIT: usize = 20;

/// Hard cap on requested result rows; anything above is rejected.
pub const MAX_LIMIT: usize = 200;

/// Score assigned to exact-name and prefix matches.
const EXACT_SCORE: f32 = 1.0;

/// At most this many "did you mean" entries accompany an empty exact result.
const SUGGESTION_LIMIT: usize = 5;

/// Minimum Jaro-Winkler similarity for a key to be suggested.
const SUGGESTION_THRESHOLD: f64 = 0.7;

/// How query text is resolved against the indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryMode {
    /// Direct exact-name lookup over ids and aliases.
    Exact,
    /// Case-insensitive scan for names starting with the query text.
    Prefix,
    /// Tokenized TF-IDF search over summaries, tags and signatures.
    Keyword,
}

/// An immutable request, constructed once per lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Query {
    pub text: String,
    pub mode: QueryMode,
    /// Libraries to consult, in preference order. `None` means all known
    /// libraries; unknown names are skipped, not an error.
    #[serde(default)]
    pub library_scope: Option<Vec<String>>,
    /// Result rows to return. `None` means [`DEFAULT_LIMIT`]; values above
    /// [`MAX_LIMIT`] are rejected.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(text: impl Into<String>, mode: QueryMode) -> Self {
        Self {
            text: text.into(),
            mode,
            library_scope: None,
            limit: None,
        }
    }

    #[must_use]
    pub fn with_scope(mut self, libraries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.library_scope = Some(libraries.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One ranked match.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryHit {
    pub library: String,
    pub score: f32,
    pub record: DocRecord,
}

/// A near-miss offered when an exact lookup finds nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub library: String,
    pub id: String,
    /// Jaro-Winkler similarity to the query text, 0.0 to 1.0.
    pub score: f64,
}

/// Ranked results plus the generations they were served from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResult {
    pub hits: Vec<QueryHit>,
    /// Matches before truncation to the limit.
    pub total_matched: usize,
    /// Generation consulted per library, for every library in scope that
    /// had a built corpus — including libraries that contributed no hit.
    pub generation_served: BTreeMap<String, u64>,
    /// Populated only by `Exact` mode queries that matched nothing.
    pub suggestions: Vec<Suggestion>,
}

/// Check a query before any generation is read.
///
/// Returns the effective limit on success.
pub(crate) fn validate(query: &Query) -> Result<usize> {
    if query.text.trim().is_empty() {
        return Err(EngineError::invalid_query("query text is empty"));
    }
    match query.limit {
        None => Ok(DEFAULT_LIMIT),
        Some(0) => Err(EngineError::invalid_query("limit must be at least 1")),
        Some(n) if n > MAX_LIMIT => Err(EngineError::invalid_query(format!(
            "limit {n} exceeds the cap of {MAX_LIMIT}"
        ))),
        Some(n) => Ok(n),
    }
}

/// Resolve a validated query against the given corpora.
///
/// `corpora` is scope-filtered and ordered by caller preference; every
/// ordering rule below is deterministic for identical input.
pub(crate) fn execute(
    query: &Query,
    limit: usize,
    corpora: &[(String, Arc<Generation>)],
) -> QueryResult {
    let generation_served: BTreeMap<String, u64> = corpora
        .iter()
        .map(|(library, generation)| (library.clone(), generation.number()))
        .collect();

    let (mut hits, total_matched, suggestions) = match query.mode {
        QueryMode::Exact => run_exact(&query.text, corpora),
        QueryMode::Prefix => run_prefix(&query.text, corpora),
        QueryMode::Keyword => run_keyword(&query.text, corpora),
    };
    hits.truncate(limit);

    QueryResult {
        hits,
        total_matched,
        generation_served,
        suggestions,
    }
}

/// Exact-name lookup. Multiple libraries may register the same name; all
/// matches return, ordered by scope preference then id.
fn run_exact(
    text: &str,
    corpora: &[(String, Arc<Generation>)],
) -> (Vec<QueryHit>, usize, Vec<Suggestion>) {
    let mut hits = Vec::new();
    for (library, generation) in corpora {
        let mut slots = generation.exact().lookup(text).to_vec();
        slots.sort_by(|a, b| {
            generation
                .record_by_slot(*a)
                .id
                .cmp(&generation.record_by_slot(*b).id)
        });
        for slot in slots {
            hits.push(QueryHit {
                library: library.clone(),
                score: EXACT_SCORE,
                record: generation.record_by_slot(slot).clone(),
            });
        }
    }

    let total = hits.len();
    let suggestions = if hits.is_empty() {
        suggest(text, corpora)
    } else {
        Vec::new()
    };
    (hits, total, suggestions)
}

/// Fuzzy near-misses over the exact-name keys of every scoped corpus.
fn suggest(text: &str, corpora: &[(String, Arc<Generation>)]) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for (library, generation) in corpora {
        for key in generation.exact().keys() {
            let score = jaro_winkler::similarity(text.chars(), key.chars());
            if score >= SUGGESTION_THRESHOLD {
                suggestions.push(Suggestion {
                    library: library.clone(),
                    id: key.to_string(),
                    score,
                });
            }
        }
    }
    suggestions.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.library.cmp(&b.library))
    });
    suggestions.truncate(SUGGESTION_LIMIT);
    suggestions
}

/// Case-insensitive prefix scan, ordered by key length then key text.
fn run_prefix(
    text: &str,
    corpora: &[(String, Arc<Generation>)],
) -> (Vec<QueryHit>, usize, Vec<Suggestion>) {
    let needle = text.to_lowercase();

    // (key length, key, corpus index, slot)
    let mut matched: Vec<(usize, &str, usize, usize)> = Vec::new();
    for (corpus_index, (_, generation)) in corpora.iter().enumerate() {
        for (key, slots) in generation.exact().scan_prefix(&needle) {
            for &slot in slots {
                matched.push((key.len(), key, corpus_index, slot));
            }
        }
    }
    matched.sort_by(|a, b| {
        a.0.cmp(&b.0)
            .then_with(|| a.1.cmp(b.1))
            .then_with(|| a.2.cmp(&b.2))
    });

    // A record can match through both its id and an alias; report it once.
    let mut seen: AHashSet<(usize, usize)> = AHashSet::new();
    let mut hits = Vec::new();
    for (_, _, corpus_index, slot) in matched {
        if !seen.insert((corpus_index, slot)) {
            continue;
        }
        let (library, generation) = &corpora[corpus_index];
        hits.push(QueryHit {
            library: library.clone(),
            score: EXACT_SCORE,
            record: generation.record_by_slot(slot).clone(),
        });
    }

    let total = hits.len();
    (hits, total, Vec::new())
}

/// Tokenized search: sum of matched-token TF-IDF weights per candidate,
/// ordered by score descending then id ascending.
fn run_keyword(
    text: &str,
    corpora: &[(String, Arc<Generation>)],
) -> (Vec<QueryHit>, usize, Vec<Suggestion>) {
    let stemmer = default_stemmer();
    let tokens = tokenize(text, &stemmer);
    if tokens.is_empty() {
        return (Vec::new(), 0, Vec::new());
    }

    // (score, corpus index, slot)
    let mut candidates: Vec<(f32, usize, usize)> = Vec::new();
    for (corpus_index, (_, generation)) in corpora.iter().enumerate() {
        for (slot, score) in generation.keywords().candidates(&tokens) {
            candidates.push((score, corpus_index, slot));
        }
    }
    candidates.sort_by(|a, b| {
        let a_id = &corpora[a.1].1.record_by_slot(a.2).id;
        let b_id = &corpora[b.1].1.record_by_slot(b.2).id;
        b.0.total_cmp(&a.0)
            .then_with(|| a_id.cmp(b_id))
            .then_with(|| a.1.cmp(&b.1))
    });

    let total = candidates.len();
    let hits = candidates
        .into_iter()
        .map(|(score, corpus_index, slot)| {
            let (library, generation) = &corpora[corpus_index];
            QueryHit {
                library: library.clone(),
                score,
                record: generation.record_by_slot(slot).clone(),
            }
        })
        .collect();
    (hits, total, Vec::new())
}
