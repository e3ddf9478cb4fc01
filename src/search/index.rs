//! Generation-scoped search structures.
//!
//! Both indexes are built from a complete record store and reference
//! records by slot, so an index entry can never point outside its own
//! generation. Builds are deterministic: posting order is fixed by weight
//! and id, never by map iteration order.

use super::tokenize::{default_stemmer, hash_term, tokenize};
use crate::record::RecordStore;
use ahash::AHashMap;
use std::collections::BTreeMap;
use std::time::Instant;

/// Weight multiplier for curated keywords (`tags`).
const TAG_WEIGHT: f32 = 2.0;
/// Weight multiplier for free text (`summary`, `signature`).
const TEXT_WEIGHT: f32 = 1.0;

/// Exact-name map over record ids and their declared aliases.
#[derive(Debug, Default)]
pub(crate) struct ExactIndex {
    /// Case-preserving key to slots, for `Exact` lookups.
    keys: BTreeMap<String, Vec<usize>>,
    /// Lower-cased key to slots, for case-insensitive `Prefix` scans.
    folded: BTreeMap<String, Vec<usize>>,
}

impl ExactIndex {
    pub(crate) fn build(store: &RecordStore) -> Self {
        let mut index = Self::default();
        for (slot, record) in store.slots() {
            index.insert(&record.id, slot);
            for alias in &record.aliases {
                index.insert(alias, slot);
            }
        }
        for slots in index.keys.values_mut().chain(index.folded.values_mut()) {
            slots.sort_unstable();
            slots.dedup();
        }
        index
    }

    fn insert(&mut self, key: &str, slot: usize) {
        self.keys.entry(key.to_string()).or_default().push(slot);
        self.folded
            .entry(key.to_lowercase())
            .or_default()
            .push(slot);
    }

    /// Slots registered under the exact key.
    pub(crate) fn lookup(&self, key: &str) -> &[usize] {
        self.keys.get(key).map_or(&[], Vec::as_slice)
    }

    /// All `(key, slots)` pairs whose lower-cased key starts with the
    /// (already lower-cased) prefix, ordered by key length then lexically.
    pub(crate) fn scan_prefix(&self, prefix: &str) -> Vec<(&str, &[usize])> {
        let mut matches: Vec<(&str, &[usize])> = self
            .folded
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, slots)| (key.as_str(), slots.as_slice()))
            .collect();
        matches.sort_by(|(a, _), (b, _)| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        matches
    }

    /// Case-preserving keys, for fuzzy suggestion generation.
    pub(crate) fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.keys().map(String::as_str)
    }
}

/// Inverted keyword index with TF-IDF weighted postings.
///
/// Tokens come from `summary`, `tags`, and `signature`. A posting's weight
/// is the (tag-boosted) term frequency scaled by a smoothed inverse
/// document frequency, computed once per build. Posting lists are ordered
/// by weight descending, then record id ascending.
#[derive(Debug, Default)]
pub(crate) struct KeywordIndex {
    postings: AHashMap<u64, Vec<(usize, f32)>>,
}

impl KeywordIndex {
    pub(crate) fn build(store: &RecordStore) -> Self {
        let started = Instant::now();
        let stemmer = default_stemmer();

        // Per-record weighted term frequencies.
        let mut frequencies: Vec<AHashMap<u64, f32>> = Vec::with_capacity(store.len());
        for (_, record) in store.slots() {
            let mut counts: AHashMap<u64, f32> = AHashMap::new();
            for term in tokenize(&record.summary, &stemmer) {
                *counts.entry(hash_term(&term)).or_insert(0.0) += TEXT_WEIGHT;
            }
            for tag in &record.tags {
                for term in tokenize(tag, &stemmer) {
                    *counts.entry(hash_term(&term)).or_insert(0.0) += TAG_WEIGHT;
                }
            }
            if let Some(signature) = &record.signature {
                for term in tokenize(signature, &stemmer) {
                    *counts.entry(hash_term(&term)).or_insert(0.0) += TEXT_WEIGHT;
                }
            }
            frequencies.push(counts);
        }

        // Document frequency per term, then TF-IDF postings.
        let mut document_frequency: AHashMap<u64, usize> = AHashMap::new();
        for counts in &frequencies {
            for term in counts.keys() {
                *document_frequency.entry(*term).or_insert(0) += 1;
            }
        }

        let total = store.len() as f32;
        let mut postings: AHashMap<u64, Vec<(usize, f32)>> = AHashMap::new();
        for (slot, counts) in frequencies.into_iter().enumerate() {
            for (term, tf) in counts {
                // Smoothed so a term present in every record still scores.
                let idf = 1.0 + (total / document_frequency[&term] as f32).ln();
                postings.entry(term).or_default().push((slot, tf * idf));
            }
        }
        for list in postings.values_mut() {
            list.sort_by(|(a_slot, a_weight), (b_slot, b_weight)| {
                b_weight
                    .total_cmp(a_weight)
                    .then_with(|| store.by_slot(*a_slot).id.cmp(&store.by_slot(*b_slot).id))
            });
        }

        let index = Self { postings };
        tracing::debug!(
            records = store.len(),
            terms = index.postings.len(),
            elapsed = ?started.elapsed(),
            "built keyword index"
        );
        index
    }

    /// Combined score per candidate slot: sum of matched-token weights.
    /// Slots with no matching token are absent.
    pub(crate) fn candidates(&self, tokens: &[String]) -> AHashMap<usize, f32> {
        let mut combined: AHashMap<usize, f32> = AHashMap::new();
        for token in tokens {
            if let Some(list) = self.postings.get(&hash_term(token)) {
                for (slot, weight) in list {
                    *combined.entry(*slot).or_insert(0.0) += weight;
                }
            }
        }
        combined
    }

    #[cfg(test)]
    pub(crate) fn term_count(&self) -> usize {
        self.postings.len()
    }

    #[cfg(test)]
    pub(crate) fn posting(&self, term: &str) -> Option<&[(usize, f32)]> {
        self.postings.get(&hash_term(term)).map(Vec::as_slice)
    }
}
