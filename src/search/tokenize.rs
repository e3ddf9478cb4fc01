//! Tokenization shared by the indexer and the query planner.
//!
//! Index-time and query-time text go through the identical pipeline so
//! stemmed terms line up: split on non-alphanumeric boundaries and case
//! transitions, lower-case, drop stop words, stem. Case-compound words such
//! as `HttpServer` additionally contribute the whole word so a verbatim
//! query still matches.

use ahash::AHasher;
use rust_stemmers::{Algorithm, Stemmer};
use std::hash::{Hash, Hasher};

/// High-frequency English words that add nothing to relevance.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

/// The stemmer used everywhere terms are produced.
pub(crate) fn default_stemmer() -> Stemmer {
    Stemmer::create(Algorithm::English)
}

/// Split a word into its alphabetic segments.
///
/// Segments break at non-alphabetic characters and at lower-to-upper case
/// transitions, so `HttpServer2` yields `["Http", "Server"]`. Digit runs
/// are discarded.
fn alpha_segments(word: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut start = None;
    let mut prev_lower = false;

    for (i, c) in word.char_indices() {
        if c.is_alphabetic() {
            match start {
                Some(s) if prev_lower && c.is_uppercase() => {
                    segments.push(&word[s..i]);
                    start = Some(i);
                }
                Some(_) => {}
                None => start = Some(i),
            }
            prev_lower = c.is_lowercase();
        } else {
            if let Some(s) = start.take() {
                segments.push(&word[s..i]);
            }
            prev_lower = false;
        }
    }
    if let Some(s) = start {
        segments.push(&word[s..]);
    }
    segments
}

fn push_term(term: &str, stemmer: &Stemmer, out: &mut Vec<String>) {
    let lowered = term.to_lowercase();
    if lowered.is_empty() || STOP_WORDS.contains(&lowered.as_str()) {
        return;
    }
    out.push(stemmer.stem(&lowered).into_owned());
}

/// Tokenize text into stemmed, lower-case terms.
pub(crate) fn tokenize(text: &str, stemmer: &Stemmer) -> Vec<String> {
    let mut terms = Vec::new();
    for word in text.split(|c: char| !c.is_alphanumeric()) {
        if word.is_empty() {
            continue;
        }
        let segments = alpha_segments(word);
        for segment in &segments {
            push_term(segment, stemmer, &mut terms);
        }
        if segments.len() > 1 {
            // Keep the compound form searchable verbatim.
            let whole: String = word.chars().filter(|c| c.is_alphabetic()).collect();
            push_term(&whole, stemmer, &mut terms);
        }
    }
    terms
}

/// Hash a term for posting-list lookup.
///
/// `AHasher::default()` is keyed deterministically, so index-time and
/// query-time hashes agree within a process.
pub(crate) fn hash_term(term: &str) -> u64 {
    let mut hasher = AHasher::default();
    term.hash(&mut hasher);
    hasher.finish()
}
