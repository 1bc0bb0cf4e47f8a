//! Lexical relevance and recency scoring.
//!
//! The local server has no embedding model, so "semantic" similarity is
//! approximated with normalised term overlap: half query-term coverage
//! (with prefix matches counting partially), half cosine similarity over
//! term frequencies. All scores are in [0, 1].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

const STOP_WORDS: &[&str] = &[
    "a", "about", "all", "an", "and", "any", "are", "as", "at", "be", "been", "but", "by", "can",
    "could", "do", "does", "for", "from", "had", "has", "have", "he", "her", "his", "how", "i",
    "if", "in", "into", "is", "it", "its", "just", "me", "my", "no", "not", "of", "on", "or",
    "our", "she", "so", "some", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "those", "to", "too", "us", "was", "we", "were", "what", "when", "where",
    "which", "who", "why", "will", "with", "would", "you", "your",
];

/// Ordered so longer suffixes win.
const SUFFIXES: &[(&str, &str)] = &[
    ("ations", "ate"),
    ("ation", "ate"),
    ("ings", ""),
    ("ing", ""),
    ("ies", "y"),
    ("ied", "y"),
    ("ness", ""),
    ("ment", ""),
    ("ly", ""),
    ("ed", ""),
    ("es", ""),
    ("s", ""),
];

/// Credit given to a query term that only prefix-matches a document term.
const PREFIX_MATCH_CREDIT: f64 = 0.75;
const MIN_PREFIX_LEN: usize = 4;

/// Bag of normalised terms.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Terms {
    counts: BTreeMap<String, u32>,
}

impl Terms {
    pub fn from_text(text: &str) -> Self {
        let mut counts = BTreeMap::new();
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= 2)
        {
            let token = token.to_lowercase();
            if STOP_WORDS.contains(&token.as_str()) {
                continue;
            }
            *counts.entry(stem(&token)).or_insert(0) += 1;
        }
        Self { counts }
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.counts.keys().map(String::as_str)
    }

    /// Whether `word` occurs, after the same normalisation as the text.
    pub fn contains_word(&self, word: &str) -> bool {
        self.counts.contains_key(&stem(&word.to_lowercase()))
    }

    fn norm(&self) -> f64 {
        self.counts
            .values()
            .map(|&c| f64::from(c) * f64::from(c))
            .sum::<f64>()
            .sqrt()
    }

    fn match_credit(&self, term: &str) -> f64 {
        if self.counts.contains_key(term) {
            return 1.0;
        }
        let prefix_match = self.counts.keys().any(|doc_term| {
            let (short, long) = if doc_term.len() < term.len() {
                (doc_term.as_str(), term)
            } else {
                (term, doc_term.as_str())
            };
            short.len() >= MIN_PREFIX_LEN && long.starts_with(short)
        });
        if prefix_match { PREFIX_MATCH_CREDIT } else { 0.0 }
    }
}

/// Crude suffix stripping; both sides of a comparison go through it, so
/// consistency matters more than linguistic accuracy.
pub fn stem(token: &str) -> String {
    for (suffix, replacement) in SUFFIXES {
        if token.len() > suffix.len() + 2 && token.ends_with(suffix) {
            let root = &token[..token.len() - suffix.len()];
            return format!("{root}{replacement}");
        }
    }
    token.to_string()
}

/// Fraction of `query` terms found in `doc`.
pub fn coverage(query: &Terms, doc: &Terms) -> f64 {
    if query.is_empty() {
        return 0.0;
    }
    let credit: f64 = query.iter().map(|term| doc.match_credit(term)).sum();
    credit / query.len() as f64
}

pub fn cosine(a: &Terms, b: &Terms) -> f64 {
    let denominator = a.norm() * b.norm();
    if denominator == 0.0 {
        return 0.0;
    }
    let dot: f64 = a
        .counts
        .iter()
        .filter_map(|(term, &ca)| b.counts.get(term).map(|&cb| f64::from(ca) * f64::from(cb)))
        .sum();
    (dot / denominator).clamp(0.0, 1.0)
}

/// Relevance of `doc` to `query` in [0, 1].
pub fn lexical_similarity(query: &Terms, doc: &Terms) -> f64 {
    (0.5 * coverage(query, doc) + 0.5 * cosine(query, doc)).clamp(0.0, 1.0)
}

/// Query terms that `doc` matches exactly, in term order.
pub fn matched_terms<'a>(query: &'a Terms, doc: &Terms) -> Vec<&'a str> {
    query
        .iter()
        .filter(|term| doc.counts.contains_key(*term))
        .collect()
}

/// Exponential decay with the given half-life. Future timestamps score 1.
pub fn recency_score(created_at: DateTime<Utc>, now: DateTime<Utc>, half_life_hours: f64) -> f64 {
    let age_ms = (now - created_at).num_milliseconds().max(0);
    #[allow(clippy::cast_precision_loss)]
    let age_hours = age_ms as f64 / 3_600_000.0;
    0.5_f64.powf(age_hours / half_life_hours).clamp(0.0, 1.0)
}
