//! Keyword and fuzzy matching of free text against the catalog.
//!
//! For each entry the matcher walks its search terms (keywords plus the
//! product name). A term whose normalized form occurs inside the
//! normalized message is a direct hit: the entry scores 1.0 and the scan
//! of that entry stops. Otherwise the best similarity ratio between the
//! whole normalized message and any term is kept, and the entry
//! qualifies when it reaches the threshold.

pub mod similarity;

pub use similarity::{Similarity, SimilarityStrategy};

use std::sync::Arc;

use crate::catalog::CatalogEntry;

/// Canonical form used for every comparison: whitespace removed, lower-cased.
pub fn norm(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

/// A catalog entry judged relevant to a message.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Product name as written in the sheet (may be empty).
    pub name: String,
    /// Display label: the name, or a fallback when the name is empty.
    pub label: String,
    pub reply: String,
    pub score: f64,
    /// The search term that occurred in the message, for direct hits.
    pub matched_term: Option<String>,
}

impl Candidate {
    pub fn is_direct_hit(&self) -> bool {
        self.matched_term.is_some()
    }
}

/// Ranks catalog entries against a message.
#[derive(Clone)]
pub struct Matcher {
    similarity: Arc<dyn Similarity>,
    threshold: f64,
}

impl Matcher {
    pub fn new(similarity: Arc<dyn Similarity>, threshold: f64) -> Self {
        Self {
            similarity,
            threshold,
        }
    }

    /// Matcher using one of the built-in strategies.
    pub fn with_strategy(strategy: SimilarityStrategy, threshold: f64) -> Self {
        Self::new(Arc::new(strategy), threshold)
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Score one entry: `(best, matched_term)`.
    fn score_entry(&self, text: &str, entry: &CatalogEntry) -> (f64, Option<String>) {
        let mut best = 0.0_f64;
        for term in entry.search_terms() {
            let key = norm(term);
            if key.is_empty() {
                continue;
            }
            if text.contains(&key) {
                return (1.0, Some(term.to_string()));
            }
            best = best.max(self.similarity.ratio(text, &key));
        }
        (best, None)
    }

    /// Candidates for `user_text`, deduplicated by product name and sorted
    /// by descending score (ties keep catalog order).
    pub fn find(&self, user_text: &str, catalog: &[CatalogEntry]) -> Vec<Candidate> {
        let text = norm(user_text);
        let mut candidates: Vec<Candidate> = Vec::new();

        for entry in catalog {
            let (best, matched_term) = self.score_entry(&text, entry);
            if matched_term.is_none() && best < self.threshold {
                continue;
            }
            if candidates.iter().any(|c| c.name == entry.name) {
                continue;
            }
            candidates.push(Candidate {
                name: entry.name.clone(),
                label: entry.display_name().to_string(),
                reply: entry.reply.clone(),
                score: best,
                matched_term,
            });
        }

        // Vec::sort_by is stable.
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates
    }
}
