//! String similarity strategies used by the matcher's fuzzy fallback.

use std::fmt;
use std::str::FromStr;

/// Upper bound for two strings that are not equal.
const MAX_DISTINCT: f64 = 1.0 - f64::EPSILON;

/// Scores how close two already-normalized strings are.
///
/// Implementations must be symmetric, return values in `[0.0, 1.0]`, and
/// return `1.0` only when the inputs are equal.
pub trait Similarity: Send + Sync {
    fn ratio(&self, a: &str, b: &str) -> f64;
}

/// Built-in strategies, all backed by `strsim`. Chosen once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SimilarityStrategy {
    /// Edit distance counting adjacent transpositions as one edit.
    #[default]
    DamerauLevenshtein,
    Levenshtein,
    JaroWinkler,
    SorensenDice,
}

impl SimilarityStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DamerauLevenshtein => "damerau",
            Self::Levenshtein => "levenshtein",
            Self::JaroWinkler => "jaro-winkler",
            Self::SorensenDice => "sorensen-dice",
        }
    }
}

impl Similarity for SimilarityStrategy {
    fn ratio(&self, a: &str, b: &str) -> f64 {
        if a == b {
            return 1.0;
        }
        if a.is_empty() || b.is_empty() {
            return 0.0;
        }
        let score = match self {
            Self::DamerauLevenshtein => strsim::normalized_damerau_levenshtein(a, b),
            Self::Levenshtein => strsim::normalized_levenshtein(a, b),
            Self::JaroWinkler => strsim::jaro_winkler(a, b),
            Self::SorensenDice => strsim::sorensen_dice(a, b),
        };
        // strsim's Dice ignores whitespace, so distinct inputs can reach 1.0.
        score.clamp(0.0, MAX_DISTINCT)
    }
}

impl FromStr for SimilarityStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "damerau" | "damerau-levenshtein" | "damerau_levenshtein" => Ok(Self::DamerauLevenshtein),
            "levenshtein" | "difflib" | "ratio" => Ok(Self::Levenshtein),
            "jaro-winkler" | "jaro_winkler" | "jarowinkler" => Ok(Self::JaroWinkler),
            "sorensen-dice" | "sorensen_dice" | "dice" => Ok(Self::SorensenDice),
            other => Err(format!(
                "unknown similarity '{other}' (expected damerau, levenshtein, jaro-winkler or sorensen-dice)"
            )),
        }
    }
}

impl fmt::Display for SimilarityStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
