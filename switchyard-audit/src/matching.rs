//! Keyword scoring between requirements and artifacts.
//!
//! Both sides are reduced to keyword sets. The score of a requirement
//! against an artifact is the fraction of the requirement's keywords found
//! in the artifact, mapped onto [`MatchStrength`] by two thresholds.

use crate::corpus::RequirementRecord;
use crate::inventory::ArtifactDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "that", "this", "from", "into", "onto", "shall", "must",
    "should", "may", "could", "will", "can", "able", "want", "need", "have", "has", "are", "was",
    "were", "not", "all", "any", "each", "its", "our", "their", "them", "they", "when", "then",
    "than", "via", "use", "uses", "using", "system", "also", "only", "per", "out", "own",
];

const PATH_TOKENS: &[&str] = &[
    "src", "lib", "mod", "index", "main", "rs", "ts", "tsx", "js", "jsx", "py", "go", "java",
    "kt", "rb", "cpp", "hpp", "crate", "crates", "pkg", "internal", "util", "utils", "helpers",
    "impl", "web", "app",
];

/// Confidence of a requirement ↔ artifact match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrength {
    /// No meaningful overlap.
    None,
    /// Some overlap, below the high-confidence threshold.
    Partial,
    /// High-confidence overlap or an explicit claim.
    Exact,
}

/// Lowercase keywords of `text`: camelCase and non-alphanumerics split
/// words, stop words and generic path tokens are dropped, words shorter
/// than three letters are dropped, and a plural `s` is trimmed from longer
/// words.
pub fn keywords(text: &str) -> BTreeSet<String> {
    split_words(text)
        .into_iter()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() >= 3)
        .filter(|w| !STOP_WORDS.contains(&w.as_str()) && !PATH_TOKENS.contains(&w.as_str()))
        .map(singular)
        .collect()
}

fn split_words(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut words = vec![];
    let mut current = String::new();
    for (i, &c) in chars.iter().enumerate() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn singular(word: String) -> String {
    let keep = ["ss", "us", "is"].iter().any(|end| word.ends_with(end));
    if word.len() > 4 && word.ends_with('s') && !keep {
        word[..word.len() - 1].to_string()
    } else {
        word
    }
}

/// Keywords of an artifact: its path plus its symbols.
pub fn artifact_keywords(artifact: &ArtifactDescriptor) -> BTreeSet<String> {
    let mut kw = keywords(&artifact.path);
    for symbol in &artifact.symbols {
        kw.extend(keywords(symbol));
    }
    kw
}

/// Fraction of `requirement` keywords present in `artifact`. Zero when the
/// requirement has no keywords.
pub fn score(requirement: &BTreeSet<String>, artifact: &BTreeSet<String>) -> f64 {
    if requirement.is_empty() {
        return 0.0;
    }
    let overlap = requirement.intersection(artifact).count();
    overlap as f64 / requirement.len() as f64
}

/// Maps scores onto strengths.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matcher {
    high: f64,
    low: f64,
}

/// Outcome of matching one requirement against one artifact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Match {
    /// Strength.
    pub strength: MatchStrength,
    /// Raw score; 1.0 for explicit claims.
    pub score: f64,
}

impl Matcher {
    /// Thresholds are assumed validated (`0 < low <= high <= 1`).
    pub fn new(high: f64, low: f64) -> Self {
        Self { high, low }
    }

    /// Strength for a score.
    pub fn strength(&self, score: f64) -> MatchStrength {
        if score > 0.0 && score >= self.high {
            MatchStrength::Exact
        } else if score > 0.0 && score >= self.low {
            MatchStrength::Partial
        } else {
            MatchStrength::None
        }
    }

    /// Match a requirement against an artifact given precomputed keywords.
    pub fn judge(
        &self,
        requirement: &RequirementRecord,
        requirement_kw: &BTreeSet<String>,
        artifact: &ArtifactDescriptor,
        artifact_kw: &BTreeSet<String>,
    ) -> Match {
        if artifact.claims.contains(&requirement.id) {
            return Match {
                strength: MatchStrength::Exact,
                score: 1.0,
            };
        }
        let score = score(requirement_kw, artifact_kw);
        Match {
            strength: self.strength(score),
            score,
        }
    }
}
