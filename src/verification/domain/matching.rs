//! Outcome of scoring recognised labels against task keywords.

use std::fmt;

/// Why a match result was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchBasis {
    /// The task names no keywords, so any photo passes.
    NoKeywordsRequired,
    /// Recognised labels were compared against the task keywords.
    Evaluated,
}

/// Alternative labels offered for a keyword that found no evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    /// Keyword without a matching label.
    pub keyword: String,
    /// Labels that would have satisfied it.
    pub candidates: Vec<String>,
}

impl fmt::Display for Suggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.candidates.is_empty() {
            write!(f, "show something recognisable as \"{}\"", self.keyword)
        } else {
            write!(
                f,
                "for \"{}\" try showing: {}",
                self.keyword,
                self.candidates.join(", ")
            )
        }
    }
}

/// Result of matching one photo against one task.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// `true` when at least one keyword found evidence.
    pub matched: bool,
    /// Keywords that found evidence.
    pub matched_keywords: Vec<String>,
    /// Recognised labels that served as evidence.
    pub matched_objects: Vec<String>,
    /// `matched_keywords / task keywords`, or 1.0 when none were required.
    pub confidence: f64,
    /// One entry per keyword without evidence.
    pub suggestions: Vec<Suggestion>,
    /// How the result was reached.
    pub basis: MatchBasis,
}

impl MatchResult {
    /// Result for a task that names no keywords.
    #[must_use]
    pub const fn no_keywords_required() -> Self {
        Self {
            matched: true,
            matched_keywords: Vec::new(),
            matched_objects: Vec::new(),
            confidence: 1.0,
            suggestions: Vec::new(),
            basis: MatchBasis::NoKeywordsRequired,
        }
    }
}
