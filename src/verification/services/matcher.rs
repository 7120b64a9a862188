//! Scores recognised labels against the keywords a task implies.

use crate::classification::{
    domain::{ClassificationResult, RecognizedLabel},
    ports::ImageClassifier,
    services::ClassificationClient,
};
use crate::verification::domain::{
    CheckpointKind, KeywordSynonymTable, MatchBasis, MatchResult, Suggestion, TaskSnapshot,
    normalize,
};
use mockable::Clock;
use std::collections::{BTreeSet, HashSet};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::debug;

/// Matching policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherSettings {
    /// Accept a label that shares any letter or digit with a candidate.
    pub allow_character_overlap: bool,
    /// Candidates listed per unmatched keyword.
    pub suggestion_limit: usize,
}

impl Default for MatcherSettings {
    fn default() -> Self {
        Self {
            allow_character_overlap: true,
            suggestion_limit: 3,
        }
    }
}

impl MatcherSettings {
    /// Only substring containment counts as a match.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            allow_character_overlap: false,
            ..Self::default()
        }
    }
}

/// Decides whether a photo satisfies a task.
pub struct ProofMatcher<K, C>
where
    K: ImageClassifier,
    C: Clock + Send + Sync,
{
    client: Arc<ClassificationClient<K, C>>,
    table: RwLock<KeywordSynonymTable>,
    settings: MatcherSettings,
}

impl<K, C> ProofMatcher<K, C>
where
    K: ImageClassifier,
    C: Clock + Send + Sync,
{
    /// Creates a matcher over `table` with default settings.
    #[must_use]
    pub fn new(client: Arc<ClassificationClient<K, C>>, table: KeywordSynonymTable) -> Self {
        Self {
            client,
            table: RwLock::new(table),
            settings: MatcherSettings::default(),
        }
    }

    /// Overrides the matching policy.
    #[must_use]
    pub const fn with_settings(mut self, settings: MatcherSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the classification client.
    #[must_use]
    pub const fn client(&self) -> &Arc<ClassificationClient<K, C>> {
        &self.client
    }

    /// Adds labels to the synonym table. Existing labels are kept.
    pub fn extend_synonyms<I, S>(&self, keyword: &str, labels: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.table
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(keyword, labels);
    }

    /// Lists the canonical keywords currently known.
    #[must_use]
    pub fn supported_keywords(&self) -> Vec<String> {
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .supported_keywords()
            .map(str::to_owned)
            .collect()
    }

    /// Canonical keywords appearing as substrings of `text`.
    #[must_use]
    pub fn extract_keywords(&self, text: &str) -> BTreeSet<String> {
        let haystack = normalize(text);
        self.table
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .supported_keywords()
            .filter(|keyword| haystack.contains(keyword))
            .map(str::to_owned)
            .collect()
    }

    /// Keywords a photo for the `kind` checkpoint must show: the
    /// requirement's explicit keywords plus those found in the title and
    /// description.
    #[must_use]
    pub fn task_keywords(&self, task: &TaskSnapshot, kind: CheckpointKind) -> Vec<String> {
        let mut keywords = self.extract_keywords(&format!("{} {}", task.title(), task.description()));
        keywords.extend(
            task.requirement(kind)
                .keywords()
                .iter()
                .map(|keyword| normalize(keyword))
                .filter(|keyword| !keyword.is_empty()),
        );
        keywords.into_iter().collect()
    }

    /// Scores `labels` against `keywords`.
    #[must_use]
    pub fn evaluate(&self, keywords: &[String], labels: &[RecognizedLabel]) -> MatchResult {
        if keywords.is_empty() {
            return MatchResult::no_keywords_required();
        }

        let table = self.table.read().unwrap_or_else(PoisonError::into_inner);
        let recognised: Vec<String> = labels
            .iter()
            .map(|label| normalize(label.label()))
            .filter(|label| !label.is_empty())
            .collect();

        let mut matched_keywords = Vec::new();
        let mut matched_objects: Vec<String> = Vec::new();
        let mut suggestions = Vec::new();
        for keyword in keywords {
            let candidates = table.candidates(keyword);
            let hits: Vec<&String> = recognised
                .iter()
                .filter(|label| self.label_matches(label, &candidates))
                .collect();
            if hits.is_empty() {
                suggestions.push(Suggestion {
                    keyword: keyword.clone(),
                    candidates: table
                        .synonyms(keyword)
                        .iter()
                        .take(self.settings.suggestion_limit)
                        .cloned()
                        .collect(),
                });
                continue;
            }
            matched_keywords.push(keyword.clone());
            for hit in hits {
                if !matched_objects.contains(hit) {
                    matched_objects.push(hit.clone());
                }
            }
        }

        let confidence = ratio(matched_keywords.len(), keywords.len());
        MatchResult {
            matched: !matched_keywords.is_empty(),
            matched_keywords,
            matched_objects,
            confidence,
            suggestions,
            basis: MatchBasis::Evaluated,
        }
    }

    /// Classifies `image` and scores it against the task.
    ///
    /// The classifier is not contacted when the task implies no keywords.
    ///
    /// # Errors
    ///
    /// Propagates classification failures.
    pub async fn verify(
        &self,
        task: &TaskSnapshot,
        kind: CheckpointKind,
        image: &[u8],
    ) -> ClassificationResult<MatchResult> {
        let keywords = self.task_keywords(task, kind);
        if keywords.is_empty() {
            debug!(task_id = %task.id(), checkpoint = %kind, "no keywords required, proof accepted");
            return Ok(MatchResult::no_keywords_required());
        }

        let labels = self.client.recognize(image).await?;
        let result = self.evaluate(&keywords, &labels);
        debug!(
            task_id = %task.id(),
            checkpoint = %kind,
            matched = result.matched,
            keywords = ?keywords,
            labels = labels.len(),
            "proof evaluated"
        );
        Ok(result)
    }

    fn label_matches(&self, label: &str, candidates: &[String]) -> bool {
        candidates.iter().any(|candidate| {
            label.contains(candidate.as_str())
                || candidate.contains(label)
                || (self.settings.allow_character_overlap && shares_character(label, candidate))
        })
    }
}

fn shares_character(left: &str, right: &str) -> bool {
    let letters: HashSet<char> = left.chars().filter(|c| c.is_alphanumeric()).collect();
    right.chars().any(|c| letters.contains(&c))
}

#[expect(
    clippy::float_arithmetic,
    reason = "confidence is a ratio in [0, 1]"
)]
fn ratio(part: usize, whole: usize) -> f64 {
    let to_f64 = |value: usize| f64::from(u32::try_from(value).unwrap_or(u32::MAX));
    to_f64(part) / to_f64(whole)
}
