//! Labels recognised in a submitted image.

use serde::{Deserialize, Serialize};

/// A label returned by the classifier with its confidence score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedLabel {
    label: String,
    score: f64,
    category: Option<String>,
}

impl RecognizedLabel {
    /// Creates a recognised label.
    #[must_use]
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
            category: None,
        }
    }

    /// Sets the classifier's category for the label.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Returns the label text.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the confidence score reported by the classifier.
    #[must_use]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Returns the classifier category, if reported.
    #[must_use]
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }
}

/// Orders labels by descending score.
pub(crate) fn rank_labels(labels: &mut [RecognizedLabel]) {
    labels.sort_by(|left, right| right.score.total_cmp(&left.score));
}
