//! Results returned to callers of the verification engine.

use crate::classification::domain::ClassificationError;
use crate::verification::domain::{CheckpointKind, MatchResult, Suggestion, TaskId};

/// Why a proof submission did not pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProofFailure {
    /// Another submission for the task is still being evaluated.
    InFlight,
    /// The task is not waiting for proof at this checkpoint.
    NotAwaitingProof,
    /// The classification service could not be used.
    Classification(ClassificationError),
    /// The photo did not show anything the task requires.
    NoMatch,
    /// The task was cancelled or reset while the photo was being evaluated.
    Discarded,
}

/// Answer to a proof submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofOutcome {
    /// `true` when the checkpoint was passed.
    pub success: bool,
    /// Human-readable explanation.
    pub reason: String,
    /// Keywords the photo satisfied.
    pub matched_keywords: Vec<String>,
    /// Recognised labels that satisfied them.
    pub matched_objects: Vec<String>,
    /// Hints for keywords the photo did not satisfy.
    pub suggestions: Vec<Suggestion>,
    /// Share of keywords satisfied.
    pub confidence: f64,
    /// Gold deposited as a result.
    pub reward: u64,
    /// Failure kind, absent on success.
    pub failure: Option<ProofFailure>,
    /// Machine-readable detail for logs and bug reports.
    pub debug: Option<String>,
}

impl ProofOutcome {
    pub(crate) fn passed(kind: CheckpointKind, result: MatchResult, reward: u64) -> Self {
        let reason = if result.matched_keywords.is_empty() {
            format!("{kind} proof accepted")
        } else {
            format!(
                "{kind} proof accepted, recognised {}",
                result.matched_keywords.join(", ")
            )
        };
        Self {
            success: true,
            reason,
            matched_keywords: result.matched_keywords,
            matched_objects: result.matched_objects,
            suggestions: result.suggestions,
            confidence: result.confidence,
            reward,
            failure: None,
            debug: Some(format!("basis={:?}", result.basis)),
        }
    }

    pub(crate) fn no_match(result: MatchResult) -> Self {
        let hints: Vec<String> = result.suggestions.iter().map(ToString::to_string).collect();
        let reason = if hints.is_empty() {
            "photo does not show what the task requires".to_owned()
        } else {
            format!("photo does not show what the task requires; {}", hints.join("; "))
        };
        Self {
            success: false,
            reason,
            matched_keywords: result.matched_keywords,
            matched_objects: result.matched_objects,
            suggestions: result.suggestions,
            confidence: result.confidence,
            reward: 0,
            failure: Some(ProofFailure::NoMatch),
            debug: None,
        }
    }

    pub(crate) fn classification(error: &ClassificationError) -> Self {
        Self::failed(
            ProofFailure::Classification(error.clone()),
            format!("{error}. {}", error.remediation()),
            Some(format!("{error:?}")),
        )
    }

    pub(crate) fn in_flight(task_id: TaskId) -> Self {
        Self::failed(
            ProofFailure::InFlight,
            "a photo for this task is already being checked".to_owned(),
            Some(format!("task_id={task_id}")),
        )
    }

    pub(crate) fn not_awaiting(task_id: TaskId, kind: CheckpointKind) -> Self {
        Self::failed(
            ProofFailure::NotAwaitingProof,
            format!("task is not waiting for {kind} proof"),
            Some(format!("task_id={task_id}")),
        )
    }

    pub(crate) fn discarded(task_id: TaskId) -> Self {
        Self::failed(
            ProofFailure::Discarded,
            "task was cancelled while the photo was being checked".to_owned(),
            Some(format!("task_id={task_id}")),
        )
    }

    fn failed(failure: ProofFailure, reason: String, debug: Option<String>) -> Self {
        Self {
            success: false,
            reason,
            matched_keywords: Vec::new(),
            matched_objects: Vec::new(),
            suggestions: Vec::new(),
            confidence: 0.0,
            reward: 0,
            failure: Some(failure),
            debug,
        }
    }
}
