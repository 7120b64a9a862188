//! Domain model for proof verification.
//!
//! Tasks are owned by an external directory and seen here as read-mostly
//! snapshots. Checkpoint state, reward arithmetic, the keyword synonym table
//! and match results are owned by this context and carry no infrastructure
//! concerns.

mod checkpoint;
mod error;
mod events;
mod ids;
mod matching;
mod reward;
mod synonyms;
mod task;

pub use checkpoint::{
    CheckpointKind, CheckpointPatch, CheckpointPhase, CheckpointState, PersistedCheckpoint,
    PersistedSettlement, Settlement,
};
pub use error::{
    ParseCheckpointKindError, ParseCheckpointPhaseError, ParseTaskStatusError,
    VerificationDomainError,
};
pub use events::{StateChange, VerificationEvent, VerificationPrompt};
pub use ids::TaskId;
pub use matching::{MatchBasis, MatchResult, Suggestion};
pub use reward::RewardSchedule;
pub use synonyms::KeywordSynonymTable;
pub(crate) use synonyms::normalize;
pub use task::{CheckpointRequirement, TaskSnapshot, TaskStatus, TaskStatusUpdate};
