//! In-memory adapters for tests and embedding.

mod checkpoints;
mod ledger;
mod notifier;
mod tasks;

pub use checkpoints::InMemoryCheckpointRepository;
pub use ledger::{InMemoryLedger, LedgerEntry, LedgerEntryKind};
pub use notifier::RecordingNotifier;
pub use tasks::InMemoryTaskDirectory;
