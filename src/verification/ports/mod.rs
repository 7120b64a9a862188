//! Port contracts for proof verification.
//!
//! Ports define the narrow interfaces through which the verification engine
//! reaches the task directory, the currency ledger, the operator's screen and
//! durable checkpoint storage.

pub mod checkpoints;
pub mod ledger;
pub mod notifier;
pub mod tasks;

pub use checkpoints::{
    CheckpointRepository, CheckpointRepositoryError, CheckpointRepositoryResult,
};
pub use ledger::{Ledger, LedgerError, LedgerResult};
pub use notifier::{Notifier, NotifierError, NotifierResult};
pub use tasks::{TaskDirectory, TaskDirectoryError, TaskDirectoryResult};
