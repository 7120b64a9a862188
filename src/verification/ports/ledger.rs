//! Currency ledger port.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Gold ledger that rewards are paid into and penalties taken from.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Adds `amount` gold, recording `reason`.
    async fn deposit(&self, amount: u64, reason: &str) -> LedgerResult<()>;

    /// Removes `amount` gold, recording `reason`.
    ///
    /// Whether the balance may go negative is up to the implementation.
    async fn withdraw(&self, amount: u64, reason: &str) -> LedgerResult<()>;
}

/// Errors returned by ledger implementations.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The ledger declined the operation.
    #[error("ledger declined {operation} of {amount}: {reason}")]
    Declined {
        /// `deposit` or `withdraw`.
        operation: &'static str,
        /// Amount requested.
        amount: u64,
        /// Explanation from the ledger.
        reason: String,
    },

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl LedgerError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
