//! In-memory gold ledger.

use async_trait::async_trait;
use std::sync::{Arc, PoisonError, RwLock};

use crate::verification::ports::{Ledger, LedgerError, LedgerResult};

/// Direction of a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerEntryKind {
    /// Gold paid in.
    Deposit,
    /// Gold taken out.
    Withdrawal,
}

/// One recorded ledger operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    /// Direction.
    pub kind: LedgerEntryKind,
    /// Amount moved.
    pub amount: u64,
    /// Reason label supplied by the caller.
    pub reason: String,
}

/// Ledger that keeps every entry and allows a negative balance.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedger {
    entries: Arc<RwLock<Vec<LedgerEntry>>>,
    failing_operations: Arc<RwLock<u32>>,
}

impl InMemoryLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` deposits or withdrawals fail without
    /// recording anything.
    pub fn fail_next_operations(&self, count: u32) {
        *self
            .failing_operations
            .write()
            .unwrap_or_else(PoisonError::into_inner) = count;
    }

    /// Returns all entries in order.
    #[must_use]
    pub fn entries(&self) -> Vec<LedgerEntry> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the amounts of entries of one kind, in order.
    #[must_use]
    pub fn amounts(&self, kind: LedgerEntryKind) -> Vec<u64> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|entry| entry.kind == kind)
            .map(|entry| entry.amount)
            .collect()
    }

    /// Returns deposits minus withdrawals.
    #[must_use]
    pub fn balance(&self) -> i128 {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|entry| match entry.kind {
                LedgerEntryKind::Deposit => i128::from(entry.amount),
                LedgerEntryKind::Withdrawal => -i128::from(entry.amount),
            })
            .sum()
    }

    fn record(&self, kind: LedgerEntryKind, amount: u64, reason: &str) -> LedgerResult<()> {
        {
            let mut failing = self
                .failing_operations
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if *failing > 0 {
                *failing -= 1;
                return Err(LedgerError::Declined {
                    operation: match kind {
                        LedgerEntryKind::Deposit => "deposit",
                        LedgerEntryKind::Withdrawal => "withdraw",
                    },
                    amount,
                    reason: "injected ledger failure".to_owned(),
                });
            }
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LedgerEntry {
                kind,
                amount,
                reason: reason.to_owned(),
            });
        Ok(())
    }
}

#[async_trait]
impl Ledger for InMemoryLedger {
    async fn deposit(&self, amount: u64, reason: &str) -> LedgerResult<()> {
        self.record(LedgerEntryKind::Deposit, amount, reason)
    }

    async fn withdraw(&self, amount: u64, reason: &str) -> LedgerResult<()> {
        self.record(LedgerEntryKind::Withdrawal, amount, reason)
    }
}
