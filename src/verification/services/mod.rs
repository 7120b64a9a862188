//! Orchestration services for proof verification.
//!
//! Dependency order, leaves first: the classification client feeds the
//! [`ProofMatcher`]; the [`CountdownEngine`] and [`VerificationStateStore`]
//! hold timing and durable state; the [`VerificationManager`] ties them to
//! the ports; the [`VerificationRuntime`] drives the manager on tokio.

mod countdown;
mod manager;
mod matcher;
mod outcome;
mod runtime;
mod settings;
mod state_store;
mod subscriptions;

pub use countdown::{CountdownEngine, CountdownExpired};
pub use manager::{PollReport, VerificationError, VerificationManager, VerificationPorts};
pub use matcher::{MatcherSettings, ProofMatcher};
pub use outcome::{ProofFailure, ProofOutcome};
pub use runtime::{ProofSubmitted, ProofSubmitter, VerificationRuntime};
pub use settings::VerificationSettings;
pub use state_store::{StateStoreError, VerificationStateStore};
pub use subscriptions::SubscriptionId;
