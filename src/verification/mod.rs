//! Photo-proof verification lifecycle.
//!
//! Every task passes two proof checkpoints: one when its scheduled start
//! arrives and one when its scheduled end arrives. Each checkpoint opens a
//! countdown, waits for a photo whose recognised content matches the task,
//! rewards a match and penalises every expiry of the countdown. Checkpoint
//! progress is persisted so that restarts never re-open a passed checkpoint.
//! The module follows hexagonal architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
