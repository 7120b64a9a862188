//! Proofgate: photo-proof verification for scheduled tasks.
//!
//! A task must be proven twice, once when it starts and once when it ends,
//! by a photo whose recognised content matches what the task is about. This
//! crate implements the engine behind that workflow: it notices when a task
//! crosses a scheduled boundary, opens a timed proof window, classifies
//! submitted photos through an external recognition service, pays rewards
//! and deducts penalties, and persists checkpoint progress so restarts never
//! repeat a passed checkpoint.
//!
//! # Architecture
//!
//! Proofgate follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (HTTP, files, memory)
//!
//! # Modules
//!
//! - [`classification`]: Access tokens and image recognition
//! - [`verification`]: Checkpoint state, countdowns, matching and lifecycle
//! - [`clock`]: Manually driven clock for deterministic scheduling

pub mod classification;
pub mod clock;
pub mod verification;
