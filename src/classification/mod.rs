//! Image classification for proof submissions.
//!
//! This module wraps an external image-recognition service behind the
//! [`ports::ImageClassifier`] contract: obtaining and caching bearer tokens,
//! submitting raw image bytes, and surfacing network, authentication and
//! payload failures as distinct error kinds. The module follows hexagonal
//! architecture:
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
