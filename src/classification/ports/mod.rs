//! Port contracts for image classification.
//!
//! Ports define infrastructure-agnostic interfaces used by classification
//! services.

pub mod classifier;

pub use classifier::ImageClassifier;
