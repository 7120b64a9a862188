//! Unit tests for the classification context.
