//! Adapter implementations of the verification ports.

pub mod file;
pub mod memory;
