//! Adapter implementations for the classification port.

pub mod http;
pub mod memory;
