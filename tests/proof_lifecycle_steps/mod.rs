//! Step definitions for proof lifecycle scenarios.

pub mod world;

mod given;
mod then;
mod when;
