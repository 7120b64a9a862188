//! Unit tests for the verification module.
//!
//! Tests are organised by component, from domain arithmetic up to the
//! manager's lifecycle handling.

mod state_store_tests;
mod support;
