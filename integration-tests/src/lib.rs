//! Shared models for the trajopt integration tests.

pub mod test_components;
