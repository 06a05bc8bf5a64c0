//! Shared test utilities for bridgetape
//!
//! This module provides common helpers for integration tests:
//! - Deterministic run ids
//! - Fixture sources and the trace streams recorded from them

pub mod determinism;
pub mod fixtures;

pub use determinism::DeterministicRunIds;
pub use fixtures::{fixture_path, read_fixture, recorded, replaying, tokens};
