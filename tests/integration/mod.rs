//! Integration tests for bridgetape
//!
//! These tests drive instrumented fixtures through recording, cache building,
//! and replay, and check the transformer against the checked-in rewrites.

#[path = "../common/mod.rs"]
pub mod common;

// Checked-in output of the transformer, compiled as ordinary modules.
#[path = "../fixtures/greeter_mocked.rs"]
pub mod greeter_mocked;
#[path = "../fixtures/greeter_traced.rs"]
pub mod greeter_traced;
#[path = "../fixtures/sequences_traced.rs"]
pub mod sequences_traced;

pub mod record_replay;
pub mod sequences;
