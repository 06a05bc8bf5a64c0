//! Fixture sources and recording helpers

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridgetape::replay::BehaviorCache;
use bridgetape::runtime::{RunGuard, Session};
use bridgetape::trace::{MemorySink, TraceRecord};
use quote::ToTokens;

/// Absolute path of a file under `tests/fixtures`.
pub fn fixture_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|err| panic!("Failed to read fixture {name}: {err}"))
}

/// Token text of a syntax node; comments and layout do not matter.
pub fn tokens<T: ToTokens>(node: &T) -> String {
    node.to_token_stream().to_string()
}

/// Run `body` once per run id under a recording session and return every
/// record it produced, in order.
pub fn recorded<F>(run_ids: &[&str], mut body: F) -> Vec<TraceRecord>
where
    F: FnMut(&RunGuard),
{
    let sink = Arc::new(MemorySink::new());
    let session = Session::recording(sink.clone());
    for run_id in run_ids {
        let guard = session.begin(*run_id);
        body(&guard);
    }
    sink.records()
}

/// Replay session over the behaviors built from `records`.
pub fn replaying(records: &[TraceRecord]) -> Session {
    let cache = BehaviorCache::from_records(records.iter().cloned());
    Session::replaying(Arc::new(cache))
}
