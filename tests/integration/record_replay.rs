//! Integration tests for the record -> cache -> replay flow
//!
//! Traced fixture functions record into a trace stream, the stream is folded
//! into a behavior cache, and the mocked fixture functions answer from it.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use bridgetape::config::{Config, Mode};
use bridgetape::replay::{BehaviorCache, ReplayError};
use bridgetape::runtime::Session;
use bridgetape::trace::{TraceData, TraceReader, TraceRecord, TraceWriter};
use proptest::prelude::*;
use serde_json::json;
use tempfile::tempdir;

use super::common::{recorded, replaying, DeterministicRunIds};
use super::{greeter_mocked, greeter_traced};

const GREETER: &str = "tests/fixtures/greeter.rs";

/// Run a mocked call that must fail and return the error it raised.
fn replay_failure<T>(call: impl FnOnce() -> T) -> ReplayError {
    let payload = match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(_) => panic!("Replayed call should have failed"),
        Err(payload) => payload,
    };
    match payload.downcast::<ReplayError>() {
        Ok(err) => *err,
        Err(_) => panic!("Replay failure should carry a ReplayError payload"),
    }
}

/// Test that a recorded call is written to disk, cached, and replayed
#[test]
fn test_recorded_greeting_replays_from_cache_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let trace = dir.path().join("greeter.trace.log");
    let cache_file = dir.path().join("behaviors.json");

    {
        let writer = TraceWriter::create(&trace).expect("Failed to create trace stream");
        let session = Session::recording(Arc::new(writer));
        let _run = session.begin("rid1");
        assert_eq!(greeter_traced::greet("John"), "Hello, John!");
    }

    let records: Vec<TraceRecord> = TraceReader::open(&trace)
        .expect("Failed to open trace stream")
        .collect::<Result<_, _>>()
        .expect("Trace stream should decode");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].message, "sync.func.greet.return");
    assert_eq!(records[0].source_path, GREETER);

    let cache = BehaviorCache::from_streams(&[&trace]).expect("Failed to build cache");
    assert_eq!(
        serde_json::to_value(&cache).expect("Cache should serialize"),
        json!({
            GREETER: {
                "greet": {
                    "rid1": [{ "args": ["John"], "result": "Hello, John!" }]
                }
            }
        })
    );
    cache.save(&cache_file).expect("Failed to save cache");

    let config = Config {
        mode: Mode::Replay,
        cache_path: Some(cache_file),
        ..Config::default()
    };
    let session = Session::from_config(&config, None).expect("Failed to open replay session");
    let _run = session.begin("rid1");
    assert_eq!(greeter_mocked::greet("John"), "Hello, John!");
}

/// Test that replaying with different arguments reports both argument lists
#[test]
fn test_replay_with_different_argument_is_a_mismatch() {
    let records = recorded(&["rid1"], |_| {
        greeter_traced::greet("John");
    });
    let session = replaying(&records);
    let _run = session.begin("rid1");

    match replay_failure(|| greeter_mocked::greet("Jane")) {
        ReplayError::ArgumentMismatch {
            function,
            index,
            expected,
            actual,
        } => {
            assert_eq!(function, "greet");
            assert_eq!(index, 0);
            assert_eq!(expected, r#"["John"]"#);
            assert_eq!(actual, r#"["Jane"]"#);
        }
        other => panic!("Expected ArgumentMismatch, got {:?}", other),
    }
}

/// Test that a divergence is reported exactly at the call where it happens
#[test]
fn test_mismatch_is_reported_at_the_diverging_call() {
    let names = ["ada", "grace", "linus", "barbara"];
    let records = recorded(&["rid1"], |_| {
        for name in names {
            greeter_traced::greet(name);
        }
    });
    let session = replaying(&records);
    let _run = session.begin("rid1");

    assert_eq!(greeter_mocked::greet("ada"), "Hello, ada!");
    assert_eq!(greeter_mocked::greet("grace"), "Hello, grace!");
    match replay_failure(|| greeter_mocked::greet("ken")) {
        ReplayError::ArgumentMismatch { index, .. } => assert_eq!(index, 2),
        other => panic!("Expected ArgumentMismatch, got {:?}", other),
    }
    // The failed call still consumed its position.
    assert_eq!(greeter_mocked::greet("barbara"), "Hello, barbara!");
    match replay_failure(|| greeter_mocked::greet("barbara")) {
        ReplayError::BehaviorNotFound { index, run_id, .. } => {
            assert_eq!(index, 4);
            assert_eq!(run_id, "rid1");
        }
        other => panic!("Expected BehaviorNotFound, got {:?}", other),
    }
}

/// Test that switching the run id restarts replay from the first behavior
#[test]
fn test_run_switch_resets_the_cursor() {
    let records = recorded(&["rid1", "rid2"], |run| {
        if run.run_id() == "rid1" {
            greeter_traced::greet("a");
            greeter_traced::greet("b");
        } else {
            greeter_traced::greet("c");
        }
    });
    let session = replaying(&records);
    let run = session.begin("rid1");

    assert_eq!(greeter_mocked::greet("a"), "Hello, a!");
    run.context().set("rid2");
    assert_eq!(greeter_mocked::greet("c"), "Hello, c!");
    run.context().set("rid1");
    assert_eq!(greeter_mocked::greet("a"), "Hello, a!");
    assert_eq!(greeter_mocked::greet("b"), "Hello, b!");
}

/// Test that destructured parameters are recorded in their natural shape
#[test]
fn test_destructured_parameters_round_trip() {
    let point = greeter_traced::Point { x: 1, y: -2 };
    let records = recorded(&["rid1"], |_| {
        assert_eq!(greeter_traced::distance(point.clone(), (3, 9)), 6);
    });

    assert_eq!(records.len(), 1);
    let args = &records[0].data.args;
    assert_eq!(args[0], serde_json::to_value(&point).expect("Point should serialize"));
    assert_eq!(args[1], json!([3, null]));

    let session = replaying(&records);
    let _run = session.begin("rid1");
    let replayed = greeter_mocked::distance(greeter_mocked::Point { x: 1, y: -2 }, (3, 9));
    assert_eq!(replayed, 6);
}

/// Test that error outcomes are traced but never replayed
#[test]
fn test_errors_are_recorded_but_not_cached() {
    let records = recorded(&["rid1"], |_| {
        assert_eq!(greeter_traced::parse_port("8080"), Ok(8080));
        assert!(greeter_traced::parse_port("http").is_err());
    });

    let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(
        messages,
        vec!["sync.func.parse_port.return", "sync.func.parse_port.error"]
    );
    assert_eq!(records[1].data.error, Some(json!("invalid digit found in string")));

    let session = replaying(&records);
    let _run = session.begin("rid1");
    assert_eq!(greeter_mocked::parse_port("8080"), Ok(8080));
    assert!(matches!(
        replay_failure(|| greeter_mocked::parse_port("http")),
        ReplayError::BehaviorNotFound { index: 1, .. }
    ));
}

/// Test that a success recorded after an error takes the error's call position
#[test]
fn test_success_after_error_shifts_into_its_position() {
    let records = recorded(&["rid1"], |_| {
        assert!(greeter_traced::parse_port("http").is_err());
        assert_eq!(greeter_traced::parse_port("8080"), Ok(8080));
    });
    assert_eq!(records.len(), 2);

    let session = replaying(&records);
    {
        let _run = session.begin("rid1");
        assert_eq!(greeter_mocked::parse_port("8080"), Ok(8080));
        assert!(matches!(
            replay_failure(|| greeter_mocked::parse_port("8080")),
            ReplayError::BehaviorNotFound { index: 1, .. }
        ));
    }

    let _run = session.begin("rid1");
    match replay_failure(|| greeter_mocked::parse_port("http")) {
        ReplayError::ArgumentMismatch { index, .. } => assert_eq!(index, 0),
        other => panic!("Expected ArgumentMismatch, got {:?}", other),
    }
}

/// Test that a recorded result of the wrong type is a decode failure
#[test]
fn test_result_of_wrong_type_fails_to_decode() {
    let record = TraceRecord {
        run_id: "rid1".to_string(),
        time: 0,
        message: "sync.func.greet.return".to_string(),
        source_path: GREETER.to_string(),
        function_name: "greet".to_string(),
        data: TraceData::returned(json!(["John"]), json!(42)),
    };
    let session = replaying(&[record]);
    let _run = session.begin("rid1");

    match replay_failure(|| greeter_mocked::greet("John")) {
        ReplayError::ResultDecode { function, .. } => assert_eq!(function, "greet"),
        other => panic!("Expected ResultDecode, got {:?}", other),
    }
}

/// Test that mocked code without an installed session fails loudly
#[test]
fn test_mocked_call_without_session_fails() {
    assert!(matches!(
        replay_failure(|| greeter_mocked::greet("John")),
        ReplayError::NoMocker { .. }
    ));
}

/// Test that traced code runs normally with no session installed
#[test]
fn test_traced_call_without_session_runs_the_body() {
    assert_eq!(greeter_traced::greet("nobody"), "Hello, nobody!");
    assert_eq!(greeter_traced::untouched(), 7);
}

/// Test that each thread replays its own run independently
#[test]
fn test_threads_replay_their_own_runs() {
    let ids = DeterministicRunIds::new();
    let runs: Vec<String> = (0..4).map(|_| ids.next()).collect();
    let run_refs: Vec<&str> = runs.iter().map(String::as_str).collect();
    let records = recorded(&run_refs, |run| {
        let id = run.run_id();
        greeter_traced::greet(&id);
        greeter_traced::greet(&id);
    });
    let session = replaying(&records);

    std::thread::scope(|scope| {
        for run_id in &runs {
            let session = &session;
            scope.spawn(move || {
                let _run = session.begin(run_id.as_str());
                for _ in 0..2 {
                    assert_eq!(greeter_mocked::greet(run_id), format!("Hello, {run_id}!"));
                }
            });
        }
    });
}

/// Test that replaying the same run twice gives the same answers
#[test]
fn test_replay_is_deterministic() {
    let records = recorded(&["rid1"], |_| {
        greeter_traced::greet("x");
        greeter_traced::distance(greeter_traced::Point { x: 0, y: 0 }, (5, 0));
    });
    let session = replaying(&records);

    let replay_once = || {
        let _run = session.begin("rid1");
        (
            greeter_mocked::greet("x"),
            greeter_mocked::distance(greeter_mocked::Point { x: 0, y: 0 }, (5, 0)),
        )
    };
    assert_eq!(replay_once(), replay_once());
}

proptest! {
    /// N recorded calls become N behaviors in call order, and replay in that order.
    #[test]
    fn test_recorded_order_is_preserved(names in prop::collection::vec("[a-z]{1,8}", 1..12)) {
        let records = recorded(&["prop"], |_| {
            for name in &names {
                greeter_traced::greet(name);
            }
        });
        let cache = BehaviorCache::from_records(records.clone());
        let behaviors = cache
            .behaviors(GREETER, "greet", "prop")
            .expect("Behaviors should be cached");
        prop_assert_eq!(behaviors.len(), names.len());
        for (behavior, name) in behaviors.iter().zip(&names) {
            prop_assert_eq!(&behavior.args, &vec![json!(name)]);
        }

        let session = replaying(&records);
        let _run = session.begin("prop");
        for name in &names {
            prop_assert_eq!(greeter_mocked::greet(name), format!("Hello, {name}!"));
        }
    }
}
