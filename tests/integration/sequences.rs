//! Integration tests for traced generators, async functions, and bound closures

use std::sync::Arc;

use bridgetape::runtime::Session;
use bridgetape::trace::{MemorySink, StepContext};
use futures::StreamExt;
use serde_json::{json, Value};

use super::common::recorded;
use super::sequences_traced as traced;

/// Test that exhausting a traced iterator records init and every step
#[test]
fn test_exhausted_generator_records_each_step() {
    let records = recorded(&["rid1"], |_| {
        let values: Vec<u64> = traced::fibonacci(5).collect();
        assert_eq!(values, vec![0, 1, 1, 2, 3]);
    });

    let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(messages[0], "sync.gen.fibonacci.init");
    assert_eq!(messages.len(), 7);
    assert!(messages[1..]
        .iter()
        .all(|m| *m == "sync.gen.fibonacci.next.return"));

    assert_eq!(records[0].data.args, json!([5]));
    let steps: Vec<(Option<Value>, Option<bool>)> = records[1..]
        .iter()
        .map(|r| (r.data.value.clone(), r.data.done))
        .collect();
    assert_eq!(
        steps,
        vec![
            (Some(json!(0)), Some(false)),
            (Some(json!(1)), Some(false)),
            (Some(json!(1)), Some(false)),
            (Some(json!(2)), Some(false)),
            (Some(json!(3)), Some(false)),
            (Some(Value::Null), Some(true)),
        ]
    );
    assert!(records[1..]
        .iter()
        .all(|r| r.data.context == Some(StepContext::Next)));
}

/// Test that abandoning a traced iterator records an early return
#[test]
fn test_abandoned_generator_records_return() {
    let records = recorded(&["rid1"], |_| {
        let first: Vec<u64> = traced::fibonacci(10).take(2).collect();
        assert_eq!(first, vec![0, 1]);
    });

    let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "sync.gen.fibonacci.init",
            "sync.gen.fibonacci.next.return",
            "sync.gen.fibonacci.next.return",
            "sync.gen.fibonacci.return.return",
        ]
    );
    assert_eq!(records[3].data.context, Some(StepContext::Return));
}

/// Test that generator records never reach the behavior cache
#[test]
fn test_generator_records_are_not_behaviors() {
    let records = recorded(&["rid1"], |_| {
        traced::fibonacci(3).for_each(drop);
    });
    let cache = bridgetape::BehaviorCache::from_records(records);
    assert!(cache.is_empty());
}

/// Test that a bound closure is traced like a function
#[test]
fn test_bound_closure_is_traced() {
    let records = recorded(&["rid1"], |_| {
        assert_eq!((traced::SHOUT)("quiet"), "QUIET");
    });

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].function_name, "SHOUT");
    assert_eq!(records[0].message, "sync.func.SHOUT.return");
    assert_eq!(records[0].data.result, Some(json!("QUIET")));
}

/// Test that async functions record their resolved values and errors
#[tokio::test]
async fn test_async_functions_record_outcomes() {
    let sink = Arc::new(MemorySink::new());
    let session = Session::recording(sink.clone());

    {
        let _run = session.begin("async-run");
        assert_eq!(traced::double(21).await, 42);
        assert_eq!(traced::lookup(7).await, Ok("user-7".to_string()));
        assert_eq!(traced::lookup(0).await, Err("unknown id".to_string()));
    }

    let records = sink.records();
    let messages: Vec<_> = records.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "async.func.double.return",
            "async.func.lookup.return",
            "async.func.lookup.error",
        ]
    );
    assert!(records.iter().all(|r| r.run_id == "async-run"));
    assert_eq!(records[0].data.result, Some(json!(42)));
    assert_eq!(records[2].data.error, Some(json!("unknown id")));
}

/// Test that async generators record each step like sync ones
#[tokio::test]
async fn test_stream_records_each_step() {
    let sink = Arc::new(MemorySink::new());
    let session = Session::recording(sink.clone());

    {
        let _run = session.begin("stream-run");
        let values: Vec<u32> = traced::countdown(2).collect().await;
        assert_eq!(values, vec![2, 1, 0]);
    }

    let messages = sink.messages();
    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0], "async.gen.countdown.init");
    assert!(messages[1..]
        .iter()
        .all(|m| m == "async.gen.countdown.next.return"));
    assert_eq!(sink.records()[4].data.done, Some(true));
}
