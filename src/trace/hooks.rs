//! Trace hooks: run the original definition and record what it did.

use std::any::Any;
use std::fmt::Display;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::{FutureExt, Stream};
use serde::Serialize;
use serde_json::Value;

use crate::runtime::values::{capture, Returned};
use crate::runtime::RunContext;
use crate::trace::iter::{TracedIter, TracedStream};
use crate::trace::record::{message, CallShape, TraceData, TraceEvent, TraceRecord};
use crate::trace::sink::TraceSink;

/// Error text recorded when an async call is dropped before it completes.
pub const CANCELLED: &str = "cancelled";

/// What a traced call produced, split into a recorded result or a recorded error.
///
/// `Result` outcomes record `Err` as an error and hand the `Err` back untouched.
/// Plain values are wrapped in [`Returned`] by the instrumented code.
pub trait Outcome {
    fn observe(&self) -> Result<Value, Value>;
}

impl<T: Serialize, E: Display> Outcome for Result<T, E> {
    fn observe(&self) -> Result<Value, Value> {
        match self {
            Ok(value) => Ok(capture(value)),
            Err(err) => Err(Value::String(err.to_string())),
        }
    }
}

impl<T: Serialize> Outcome for Returned<T> {
    fn observe(&self) -> Result<Value, Value> {
        Ok(capture(&self.0))
    }
}

/// Records calls of instrumented functions into a [`TraceSink`].
#[derive(Clone)]
pub struct Tracer {
    sink: Arc<dyn TraceSink>,
    run: RunContext,
}

impl Tracer {
    pub fn new(sink: Arc<dyn TraceSink>, run: RunContext) -> Self {
        Self { sink, run }
    }

    pub fn run(&self) -> &RunContext {
        &self.run
    }

    pub(crate) fn call_site(&self, shape: CallShape, name: &str, path: &str) -> CallSite {
        CallSite {
            tracer: self.clone(),
            shape,
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    fn emit(&self, record: TraceRecord) {
        tracing::debug!(
            message = %record.message,
            run_id = %record.run_id,
            "Emitting trace record"
        );
        if let Err(err) = self.sink.append(&record) {
            tracing::warn!(
                error = %err,
                message = %record.message,
                "Failed to append trace record"
            );
        }
    }

    /// Trace a synchronous call.
    ///
    /// A panic inside `call` is recorded as an error and then resumed with its
    /// original payload.
    pub fn trace_sync<R, F>(&self, name: &str, path: &str, args: Vec<Value>, call: F) -> R
    where
        R: Outcome,
        F: FnOnce() -> R,
    {
        let site = self.call_site(CallShape::SyncFunction, name, path);
        let args = Value::Array(args);
        match panic::catch_unwind(AssertUnwindSafe(call)) {
            Ok(outcome) => {
                site.finish(args, outcome.observe());
                outcome
            }
            Err(payload) => {
                site.emit(
                    TraceEvent::Error,
                    TraceData::failed(args, panic_value(&*payload)),
                );
                panic::resume_unwind(payload)
            }
        }
    }

    /// Trace an asynchronous call. Dropping the returned future before it
    /// completes records a single `cancelled` error.
    pub async fn trace_async<F>(&self, name: &str, path: &str, args: Vec<Value>, fut: F) -> F::Output
    where
        F: Future,
        F::Output: Outcome,
    {
        let mut pending = PendingCall {
            site: self.call_site(CallShape::AsyncFunction, name, path),
            args: Some(Value::Array(args)),
        };
        let polled = AssertUnwindSafe(fut).catch_unwind().await;
        let args = pending.args.take().unwrap_or(Value::Null);
        match polled {
            Ok(outcome) => {
                pending.site.finish(args, outcome.observe());
                outcome
            }
            Err(payload) => {
                pending.site.emit(
                    TraceEvent::Error,
                    TraceData::failed(args, panic_value(&*payload)),
                );
                panic::resume_unwind(payload)
            }
        }
    }

    /// Trace a function returning an iterator. `make` constructs the iterator;
    /// every step of the returned [`TracedIter`] is recorded.
    pub fn trace_iter<I, F>(&self, name: &str, path: &str, args: Vec<Value>, make: F) -> TracedIter<I>
    where
        I: Iterator,
        I::Item: Serialize,
        F: FnOnce() -> I,
    {
        let site = self.call_site(CallShape::SyncGenerator, name, path);
        let inner = site.construct(args, make);
        TracedIter::new(inner, Some(site))
    }

    /// Trace a function returning a stream, the async counterpart of [`Tracer::trace_iter`].
    pub fn trace_stream<S, F>(&self, name: &str, path: &str, args: Vec<Value>, make: F) -> TracedStream<S>
    where
        S: Stream,
        S::Item: Serialize,
        F: FnOnce() -> S,
    {
        let site = self.call_site(CallShape::AsyncGenerator, name, path);
        let inner = site.construct(args, make);
        TracedStream::new(inner, Some(site))
    }
}

/// One instrumented declaration as seen by a tracer.
pub(crate) struct CallSite {
    tracer: Tracer,
    shape: CallShape,
    name: String,
    path: String,
}

impl CallSite {
    pub(crate) fn emit(&self, event: TraceEvent, data: TraceData) {
        self.tracer.emit(TraceRecord {
            run_id: self.tracer.run.get(),
            time: chrono::Utc::now().timestamp_millis(),
            message: message(self.shape, &self.name, event),
            source_path: self.path.clone(),
            function_name: self.name.clone(),
            data,
        });
    }

    fn finish(&self, args: Value, observed: Result<Value, Value>) {
        match observed {
            Ok(result) => self.emit(TraceEvent::Return, TraceData::returned(args, result)),
            Err(error) => self.emit(TraceEvent::Error, TraceData::failed(args, error)),
        }
    }

    /// Record `init`, then build the generator. A panicking constructor is
    /// recorded as a function error and resumed.
    fn construct<T>(&self, args: Vec<Value>, make: impl FnOnce() -> T) -> T {
        let args = Value::Array(args);
        self.emit(TraceEvent::Init, TraceData::init(args.clone()));
        match panic::catch_unwind(AssertUnwindSafe(make)) {
            Ok(inner) => inner,
            Err(payload) => {
                self.emit(
                    TraceEvent::Error,
                    TraceData::failed(args, panic_value(&*payload)),
                );
                panic::resume_unwind(payload)
            }
        }
    }
}

struct PendingCall {
    site: CallSite,
    args: Option<Value>,
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        if let Some(args) = self.args.take() {
            self.site.emit(
                TraceEvent::Error,
                TraceData::failed(args, Value::String(CANCELLED.to_string())),
            );
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_value(payload: &(dyn Any + Send)) -> Value {
    let text = if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else if let Some(err) = payload.downcast_ref::<crate::replay::ReplayError>() {
        err.to_string()
    } else {
        "panic".to_string()
    };
    Value::String(text)
}
