//! Entry points called by instrumented code.
//!
//! Rewritten declarations call the free functions here. Each looks up the hook
//! installed on the current thread with [`install_tracer`] or [`install_mocker`]
//! and forwards to it. A thread with no hook of its own falls back to the most
//! recent process-wide hook ([`install_shared_tracer`], [`install_shared_mocker`]),
//! which is how calls on spawned tasks and worker threads reach the run. With no
//! tracer anywhere, traced code calls straight through to the original body.
//! Async hooks resolve the slot when the call starts.

mod context;
pub mod session;
pub mod values;

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use futures::Stream;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::replay::{Mocker, ReplayError};
use crate::trace::{Outcome, TracedIter, TracedStream, Tracer};

pub use context::RunContext;
pub use session::{RunGuard, Session, SessionError};
pub use values::{array, capture, hole, object, Returned};

thread_local! {
    static TRACER: RefCell<Option<Tracer>> = const { RefCell::new(None) };
    static MOCKER: RefCell<Option<Arc<Mocker>>> = const { RefCell::new(None) };
}

enum Previous {
    Tracer(Option<Tracer>),
    Mocker(Option<Arc<Mocker>>),
}

/// Restores the previously installed hook when dropped. Tied to the thread it
/// was created on.
#[must_use = "the hook is uninstalled when the guard is dropped"]
pub struct HookGuard {
    previous: Option<Previous>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for HookGuard {
    fn drop(&mut self) {
        match self.previous.take() {
            Some(Previous::Tracer(previous)) => TRACER.with(|slot| *slot.borrow_mut() = previous),
            Some(Previous::Mocker(previous)) => MOCKER.with(|slot| *slot.borrow_mut() = previous),
            None => {}
        }
    }
}

/// Route traced calls on this thread to `tracer` until the guard drops.
pub fn install_tracer(tracer: Tracer) -> HookGuard {
    let previous = TRACER.with(|slot| slot.borrow_mut().replace(tracer));
    HookGuard {
        previous: Some(Previous::Tracer(previous)),
        _not_send: PhantomData,
    }
}

/// Route mocked calls on this thread to `mocker` until the guard drops.
pub fn install_mocker(mocker: Arc<Mocker>) -> HookGuard {
    let previous = MOCKER.with(|slot| slot.borrow_mut().replace(mocker));
    HookGuard {
        previous: Some(Previous::Mocker(previous)),
        _not_send: PhantomData,
    }
}

type Shared<T> = Mutex<Vec<(u64, T)>>;

fn shared_tracers() -> &'static Shared<Tracer> {
    static CELL: OnceLock<Shared<Tracer>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(Vec::new()))
}

fn shared_mockers() -> &'static Shared<Arc<Mocker>> {
    static CELL: OnceLock<Shared<Arc<Mocker>>> = OnceLock::new();
    CELL.get_or_init(|| Mutex::new(Vec::new()))
}

fn next_shared_id() -> u64 {
    static NEXT: AtomicU64 = AtomicU64::new(1);
    NEXT.fetch_add(1, Ordering::Relaxed)
}

enum SharedSlot {
    Tracer,
    Mocker,
}

/// Removes a process-wide hook when dropped, from whichever thread drops it.
#[must_use = "the hook is uninstalled when the guard is dropped"]
pub struct SharedHookGuard {
    id: u64,
    slot: SharedSlot,
}

impl Drop for SharedHookGuard {
    fn drop(&mut self) {
        let id = self.id;
        match self.slot {
            SharedSlot::Tracer => shared_tracers().lock().retain(|(entry, _)| *entry != id),
            SharedSlot::Mocker => shared_mockers().lock().retain(|(entry, _)| *entry != id),
        }
    }
}

/// Route traced calls from threads without their own tracer to `tracer`
/// until the guard drops.
pub fn install_shared_tracer(tracer: Tracer) -> SharedHookGuard {
    let id = next_shared_id();
    shared_tracers().lock().push((id, tracer));
    SharedHookGuard {
        id,
        slot: SharedSlot::Tracer,
    }
}

/// Route mocked calls from threads without their own mocker to `mocker`
/// until the guard drops.
pub fn install_shared_mocker(mocker: Arc<Mocker>) -> SharedHookGuard {
    let id = next_shared_id();
    shared_mockers().lock().push((id, mocker));
    SharedHookGuard {
        id,
        slot: SharedSlot::Mocker,
    }
}

/// The tracer for calls on this thread: its own, else the latest shared one.
pub fn current_tracer() -> Option<Tracer> {
    TRACER
        .with(|slot| slot.borrow().clone())
        .or_else(|| shared_tracers().lock().last().map(|(_, tracer)| tracer.clone()))
}

pub fn current_mocker() -> Option<Arc<Mocker>> {
    MOCKER
        .with(|slot| slot.borrow().clone())
        .or_else(|| shared_mockers().lock().last().map(|(_, mocker)| mocker.clone()))
}

pub fn trace_sync<R, F>(name: &'static str, path: &'static str, args: Vec<Value>, call: F) -> R
where
    R: Outcome,
    F: FnOnce() -> R,
{
    match current_tracer() {
        Some(tracer) => tracer.trace_sync(name, path, args, call),
        None => call(),
    }
}

pub fn trace_async<F>(
    name: &'static str,
    path: &'static str,
    args: Vec<Value>,
    fut: F,
) -> impl Future<Output = F::Output>
where
    F: Future,
    F::Output: Outcome,
{
    let tracer = current_tracer();
    async move {
        match tracer {
            Some(tracer) => tracer.trace_async(name, path, args, fut).await,
            None => fut.await,
        }
    }
}

pub fn trace_iter<I, F>(name: &'static str, path: &'static str, args: Vec<Value>, make: F) -> TracedIter<I>
where
    I: Iterator,
    I::Item: Serialize,
    F: FnOnce() -> I,
{
    match current_tracer() {
        Some(tracer) => tracer.trace_iter(name, path, args, make),
        None => TracedIter::untraced(make()),
    }
}

pub fn trace_stream<S, F>(
    name: &'static str,
    path: &'static str,
    args: Vec<Value>,
    make: F,
) -> TracedStream<S>
where
    S: Stream,
    S::Item: Serialize,
    F: FnOnce() -> S,
{
    match current_tracer() {
        Some(tracer) => tracer.trace_stream(name, path, args, make),
        None => TracedStream::untraced(make()),
    }
}

/// Replay the next recorded result for a mocked call.
pub fn try_mock_sync<T: DeserializeOwned>(
    name: &str,
    path: &str,
    args: &[Value],
) -> Result<T, ReplayError> {
    match current_mocker() {
        Some(mocker) => mocker.mock_sync(name, path, args),
        None => Err(ReplayError::NoMocker {
            function: name.to_string(),
        }),
    }
}

/// [`try_mock_sync`] for generated code: a failure is raised as a panic whose
/// payload is the [`ReplayError`] itself.
pub fn mock_sync<T: DeserializeOwned>(name: &'static str, path: &'static str, args: Vec<Value>) -> T {
    match try_mock_sync(name, path, &args) {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = %err, function = name, "Replay failed");
            std::panic::panic_any(err)
        }
    }
}
