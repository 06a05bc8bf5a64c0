//! Iterator and stream wrappers that record each generator step.

use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use serde::Serialize;
use serde_json::Value;

use crate::runtime::values::capture;
use crate::trace::hooks::{panic_value, CallSite};
use crate::trace::record::{StepContext, TraceData, TraceEvent};

/// Records one generator step outcome.
fn record_step<T: Serialize>(site: &CallSite, item: Option<&T>) {
    let data = match item {
        Some(item) => TraceData::step(StepContext::Next, capture(item), false),
        None => TraceData::step(StepContext::Next, Value::Null, true),
    };
    site.emit(TraceEvent::StepReturn(StepContext::Next), data);
}

fn record_step_panic(site: &CallSite, payload: &(dyn std::any::Any + Send)) {
    site.emit(
        TraceEvent::StepError(StepContext::Next),
        TraceData::step_failed(StepContext::Next, panic_value(payload)),
    );
}

/// Dropped before exhaustion: the consumer returned early.
fn record_early_return(site: &CallSite) {
    site.emit(
        TraceEvent::StepReturn(StepContext::Return),
        TraceData::step(StepContext::Return, Value::Null, true),
    );
}

/// Iterator returned by a traced sync generator.
///
/// Without a call site (no tracer installed) it forwards to the inner iterator.
pub struct TracedIter<I> {
    inner: I,
    site: Option<CallSite>,
    finished: bool,
}

impl<I> TracedIter<I> {
    pub(crate) fn new(inner: I, site: Option<CallSite>) -> Self {
        Self {
            inner,
            site,
            finished: false,
        }
    }

    /// Pass-through wrapper that records nothing.
    pub fn untraced(inner: I) -> Self {
        Self::new(inner, None)
    }
}

impl<I> Iterator for TracedIter<I>
where
    I: Iterator,
    I::Item: Serialize,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<Self::Item> {
        let site = match &self.site {
            Some(site) if !self.finished => site,
            _ => return self.inner.next(),
        };
        let inner = &mut self.inner;
        match panic::catch_unwind(AssertUnwindSafe(|| inner.next())) {
            Ok(item) => {
                record_step(site, item.as_ref());
                if item.is_none() {
                    self.finished = true;
                }
                item
            }
            Err(payload) => {
                self.finished = true;
                record_step_panic(site, &*payload);
                panic::resume_unwind(payload)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<I> Drop for TracedIter<I> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(site) = &self.site {
            record_early_return(site);
        }
    }
}

/// Stream returned by a traced async generator.
pub struct TracedStream<S> {
    inner: Pin<Box<S>>,
    site: Option<CallSite>,
    finished: bool,
}

impl<S> TracedStream<S> {
    pub(crate) fn new(inner: S, site: Option<CallSite>) -> Self {
        Self {
            inner: Box::pin(inner),
            site,
            finished: false,
        }
    }

    pub fn untraced(inner: S) -> Self {
        Self::new(inner, None)
    }
}

impl<S> Stream for TracedStream<S>
where
    S: Stream,
    S::Item: Serialize,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let site = match &this.site {
            Some(site) if !this.finished => site,
            _ => return this.inner.as_mut().poll_next(cx),
        };
        let inner = &mut this.inner;
        match panic::catch_unwind(AssertUnwindSafe(|| inner.as_mut().poll_next(cx))) {
            Ok(Poll::Pending) => Poll::Pending,
            Ok(Poll::Ready(item)) => {
                record_step(site, item.as_ref());
                if item.is_none() {
                    this.finished = true;
                }
                Poll::Ready(item)
            }
            Err(payload) => {
                this.finished = true;
                record_step_panic(site, &*payload);
                panic::resume_unwind(payload)
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<S> Drop for TracedStream<S> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Some(site) = &self.site {
            record_early_return(site);
        }
    }
}
