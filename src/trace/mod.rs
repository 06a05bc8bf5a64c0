//! Trace recording: the record format, sinks, and the hooks instrumented code calls.

pub mod error;
pub mod hooks;
pub mod iter;
pub mod record;
pub mod sink;

pub use error::StreamError;
pub use hooks::{Outcome, Tracer, CANCELLED};
pub use iter::{TracedIter, TracedStream};
pub use record::{CallShape, StepContext, TraceData, TraceEvent, TraceReader, TraceRecord};
pub use sink::{MemorySink, TraceSink, TraceWriter};
