pub mod config;
pub mod replay;
pub mod runtime;
pub mod trace;
pub mod transform;

pub use config::{Config, Mode};
pub use replay::{Behavior, BehaviorCache, Mocker, ReplayError};
pub use runtime::{RunContext, Session};
pub use trace::{TraceRecord, TraceSink, TraceWriter, Tracer};
pub use transform::{TransformOptions, Transformer, Variant};
