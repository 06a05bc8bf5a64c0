use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::trace::error::StreamError;

/// How a wrapped declaration is invoked, derived from its async and generator flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallShape {
    SyncFunction,
    AsyncFunction,
    SyncGenerator,
    AsyncGenerator,
}

impl CallShape {
    pub fn from_flags(is_async: bool, is_generator: bool) -> Self {
        match (is_async, is_generator) {
            (false, false) => CallShape::SyncFunction,
            (true, false) => CallShape::AsyncFunction,
            (false, true) => CallShape::SyncGenerator,
            (true, true) => CallShape::AsyncGenerator,
        }
    }

    /// Message prefix used by trace records of this shape.
    pub fn prefix(self) -> &'static str {
        match self {
            CallShape::SyncFunction => "sync.func",
            CallShape::AsyncFunction => "async.func",
            CallShape::SyncGenerator => "sync.gen",
            CallShape::AsyncGenerator => "async.gen",
        }
    }

    pub fn is_generator(self) -> bool {
        matches!(self, CallShape::SyncGenerator | CallShape::AsyncGenerator)
    }
}

impl fmt::Display for CallShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CallShape::SyncFunction => "sync-function",
            CallShape::AsyncFunction => "async-function",
            CallShape::SyncGenerator => "sync-generator",
            CallShape::AsyncGenerator => "async-generator",
        };
        f.write_str(name)
    }
}

/// Generator lifecycle step a record describes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StepContext {
    Init,
    Next,
    Throw,
    Return,
}

impl StepContext {
    fn as_str(self) -> &'static str {
        match self {
            StepContext::Init => "init",
            StepContext::Next => "next",
            StepContext::Throw => "throw",
            StepContext::Return => "return",
        }
    }
}

/// Logical event a hook observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceEvent {
    Return,
    Error,
    Init,
    StepReturn(StepContext),
    StepError(StepContext),
}

/// Builds `<shape prefix>.<name>.<event>`, e.g. `sync.gen.numbers.next.return`.
pub fn message(shape: CallShape, name: &str, event: TraceEvent) -> String {
    let prefix = shape.prefix();
    match event {
        TraceEvent::Return => format!("{prefix}.{name}.return"),
        TraceEvent::Error => format!("{prefix}.{name}.error"),
        TraceEvent::Init => format!("{prefix}.{name}.init"),
        TraceEvent::StepReturn(ctx) => format!("{prefix}.{name}.{}.return", ctx.as_str()),
        TraceEvent::StepError(ctx) => format!("{prefix}.{name}.{}.error", ctx.as_str()),
    }
}

/// One observation emitted by a trace hook. Serialized as a single JSONL line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceRecord {
    #[serde(rename = "runID")]
    pub run_id: String,
    /// Milliseconds since the Unix epoch.
    pub time: i64,
    pub message: String,
    #[serde(rename = "sourcePath")]
    pub source_path: String,
    #[serde(rename = "functionName")]
    pub function_name: String,
    pub data: TraceData,
}

/// Payload of a [`TraceRecord`].
///
/// Function events carry `args` and exactly one of `result` or `error`.
/// Generator steps carry a `context` plus either `value`/`done` or `error`.
/// `result` and `value` keep an explicit `null` distinct from an absent field,
/// so a unit-returning call still reads back as a return record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TraceData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<StepContext>,
    #[serde(default)]
    pub args: Value,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub result: Option<Value>,
    #[serde(
        default,
        alias = "err",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub error: Option<Value>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present"
    )]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub done: Option<bool>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl TraceData {
    pub fn returned(args: Value, result: Value) -> Self {
        Self {
            args,
            result: Some(result),
            ..Self::default()
        }
    }

    pub fn failed(args: Value, error: Value) -> Self {
        Self {
            args,
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn init(args: Value) -> Self {
        Self {
            context: Some(StepContext::Init),
            args,
            ..Self::default()
        }
    }

    pub fn step(context: StepContext, value: Value, done: bool) -> Self {
        Self {
            context: Some(context),
            value: Some(value),
            done: Some(done),
            ..Self::default()
        }
    }

    pub fn step_failed(context: StepContext, error: Value) -> Self {
        Self {
            context: Some(context),
            error: Some(error),
            ..Self::default()
        }
    }

    /// True for function return records, the only ones that become behaviors.
    pub fn is_function_return(&self) -> bool {
        self.context.is_none() && self.result.is_some()
    }
}

impl TraceRecord {
    pub fn to_jsonl(&self) -> Result<String, StreamError> {
        serde_json::to_string(self).map_err(StreamError::Encode)
    }
}

/// Reads trace records one JSON line at a time, skipping blank lines.
pub struct TraceReader<R> {
    lines: std::io::Lines<R>,
    line: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line: 0,
        }
    }
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, StreamError> {
        let file = File::open(path).map_err(|source| StreamError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord, StreamError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(err) => return Some(Err(StreamError::Read(err))),
            };
            self.line += 1;
            if line.trim().is_empty() {
                continue;
            }
            let line_no = self.line;
            return Some(
                serde_json::from_str(&line)
                    .map_err(|source| StreamError::Decode { line: line_no, source }),
            );
        }
    }
}
