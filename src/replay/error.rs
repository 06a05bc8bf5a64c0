//! Errors raised while building behavior caches and replaying recorded calls.

use std::path::PathBuf;

use crate::trace::error::StreamError;

/// Failure of a mocked call.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The cache holds no behavior for this call position.
    #[error("No recorded behavior for {function} in {source_path} (run {run_id}, call #{index})")]
    BehaviorNotFound {
        source_path: String,
        function: String,
        run_id: String,
        index: usize,
    },

    /// The call passed a different number of arguments than were recorded.
    #[error("Argument count mismatch for {function} (call #{index}): expected {expected}, got {actual}")]
    ArgumentCount {
        function: String,
        index: usize,
        expected: usize,
        actual: usize,
    },

    /// The call passed different arguments than were recorded.
    #[error("Argument mismatch for {function} (call #{index}): expected {expected}, got {actual}")]
    ArgumentMismatch {
        function: String,
        index: usize,
        expected: String,
        actual: String,
    },

    /// The recorded result does not deserialize into the declared return type.
    #[error("Recorded result for {function} does not match its return type: {source}")]
    ResultDecode {
        function: String,
        #[source]
        source: serde_json::Error,
    },

    /// Mocked code ran without an installed mocker.
    #[error("No mocker installed while calling {function}")]
    NoMocker { function: String },
}

impl ReplayError {
    /// True for the two argument verification failures.
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            ReplayError::ArgumentCount { .. } | ReplayError::ArgumentMismatch { .. }
        )
    }
}

/// Failure while building, reading, or writing a behavior cache.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid trace record in {path} on line {line}: {source}")]
    Decode {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid behavior cache {path}: {source}")]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode behavior cache: {0}")]
    Encode(#[source] serde_json::Error),
}

impl CacheError {
    pub(crate) fn from_stream(path: PathBuf, err: StreamError) -> Self {
        match err {
            StreamError::Io { path, source } => CacheError::Io { path, source },
            StreamError::Read(source) | StreamError::Write(source) => {
                CacheError::Io { path, source }
            }
            StreamError::Decode { line, source } => CacheError::Decode { path, line, source },
            StreamError::Encode(source) => CacheError::Encode(source),
        }
    }
}
