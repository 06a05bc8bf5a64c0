//! Errors raised while writing or reading trace record streams.

use std::path::PathBuf;

/// Error type for trace stream I/O.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// The stream file could not be opened or created.
    #[error("Failed to open trace stream {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A line could not be read from an open stream.
    #[error("Failed to read trace stream: {0}")]
    Read(#[source] std::io::Error),

    /// A record could not be appended.
    #[error("Failed to write trace record: {0}")]
    Write(#[from] std::io::Error),

    /// A line is not a valid trace record.
    #[error("Invalid trace record on line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized.
    #[error("Failed to encode trace record: {0}")]
    Encode(#[source] serde_json::Error),
}
