use std::path::PathBuf;

use crate::trace::CallShape;

/// Error type for source transformation.
#[derive(Debug, thiserror::Error)]
pub enum TransformError {
    /// The source text is not a valid Rust file.
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: syn::Error,
    },

    /// The mock variant was asked to rewrite a non-sync declaration.
    #[error("Cannot mock {name}: {shape} declarations are not supported")]
    UnsupportedShape { name: String, shape: CallShape },

    /// The configured runtime path is not a Rust path.
    #[error("Invalid runtime path {path:?}: {source}")]
    RuntimePath {
        path: String,
        #[source]
        source: syn::Error,
    },

    /// Reading or writing a source file failed.
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
