//! Parsing and printing of Rust source files.

use std::path::Path;

use crate::transform::error::TransformError;

pub fn parse(path: &Path, text: &str) -> Result<syn::File, TransformError> {
    syn::parse_file(text).map_err(|source| TransformError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

pub fn print(file: &syn::File) -> String {
    prettyplease::unparse(file)
}

pub fn read(path: &Path) -> Result<String, TransformError> {
    std::fs::read_to_string(path).map_err(|source| TransformError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn write(path: &Path, text: &str) -> Result<(), TransformError> {
    std::fs::write(path, text).map_err(|source| TransformError::Io {
        path: path.to_path_buf(),
        source,
    })
}
