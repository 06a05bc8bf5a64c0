//! Source transformation: rewrite tagged declarations so they call the trace
//! or mock hooks of [`crate::runtime`].
//!
//! The engine parses a file with `syn`, finds function-shaped declarations whose
//! doc comments carry one of the configured tags, replaces each with a wrapper,
//! and prints the result with `prettyplease`. The input tree is never mutated.

pub mod declaration;
pub mod error;
pub mod params;
pub mod rewrite;
pub mod syntax;
pub mod tags;

use std::path::Path;

use serde::{Deserialize, Serialize};
use syn::{Expr, Item, LitStr};

use crate::trace::CallShape;

pub use declaration::{DeclarationKind, Parameter, ReturnKind, SourceDeclaration};
pub use error::TransformError;
pub use rewrite::{RewriteContext, Variant};
pub use tags::{doc_tags, is_eligible, DEFAULT_TAGS};

/// How generated calls name their source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourcePathStyle {
    /// `file!()`, resolved by the compiler.
    #[default]
    FileMacro,
    /// The path the file was instrumented under, as a string literal.
    Literal,
}

/// Knobs for one transformation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOptions {
    pub variant: Variant,
    /// Path of the crate exposing `runtime` in the instrumented code.
    pub runtime_path: String,
    pub tags: Vec<String>,
    pub source_path: SourcePathStyle,
    /// Files whose path ends with one of these are never instrumented.
    pub skip_suffixes: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            variant: Variant::Trace,
            runtime_path: "::bridgetape".to_string(),
            tags: DEFAULT_TAGS.iter().map(|tag| tag.to_string()).collect(),
            source_path: SourcePathStyle::FileMacro,
            skip_suffixes: default_skip_suffixes(),
        }
    }
}

/// The runtime library's own sources.
pub fn default_skip_suffixes() -> Vec<String> {
    [
        "src/runtime/mod.rs",
        "src/runtime/context.rs",
        "src/runtime/session.rs",
        "src/runtime/values.rs",
        "src/trace/hooks.rs",
        "src/trace/iter.rs",
        "src/replay/mocker.rs",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

impl TransformOptions {
    pub fn with_variant(mut self, variant: Variant) -> Self {
        self.variant = variant;
        self
    }

    pub fn with_runtime_path(mut self, path: impl Into<String>) -> Self {
        self.runtime_path = path.into();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source_path(mut self, style: SourcePathStyle) -> Self {
        self.source_path = style;
        self
    }
}

/// One declaration that was replaced by a wrapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedDeclaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub shape: CallShape,
}

/// Result of transforming one file.
#[derive(Debug, Clone)]
pub struct Transformation {
    pub file: syn::File,
    pub wrapped: Vec<WrappedDeclaration>,
}

/// Printed result of transforming a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformOutput {
    pub source: String,
    pub wrapped: Vec<WrappedDeclaration>,
    /// The file matched a skip rule and was returned verbatim.
    pub skipped: bool,
}

pub struct Transformer {
    options: TransformOptions,
    root: syn::Path,
}

impl Transformer {
    pub fn new(options: TransformOptions) -> Result<Self, TransformError> {
        let root = syn::parse_str::<syn::Path>(&options.runtime_path).map_err(|source| {
            TransformError::RuntimePath {
                path: options.runtime_path.clone(),
                source,
            }
        })?;
        Ok(Self { options, root })
    }

    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// True when `path` must be left alone: non-Rust files and the runtime's own sources.
    pub fn skips(&self, path: &Path) -> bool {
        if path.extension().and_then(|ext| ext.to_str()) != Some("rs") {
            return true;
        }
        let normalized = path.to_string_lossy().replace('\\', "/");
        self.options
            .skip_suffixes
            .iter()
            .any(|suffix| normalized.ends_with(suffix.as_str()))
    }

    /// Rewrite every eligible declaration of `file`. `source_path` is used
    /// when generated calls name their file with a literal.
    pub fn transform_file(&self, file: &syn::File, source_path: &str) -> Result<Transformation, TransformError> {
        let source_expr: Expr = match self.options.source_path {
            SourcePathStyle::FileMacro => syn::parse_quote!(::core::file!()),
            SourcePathStyle::Literal => {
                let lit = LitStr::new(source_path, proc_macro2::Span::call_site());
                syn::parse_quote!(#lit)
            }
        };
        let cx = RewriteContext {
            variant: self.options.variant,
            root: &self.root,
            source_path: &source_expr,
        };

        let mut wrapped = Vec::new();
        let items = self.transform_items(&file.items, &cx, &mut wrapped)?;
        Ok(Transformation {
            file: syn::File {
                shebang: file.shebang.clone(),
                attrs: file.attrs.clone(),
                items,
            },
            wrapped,
        })
    }

    fn transform_items(
        &self,
        items: &[Item],
        cx: &RewriteContext<'_>,
        wrapped: &mut Vec<WrappedDeclaration>,
    ) -> Result<Vec<Item>, TransformError> {
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            if let Item::Mod(module) = item {
                if let Some((brace, content)) = &module.content {
                    let mut module = module.clone();
                    module.content = Some((*brace, self.transform_items(content, cx, wrapped)?));
                    out.push(Item::Mod(module));
                    continue;
                }
            }

            match SourceDeclaration::from_item(item, &self.options.tags) {
                Some(decl) if decl.is_eligible() && !decl.has_body() => {
                    tracing::debug!(name = %decl.name(), "Leaving empty declaration unwrapped");
                    out.push(item.clone());
                }
                Some(decl) if decl.is_eligible() => {
                    out.push(rewrite::rewrite(&decl, cx)?);
                    wrapped.push(WrappedDeclaration {
                        name: decl.name(),
                        kind: decl.kind,
                        shape: decl.shape(),
                    });
                }
                _ => out.push(item.clone()),
            }
        }
        Ok(out)
    }

    /// Transform source text. Skipped files come back unchanged.
    pub fn transform_source(&self, path: &Path, text: &str) -> Result<TransformOutput, TransformError> {
        if self.skips(path) {
            tracing::debug!(path = %path.display(), "Skipping file");
            return Ok(TransformOutput {
                source: text.to_string(),
                wrapped: Vec::new(),
                skipped: true,
            });
        }

        let parsed = syntax::parse(path, text)?;
        let transformed = self.transform_file(&parsed, &path.to_string_lossy())?;
        tracing::debug!(
            path = %path.display(),
            wrapped = transformed.wrapped.len(),
            "Transformed file"
        );
        Ok(TransformOutput {
            source: syntax::print(&transformed.file),
            wrapped: transformed.wrapped,
            skipped: false,
        })
    }

    /// Read and transform a file from disk.
    pub fn instrument(&self, path: &Path) -> Result<TransformOutput, TransformError> {
        let text = syntax::read(path)?;
        self.transform_source(path, &text)
    }
}
