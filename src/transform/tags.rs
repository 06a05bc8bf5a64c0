//! Doc-comment tags that mark declarations for instrumentation.

use std::sync::OnceLock;

use regex::Regex;
use syn::{Attribute, Expr, ExprLit, Lit, Meta};

/// Tags recognised when none are configured.
pub const DEFAULT_TAGS: [&str; 2] = ["bridge", "entrypoint"];

const TAG_PATTERN: &str = r"^\s*(?:\*+\s*)?@(\S+)";

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(TAG_PATTERN).expect("doc tag pattern is a valid regex"))
}

/// Every `@tag` that starts a line of the item's doc comments, in order.
///
/// Covers `///` and `//!` lines, `/** */` blocks, and explicit `#[doc = "..."]`.
pub fn doc_tags(attrs: &[Attribute]) -> Vec<String> {
    let mut tags = Vec::new();
    let pattern = tag_pattern();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let Meta::NameValue(meta) = &attr.meta else {
            continue;
        };
        let Expr::Lit(ExprLit {
            lit: Lit::Str(text), ..
        }) = &meta.value
        else {
            continue;
        };
        for line in text.value().lines() {
            if let Some(found) = pattern.captures(line) {
                tags.push(found[1].to_string());
            }
        }
    }
    tags
}

pub fn is_eligible<S: AsRef<str>>(tags: &[String], wanted: &[S]) -> bool {
    tags.iter()
        .any(|tag| wanted.iter().any(|w| w.as_ref() == tag))
}
