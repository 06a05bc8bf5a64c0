//! Function-shaped declarations found in a source file.

use syn::ext::IdentExt;
use syn::{
    Expr, ExprClosure, FnArg, Ident, Item, ItemConst, ItemFn, ItemStatic, Pat, ReturnType, Type,
    TypeBareFn, TypeParamBound,
};

use crate::trace::CallShape;
use crate::transform::tags::{doc_tags, is_eligible};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationKind {
    /// An `fn` item.
    NamedFunction,
    /// A closure initializing a `const` or `static` of bare `fn` pointer type.
    BoundClosure,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnKind {
    /// Returns a `Result`; `Err` is traced as an error.
    Fallible,
    Plain,
}

/// One declared parameter: its pattern and its type.
#[derive(Debug, Clone, Copy)]
pub struct Parameter<'a> {
    pub pat: &'a Pat,
    pub ty: &'a Type,
}

impl Parameter<'_> {
    /// The bound identifier when the whole argument is bound to one name,
    /// including `name @ pattern` bindings.
    pub fn simple_ident(&self) -> Option<&Ident> {
        let mut pat = self.pat;
        while let Pat::Paren(inner) = pat {
            pat = &inner.pat;
        }
        match pat {
            Pat::Ident(pat) => Some(&pat.ident),
            _ => None,
        }
    }
}

/// Where a bound closure lives.
#[derive(Debug, Clone, Copy)]
pub enum BoundItem<'a> {
    Const(&'a ItemConst),
    Static(&'a ItemStatic),
}

#[derive(Debug, Clone, Copy)]
pub enum Origin<'a> {
    Function(&'a ItemFn),
    Closure {
        item: BoundItem<'a>,
        closure: &'a ExprClosure,
        signature: &'a TypeBareFn,
    },
}

/// A function-like declaration together with everything the rewriter needs.
///
/// Borrowed from the parsed file; eligibility is decided once at construction.
#[derive(Debug, Clone)]
pub struct SourceDeclaration<'a> {
    pub ident: &'a Ident,
    pub kind: DeclarationKind,
    pub is_async: bool,
    pub is_generator: bool,
    pub params: Vec<Parameter<'a>>,
    pub return_kind: ReturnKind,
    pub tags: Vec<String>,
    eligible: bool,
    pub origin: Origin<'a>,
}

impl<'a> SourceDeclaration<'a> {
    /// Inspect a module-level item. Returns `None` for items that are not
    /// function-shaped, including `const _` and non-closure initializers.
    pub fn from_item<S: AsRef<str>>(item: &'a Item, wanted_tags: &[S]) -> Option<Self> {
        match item {
            Item::Fn(item_fn) => Self::from_fn(item_fn, wanted_tags),
            Item::Const(item_const) => Self::from_closure(
                BoundItem::Const(item_const),
                &item_const.attrs,
                &item_const.ident,
                &item_const.ty,
                &item_const.expr,
                wanted_tags,
            ),
            Item::Static(item_static) => Self::from_closure(
                BoundItem::Static(item_static),
                &item_static.attrs,
                &item_static.ident,
                &item_static.ty,
                &item_static.expr,
                wanted_tags,
            ),
            _ => None,
        }
    }

    fn from_fn<S: AsRef<str>>(item: &'a ItemFn, wanted_tags: &[S]) -> Option<Self> {
        let mut params = Vec::with_capacity(item.sig.inputs.len());
        for input in &item.sig.inputs {
            match input {
                FnArg::Typed(typed) => params.push(Parameter {
                    pat: &typed.pat,
                    ty: &typed.ty,
                }),
                FnArg::Receiver(_) => return None,
            }
        }

        let output = match &item.sig.output {
            ReturnType::Type(_, ty) => Some(&**ty),
            ReturnType::Default => None,
        };
        let (is_async, is_generator) = if item.sig.asyncness.is_some() {
            (true, false)
        } else {
            match output.and_then(generator_flavor) {
                Some(GeneratorFlavor::Iterator) => (false, true),
                Some(GeneratorFlavor::Stream) => (true, true),
                None => (false, false),
            }
        };

        let tags = doc_tags(&item.attrs);
        Some(Self {
            ident: &item.sig.ident,
            kind: DeclarationKind::NamedFunction,
            is_async,
            is_generator,
            params,
            return_kind: return_kind(output),
            eligible: is_eligible(&tags, wanted_tags),
            tags,
            origin: Origin::Function(item),
        })
    }

    fn from_closure<S: AsRef<str>>(
        item: BoundItem<'a>,
        attrs: &'a [syn::Attribute],
        ident: &'a Ident,
        ty: &'a Type,
        expr: &'a Expr,
        wanted_tags: &[S],
    ) -> Option<Self> {
        if ident == "_" {
            return None;
        }
        let Type::BareFn(signature) = strip_type_parens(ty) else {
            return None;
        };
        let Expr::Closure(closure) = strip_expr_parens(expr) else {
            return None;
        };
        if closure.inputs.len() != signature.inputs.len() {
            return None;
        }

        let params = closure
            .inputs
            .iter()
            .zip(&signature.inputs)
            .map(|(pat, arg)| Parameter {
                pat: strip_pat_type(pat),
                ty: &arg.ty,
            })
            .collect();

        let output = match &signature.output {
            ReturnType::Type(_, ty) => Some(&**ty),
            ReturnType::Default => None,
        };
        let tags = doc_tags(attrs);
        Some(Self {
            ident,
            kind: DeclarationKind::BoundClosure,
            is_async: closure.asyncness.is_some(),
            is_generator: false,
            params,
            return_kind: return_kind(output),
            eligible: is_eligible(&tags, wanted_tags),
            tags,
            origin: Origin::Closure {
                item,
                closure,
                signature,
            },
        })
    }

    pub fn is_eligible(&self) -> bool {
        self.eligible
    }

    /// Name recorded in traces and looked up during replay.
    pub fn name(&self) -> String {
        self.ident.unraw().to_string()
    }

    pub fn shape(&self) -> CallShape {
        CallShape::from_flags(self.is_async, self.is_generator)
    }

    /// False for `fn f() {}` and closures written `|..| {}`; those are never wrapped.
    pub fn has_body(&self) -> bool {
        match self.origin {
            Origin::Function(item) => !item.block.stmts.is_empty(),
            Origin::Closure { closure, .. } => match &*closure.body {
                Expr::Block(block) => !block.block.stmts.is_empty(),
                _ => true,
            },
        }
    }
}

/// Every function-shaped declaration at module level, descending into inline
/// `mod` blocks. Items inside `impl` blocks and function bodies are not visited.
#[cfg(test)]
pub(crate) fn collect<'a, S: AsRef<str>>(items: &'a [Item], wanted_tags: &[S]) -> Vec<SourceDeclaration<'a>> {
    let mut found = Vec::new();
    for item in items {
        if let Item::Mod(module) = item {
            if let Some((_, content)) = &module.content {
                found.extend(collect(content, wanted_tags));
            }
            continue;
        }
        if let Some(decl) = SourceDeclaration::from_item(item, wanted_tags) {
            found.push(decl);
        }
    }
    found
}

enum GeneratorFlavor {
    Iterator,
    Stream,
}

fn generator_flavor(ty: &Type) -> Option<GeneratorFlavor> {
    let Type::ImplTrait(impl_trait) = strip_type_parens(ty) else {
        return None;
    };
    impl_trait.bounds.iter().find_map(|bound| {
        let TypeParamBound::Trait(bound) = bound else {
            return None;
        };
        let last = bound.path.segments.last()?;
        if last.ident == "Iterator" {
            Some(GeneratorFlavor::Iterator)
        } else if last.ident == "Stream" {
            Some(GeneratorFlavor::Stream)
        } else {
            None
        }
    })
}

fn return_kind(output: Option<&Type>) -> ReturnKind {
    let Some(Type::Path(path)) = output.map(strip_type_parens) else {
        return ReturnKind::Plain;
    };
    match path.path.segments.last() {
        Some(last) if last.ident == "Result" => ReturnKind::Fallible,
        _ => ReturnKind::Plain,
    }
}

fn strip_type_parens(ty: &Type) -> &Type {
    match ty {
        Type::Paren(inner) => strip_type_parens(&inner.elem),
        Type::Group(inner) => strip_type_parens(&inner.elem),
        other => other,
    }
}

fn strip_expr_parens(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(inner) => strip_expr_parens(&inner.expr),
        Expr::Group(inner) => strip_expr_parens(&inner.expr),
        other => other,
    }
}

pub(crate) fn strip_pat_type(pat: &Pat) -> &Pat {
    match pat {
        Pat::Type(typed) => strip_pat_type(&typed.pat),
        other => other,
    }
}
