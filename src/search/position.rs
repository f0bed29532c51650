use crate::search::decl::DeclSet;
use crate::types::{CallableDecl, Ident, Pos, TypeDecl, ValueDecl};

/// The top-level declaration enclosing a position.
#[derive(Debug, Clone, Copy)]
pub enum EnclosingDecl<'a> {
    Callable(&'a CallableDecl),
    Type(&'a TypeDecl),
    Value(&'a ValueDecl),
}

impl<'a> EnclosingDecl<'a> {
    /// The declared name this position attributes to. For multi-name value
    /// declarations this is the co-declared name picked by
    /// [`ValueDecl::index_of`].
    pub fn name_at(&self, pos: Pos) -> Option<&'a Ident> {
        match self {
            Self::Callable(d) => Some(&d.name),
            Self::Type(d) => Some(&d.name),
            Self::Value(d) => d.index_of(pos).and_then(|i| d.names.get(i)),
        }
    }

    pub fn value_index(&self, pos: Pos) -> Option<usize> {
        match self {
            Self::Value(d) => d.index_of(pos),
            _ => None,
        }
    }
}

/// Finds the declaration enclosing `pos`. Callables are checked first, then
/// type declarations, then value declarations; the first match wins.
/// Top-level declaration spans never overlap, so at most one true match
/// exists.
pub fn enclosing(set: &DeclSet, pos: Pos) -> Option<EnclosingDecl<'_>> {
    for d in &set.callables {
        if contains_callable(d, pos) {
            return Some(EnclosingDecl::Callable(d));
        }
    }
    for d in &set.types {
        if d.rhs.contains(pos) {
            return Some(EnclosingDecl::Type(d));
        }
    }
    for d in &set.values {
        if contains_value(d, pos) {
            return Some(EnclosingDecl::Value(d));
        }
    }
    None
}

/// Strictly between the parameter list's opening parenthesis and the body's
/// closing brace. A bodyless declaration contains nothing.
fn contains_callable(d: &CallableDecl, pos: Pos) -> bool {
    match d.body_close {
        Some(close) => d.params_open < pos && pos < close,
        None => false,
    }
}

/// Within the declared type expression, or between the first and last
/// initializer expressions, inclusive.
fn contains_value(d: &ValueDecl, pos: Pos) -> bool {
    if let Some(ty) = &d.ty {
        if ty.contains(pos) {
            return true;
        }
    }
    match (d.inits.first(), d.inits.last()) {
        (Some(first), Some(last)) => first.start <= pos && pos <= last.end,
        _ => false,
    }
}
