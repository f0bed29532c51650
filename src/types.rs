use serde::Serialize;

/// Byte position in the global position space, 1-based.
///
/// Every loaded file is assigned a base offset, so a position identifies a
/// unique byte across the whole load and maps back to file:line:column
/// through [`crate::oracle::PosTable`].
pub type Pos = u32;

/// Byte range of a syntax node. `end` is one past the node's final byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    /// Containment check used for enclosing-declaration queries.
    /// Inclusive on both ends.
    pub fn contains(&self, pos: Pos) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// One identifier occurrence in source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl std::fmt::Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Human-readable source location resolved from a [`Pos`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Name and import path of the package owning a symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PkgInfo {
    pub name: String,
    pub path: String,
}

/// Method receiver: the named type and whether it is taken by pointer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recv {
    pub type_name: String,
    pub pointer: bool,
}

impl Recv {
    /// Receiver name for display. The bare type name when `raw`, otherwise
    /// pointer receivers carry a `*` prefix.
    pub fn render(&self, raw: bool) -> String {
        if self.pointer && !raw {
            format!("*{}", self.type_name)
        } else {
            self.type_name.clone()
        }
    }
}

/// Semantic kind of a resolved symbol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjKind {
    /// Universe-scope name (`len`, `error`, `true`, ...).
    Builtin,
    /// Function, or method when a receiver is present.
    Func { recv: Option<Recv> },
    /// Declared or aliased type name.
    TypeName,
    /// Variable, or struct field when `field` is set.
    Var { field: bool },
    Const,
}

impl ObjKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Func { .. } => "func",
            Self::TypeName => "type",
            Self::Var { field: true } => "field",
            Self::Var { field: false } => "var",
            Self::Const => "const",
        }
    }
}

/// Resolved identity of an identifier occurrence, produced by the oracle.
///
/// `pkg` is `None` for universe-scope builtins. `pos` is `None` when the
/// defining source is not part of the load (builtins, foreign packages).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolInfo {
    pub name: String,
    pub pkg: Option<PkgInfo>,
    pub pos: Option<Pos>,
    pub exported: bool,
    pub kind: ObjKind,
    /// Textual type as written in source, e.g. `func(x int) string`.
    pub type_str: String,
}

impl SymbolInfo {
    /// Package-qualified name, `path.Name`, or the bare name for builtins.
    pub fn qualified_name(&self) -> String {
        match &self.pkg {
            Some(pkg) => format!("{}.{}", pkg.path, self.name),
            None => self.name.clone(),
        }
    }

    /// One-line descriptor, e.g. `var example.com/app.V1 string` or
    /// `func (*Server) example.com/app.Close() error`.
    pub fn descriptor(&self) -> String {
        let mut s = String::from(self.kind.keyword());
        if let ObjKind::Func { recv: Some(recv) } = &self.kind {
            s.push_str(&format!(" ({})", recv.render(false)));
        }
        s.push(' ');
        s.push_str(&self.qualified_name());
        match &self.kind {
            ObjKind::Func { .. } => {
                // type_str already starts with "func"; keep only the tail.
                if let Some(tail) = self.type_str.strip_prefix("func") {
                    s.push_str(tail);
                }
            }
            _ => {
                if !self.type_str.is_empty() {
                    s.push(' ');
                    s.push_str(&self.type_str);
                }
            }
        }
        s
    }
}

/// A top-level declaration in one compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Value(ValueDecl),
    Callable(CallableDecl),
    Type(TypeDecl),
}

impl Decl {
    /// Name idents declared by this declaration, in source order.
    pub fn names(&self) -> Vec<&Ident> {
        match self {
            Self::Value(d) => d.names.iter().collect(),
            Self::Callable(d) => vec![&d.name],
            Self::Type(d) => vec![&d.name],
        }
    }
}

/// `var` or `const` specification: one or more co-declared names with an
/// optional shared type and positionally paired initializers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueDecl {
    pub names: Vec<Ident>,
    pub ty: Option<Span>,
    pub inits: Vec<Span>,
}

impl ValueDecl {
    /// Which co-declared name a position belongs to: the shared type
    /// expression maps to index 0, then the names' own spans, then the
    /// positionally paired initializer spans.
    pub fn index_of(&self, pos: Pos) -> Option<usize> {
        if let Some(ty) = &self.ty {
            if ty.contains(pos) {
                return Some(0);
            }
        }
        if let Some(i) = self.names.iter().position(|n| n.span.contains(pos)) {
            return Some(i);
        }
        self.inits.iter().position(|v| v.contains(pos))
    }
}

/// Function or method declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallableDecl {
    pub name: Ident,
    /// Opening parenthesis of the parameter list.
    pub params_open: Pos,
    /// Closing brace of the body, `None` for bodyless declarations.
    pub body_close: Option<Pos>,
}

/// Type declaration with the span of its right-hand-side expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDecl {
    pub name: Ident,
    pub rhs: Span,
}

/// Named struct type and the span of its field list, for receiver-owner
/// lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructInfo {
    pub name: String,
    /// First field's start to the last field's end.
    pub fields: Span,
}

/// One resolved identifier use recorded by the oracle: the occurrence and
/// the symbol it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseSite {
    pub ident: Ident,
    pub target: SymbolInfo,
}
