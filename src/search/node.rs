use serde::Serialize;

use crate::types::{Ident, ObjKind, SymbolInfo};

pub const BUILTIN_PKG: &str = "builtin";

/// Graph-node classification of a symbol. The discriminants participate in
/// stable node identities, so they must not be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Builtin = 1,
    Func = 2,
    Method = 3,
    Type = 4,
    Var = 5,
    Const = 6,
    Field = 7,
}

impl NodeKind {
    pub fn of(sym: &SymbolInfo) -> Self {
        match &sym.kind {
            ObjKind::Builtin => Self::Builtin,
            ObjKind::Func { recv: Some(_) } => Self::Method,
            ObjKind::Func { recv: None } => Self::Func,
            ObjKind::TypeName => Self::Type,
            ObjKind::Var { field: true } => Self::Field,
            ObjKind::Var { field: false } => Self::Var,
            ObjKind::Const => Self::Const,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Func => "func",
            Self::Method => "method",
            Self::Type => "type",
            Self::Var => "var",
            Self::Const => "const",
            Self::Field => "field",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Package identity attached to a graph node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PkgRef {
    /// Universe-scope pseudo-package.
    Builtin,
    /// Package in the loaded set; declarations and positions resolvable.
    Loaded { name: String, path: String },
    /// Package known only by name and import path.
    Foreign { name: String, path: String },
}

impl PkgRef {
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin => BUILTIN_PKG,
            Self::Loaded { name, .. } | Self::Foreign { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Builtin => BUILTIN_PKG,
            Self::Loaded { path, .. } | Self::Foreign { path, .. } => path,
        }
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Self::Builtin)
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded { .. })
    }
}

impl std::fmt::Display for PkgRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

/// Common view of a graph node for aggregation and rendering.
pub trait GraphNode {
    fn pkg(&self) -> &PkgRef;
    fn sym(&self) -> &SymbolInfo;
    fn kind(&self) -> NodeKind;

    /// Owning struct's name when the node is a struct field.
    fn owner(&self) -> Option<&str> {
        None
    }

    /// Receiver name: the field's owning struct if set, else the method
    /// receiver. `raw` selects the identity form without the `*` sigil.
    fn recv(&self, raw: bool) -> Option<String> {
        if let Some(owner) = self.owner() {
            return Some(owner.to_string());
        }
        match &self.sym().kind {
            ObjKind::Func { recv: Some(r) } => Some(r.render(raw)),
            _ => None,
        }
    }

    /// `(recv).name` when a receiver is present, the bare name otherwise.
    fn display_name(&self) -> String {
        match self.recv(false) {
            Some(recv) => format!("({}).{}", recv, self.sym().name),
            None => self.sym().name.clone(),
        }
    }
}

/// Referencing side of a use: the declaration the use occurs inside, plus
/// the identifier occurrence itself.
#[derive(Debug, Clone)]
pub struct RefNode {
    pub pkg: PkgRef,
    pub sym: SymbolInfo,
    pub kind: NodeKind,
    pub ident: Ident,
    /// Index of the co-declared name when the enclosing declaration is a
    /// multi-name value declaration.
    pub value_index: Option<usize>,
}

impl RefNode {
    pub fn new(pkg: PkgRef, sym: SymbolInfo, ident: Ident, value_index: Option<usize>) -> Self {
        let kind = NodeKind::of(&sym);
        Self {
            pkg,
            sym,
            kind,
            ident,
            value_index,
        }
    }
}

impl GraphNode for RefNode {
    fn pkg(&self) -> &PkgRef {
        &self.pkg
    }
    fn sym(&self) -> &SymbolInfo {
        &self.sym
    }
    fn kind(&self) -> NodeKind {
        self.kind
    }
}

/// Defined side of a use.
#[derive(Debug, Clone)]
pub struct DefNode {
    pub pkg: PkgRef,
    pub sym: SymbolInfo,
    pub kind: NodeKind,
    /// Owning struct's name when the definition is a struct field.
    pub owner: Option<String>,
}

impl DefNode {
    pub fn new(pkg: PkgRef, sym: SymbolInfo, owner: Option<String>) -> Self {
        let kind = NodeKind::of(&sym);
        Self {
            pkg,
            sym,
            kind,
            owner,
        }
    }
}

impl GraphNode for DefNode {
    fn pkg(&self) -> &PkgRef {
        &self.pkg
    }
    fn sym(&self) -> &SymbolInfo {
        &self.sym
    }
    fn kind(&self) -> NodeKind {
        self.kind
    }
    fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }
}

/// One identifier use: referencing declaration to defined symbol.
#[derive(Debug, Clone)]
pub struct UseEdge {
    pub src: RefNode,
    pub dst: DefNode,
}
