//! Identifier-use resolution.
//!
//! Walks each file's syntax tree with a scope stack for function-local
//! bindings (parameters, receivers, short declarations) and binds every
//! remaining identifier occurrence to the symbol it denotes: a qualified
//! name through the file's imports, a package-scope declaration, or a
//! universe name. Occurrences that resolve to nothing produce no use site.

use std::collections::{HashMap, HashSet};

use tree_sitter::Node;

use super::go::{self, GoFile};
use super::{node_text, universe, Package};
use crate::types::{ObjKind, PkgInfo, SymbolInfo, UseSite};

/// Syntactic position of a qualified name. Packages outside the load have
/// no symbol table, so the kind of their members is inferred from how the
/// name is used.
#[derive(Clone, Copy)]
enum Hint {
    Value,
    Call,
    Type,
}

/// Cross-package view shared by every file of the load.
pub(crate) struct Resolver<'a> {
    packages: &'a [Package],
    by_path: HashMap<&'a str, usize>,
    /// Per package: the top-level scope. Methods and fields are not
    /// reachable by bare name and are left out.
    scopes: Vec<HashMap<&'a str, &'a SymbolInfo>>,
}

impl<'a> Resolver<'a> {
    pub fn new(packages: &'a [Package]) -> Self {
        let by_path = packages
            .iter()
            .enumerate()
            .map(|(idx, pkg)| (pkg.path.as_str(), idx))
            .collect();
        let scopes = packages
            .iter()
            .map(|pkg| {
                pkg.defs
                    .values()
                    .filter(|sym| !is_member(sym))
                    .map(|sym| (sym.name.as_str(), sym))
                    .collect()
            })
            .collect();
        Self {
            packages,
            by_path,
            scopes,
        }
    }

    /// Resolves every identifier use in one file of package `pkg_idx`.
    pub fn file_uses(&self, file: &GoFile, pkg_idx: usize) -> Vec<UseSite> {
        let mut walker = FileWalker {
            resolver: self,
            file,
            pkg_idx,
            imports: import_names(file),
            locals: Vec::new(),
            uses: Vec::new(),
        };
        walker.walk(file.tree.root_node(), Hint::Value);
        walker.uses
    }
}

fn is_member(sym: &SymbolInfo) -> bool {
    matches!(
        sym.kind,
        ObjKind::Func { recv: Some(_) } | ObjKind::Var { field: true }
    )
}

/// Maps each import's file-local name to its package path. Blank and dot
/// imports introduce no usable name.
fn import_names(file: &GoFile) -> HashMap<String, String> {
    let mut names = HashMap::new();
    for import in &file.imports {
        let name = match &import.alias {
            Some(alias) if alias == "_" || alias == "." => continue,
            Some(alias) => alias.clone(),
            None => import
                .path
                .rsplit('/')
                .next()
                .unwrap_or(&import.path)
                .to_string(),
        };
        names.insert(name, import.path.clone());
    }
    names
}

struct FileWalker<'a> {
    resolver: &'a Resolver<'a>,
    file: &'a GoFile,
    pkg_idx: usize,
    imports: HashMap<String, String>,
    locals: Vec<HashSet<String>>,
    uses: Vec<UseSite>,
}

impl<'a> FileWalker<'a> {
    fn walk(&mut self, node: Node, hint: Hint) {
        match node.kind() {
            "function_declaration" | "method_declaration" | "func_literal" => {
                self.walk_callable(node);
            }
            "block" | "if_statement" | "for_statement" | "expression_switch_statement"
            | "select_statement" | "communication_case" => {
                self.scoped(|w| w.walk_children(node, Hint::Value));
            }
            "type_switch_statement" => self.scoped(|w| w.walk_type_switch(node)),
            "short_var_declaration" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk(right, Hint::Value);
                }
                if let Some(left) = node.child_by_field_name("left") {
                    self.bind_idents(left);
                }
            }
            // `range x` and `<-ch` forms declare their left side only
            // with the := operator.
            "range_clause" | "receive_statement" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.walk(right, Hint::Value);
                }
                if let Some(left) = node.child_by_field_name("left") {
                    if has_declare_op(node) {
                        self.bind_idents(left);
                    } else {
                        self.walk(left, Hint::Value);
                    }
                }
            }
            "var_declaration" | "const_declaration" => self.walk_value_decl(node),
            "type_declaration" => self.walk_type_decl(node),
            "parameter_list" => self.walk_params(node),
            "call_expression" => {
                if let Some(func) = node.child_by_field_name("function") {
                    self.walk(func, Hint::Call);
                }
                if let Some(args) = node.child_by_field_name("type_arguments") {
                    self.walk(args, Hint::Type);
                }
                if let Some(args) = node.child_by_field_name("arguments") {
                    self.walk(args, Hint::Value);
                }
            }
            "selector_expression" => self.walk_selector(node, hint),
            "qualified_type" => self.walk_qualified_type(node),
            "composite_literal" => self.walk_composite(node),
            "identifier" => self.resolve_ident(node),
            "type_identifier" => self.resolve_ident(node),
            // Bare member and package names resolve to nothing on their own.
            "field_identifier" | "package_identifier" | "blank_identifier" | "label_name" => {}
            _ => self.walk_children(node, hint),
        }
    }

    fn walk_children(&mut self, node: Node, hint: Hint) {
        for child in node.named_children(&mut node.walk()) {
            self.walk(child, hint);
        }
    }

    fn scoped(&mut self, f: impl FnOnce(&mut Self)) {
        self.locals.push(HashSet::new());
        f(self);
        self.locals.pop();
    }

    fn bind(&mut self, name: String) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.locals.last_mut() {
            scope.insert(name);
        }
    }

    fn is_local(&self, name: &str) -> bool {
        self.locals.iter().any(|scope| scope.contains(name))
    }

    fn bind_idents(&mut self, list: Node) {
        for expr in list.named_children(&mut list.walk()) {
            if expr.kind() == "identifier" {
                let name = node_text(expr, &self.file.source).to_string();
                self.bind(name);
            }
        }
    }

    // ── Scopes and bindings ──

    fn walk_callable(&mut self, node: Node) {
        self.locals.push(HashSet::new());
        if let Some(receiver) = node.child_by_field_name("receiver") {
            self.walk_params(receiver);
        }
        if let Some(tparams) = node.child_by_field_name("type_parameters") {
            self.walk_params(tparams);
        }
        if let Some(params) = node.child_by_field_name("parameters") {
            self.walk_params(params);
        }
        if let Some(result) = node.child_by_field_name("result") {
            if result.kind() == "parameter_list" {
                self.walk_params(result);
            } else {
                self.walk(result, Hint::Type);
            }
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.walk(body, Hint::Value);
        }
        self.locals.pop();
    }

    /// Parameter-shaped lists: regular parameters, receivers, named
    /// results, and type parameter lists. Names bind, types are uses.
    fn walk_params(&mut self, list: Node) {
        for param in list.named_children(&mut list.walk()) {
            if !matches!(
                param.kind(),
                "parameter_declaration"
                    | "variadic_parameter_declaration"
                    | "type_parameter_declaration"
            ) {
                continue;
            }
            let mut cursor = param.walk();
            let names: Vec<String> = param
                .children_by_field_name("name", &mut cursor)
                .map(|n| node_text(n, &self.file.source).to_string())
                .collect();
            for name in names {
                self.bind(name);
            }
            if let Some(ty) = param.child_by_field_name("type") {
                self.walk(ty, Hint::Type);
            }
        }
    }

    fn walk_type_switch(&mut self, node: Node) {
        if let Some(init) = node.child_by_field_name("initializer") {
            self.walk(init, Hint::Value);
        }
        if let Some(value) = node.child_by_field_name("value") {
            self.walk(value, Hint::Value);
        }
        if let Some(alias) = node.child_by_field_name("alias") {
            self.bind_idents(alias);
        }
        for child in node.named_children(&mut node.walk()) {
            if matches!(child.kind(), "type_case" | "default_case") {
                self.walk_children(child, Hint::Value);
            }
        }
    }

    fn walk_value_decl(&mut self, node: Node) {
        for spec in node.named_children(&mut node.walk()) {
            match spec.kind() {
                "const_spec" | "var_spec" => self.walk_value_spec(spec),
                "const_spec_list" | "var_spec_list" => {
                    for inner in spec.named_children(&mut spec.walk()) {
                        if matches!(inner.kind(), "const_spec" | "var_spec") {
                            self.walk_value_spec(inner);
                        }
                    }
                }
                _ => {}
            }
        }
    }

    /// Types and initializers are uses; the declared names bind afterwards
    /// when the spec is function-local. Top-level names are defs and are
    /// never walked.
    fn walk_value_spec(&mut self, spec: Node) {
        if let Some(ty) = spec.child_by_field_name("type") {
            self.walk(ty, Hint::Type);
        }
        if let Some(value) = spec.child_by_field_name("value") {
            self.walk(value, Hint::Value);
        }
        let mut cursor = spec.walk();
        let names: Vec<String> = spec
            .children_by_field_name("name", &mut cursor)
            .map(|n| node_text(n, &self.file.source).to_string())
            .collect();
        for name in names {
            self.bind(name);
        }
    }

    fn walk_type_decl(&mut self, node: Node) {
        for spec in node.named_children(&mut node.walk()) {
            if !matches!(spec.kind(), "type_spec" | "type_alias") {
                continue;
            }
            // A local type is visible inside its own definition.
            if let Some(name) = spec.child_by_field_name("name") {
                let text = node_text(name, &self.file.source).to_string();
                self.bind(text);
            }
            self.scoped(|w| {
                if let Some(tparams) = spec.child_by_field_name("type_parameters") {
                    w.walk_params(tparams);
                }
                if let Some(ty) = spec.child_by_field_name("type") {
                    w.walk(ty, Hint::Type);
                }
            });
        }
    }

    // ── Name resolution ──

    /// `pkg.Name` resolves through the file's imports; any other selector
    /// is member access on a value and only the operand resolves.
    fn walk_selector(&mut self, node: Node, hint: Hint) {
        let (Some(operand), Some(field)) = (
            node.child_by_field_name("operand"),
            node.child_by_field_name("field"),
        ) else {
            self.walk_children(node, Hint::Value);
            return;
        };

        if operand.kind() == "identifier" {
            let name = node_text(operand, &self.file.source).to_string();
            if !self.is_local(&name) {
                if let Some(path) = self.imports.get(&name) {
                    let path = path.clone();
                    self.resolve_qualified(&name, &path, field, hint);
                    return;
                }
            }
        }
        self.walk(operand, Hint::Value);
    }

    fn walk_qualified_type(&mut self, node: Node) {
        let (Some(pkg), Some(name)) = (
            node.child_by_field_name("package"),
            node.child_by_field_name("name"),
        ) else {
            return;
        };
        let pkg_text = node_text(pkg, &self.file.source).to_string();
        if let Some(path) = self.imports.get(&pkg_text) {
            let path = path.clone();
            self.resolve_qualified(&pkg_text, &path, name, Hint::Type);
        }
    }

    fn resolve_qualified(&mut self, pkg_name: &str, path: &str, member: Node, hint: Hint) {
        let name = node_text(member, &self.file.source).to_string();
        if let Some(&idx) = self.resolver.by_path.get(path) {
            let sym = self.resolver.scopes[idx].get(name.as_str()).map(|&s| s.clone());
            if let Some(sym) = sym {
                self.push_use(member, sym);
            }
            return;
        }
        let sym = SymbolInfo {
            exported: go::is_exported(&name),
            pkg: Some(PkgInfo {
                name: pkg_name.to_string(),
                path: path.to_string(),
            }),
            pos: None,
            kind: match hint {
                Hint::Call => ObjKind::Func { recv: None },
                Hint::Type => ObjKind::TypeName,
                Hint::Value => ObjKind::Var { field: false },
            },
            type_str: String::new(),
            name,
        };
        self.push_use(member, sym);
    }

    fn resolve_ident(&mut self, node: Node) {
        let name = node_text(node, &self.file.source).to_string();
        if name == "_" || self.is_local(&name) {
            return;
        }
        let sym = match self.resolver.scopes[self.pkg_idx].get(name.as_str()) {
            Some(&sym) => Some(sym.clone()),
            None => universe::lookup(&name),
        };
        if let Some(sym) = sym {
            self.push_use(node, sym);
        }
    }

    fn push_use(&mut self, node: Node, target: SymbolInfo) {
        let ident = go::ident_of(node, &self.file.source, self.file.base);
        self.uses.push(UseSite { ident, target });
    }

    // ── Composite literals ──

    fn walk_composite(&mut self, node: Node) {
        let ty = node.child_by_field_name("type");
        if let Some(ty) = ty {
            self.walk(ty, Hint::Type);
        }
        let Some(body) = node.child_by_field_name("body") else {
            return;
        };
        let strct = ty.and_then(|t| self.literal_struct(t));
        let expr_keys = ty.is_some_and(|t| {
            matches!(
                t.kind(),
                "map_type" | "slice_type" | "array_type" | "implicit_length_array_type"
            )
        });
        self.walk_literal_value(body, &strct, expr_keys);
    }

    /// Struct named by a literal's type, when the load knows it.
    fn literal_struct(&self, ty: Node) -> Option<(usize, String)> {
        match ty.kind() {
            "type_identifier" => {
                let name = node_text(ty, &self.file.source);
                if self.is_local(name) {
                    return None;
                }
                self.has_struct(self.pkg_idx, name)
                    .then(|| (self.pkg_idx, name.to_string()))
            }
            "qualified_type" => {
                let pkg = node_text(ty.child_by_field_name("package")?, &self.file.source);
                let name = node_text(ty.child_by_field_name("name")?, &self.file.source);
                let path = self.imports.get(pkg)?;
                let idx = *self.resolver.by_path.get(path.as_str())?;
                self.has_struct(idx, name).then(|| (idx, name.to_string()))
            }
            _ => None,
        }
    }

    fn has_struct(&self, pkg_idx: usize, name: &str) -> bool {
        self.resolver.packages[pkg_idx]
            .structs
            .iter()
            .any(|s| s.name == name)
    }

    fn walk_literal_value(&mut self, body: Node, strct: &Option<(usize, String)>, expr_keys: bool) {
        for element in body.named_children(&mut body.walk()) {
            if element.kind() != "keyed_element" {
                self.walk(element, Hint::Value);
                continue;
            }
            let count = element.named_child_count();
            if let Some(key) = element.named_child(0) {
                self.walk_element_key(key, strct, expr_keys);
            }
            if count > 1 {
                if let Some(value) = element.named_child(count - 1) {
                    self.walk(value, Hint::Value);
                }
            }
        }
    }

    /// A name key is a struct field when the literal's struct is known, an
    /// ordinary expression in map and array literals, and nothing
    /// resolvable otherwise.
    fn walk_element_key(&mut self, key: Node, strct: &Option<(usize, String)>, expr_keys: bool) {
        let key = named_leaf(key);
        match key.kind() {
            "identifier" | "field_identifier" => {
                if let Some((idx, struct_name)) = strct {
                    let name = node_text(key, &self.file.source).to_string();
                    if let Some(sym) = self.struct_field(*idx, struct_name, &name) {
                        self.push_use(key, sym);
                    }
                } else if expr_keys {
                    self.resolve_ident(key);
                }
            }
            _ => self.walk(key, Hint::Value),
        }
    }

    fn struct_field(&self, pkg_idx: usize, struct_name: &str, field: &str) -> Option<SymbolInfo> {
        let pkg = &self.resolver.packages[pkg_idx];
        let span = pkg.structs.iter().find(|s| s.name == struct_name)?.fields;
        pkg.defs
            .values()
            .find(|sym| {
                matches!(sym.kind, ObjKind::Var { field: true })
                    && sym.name == field
                    && sym.pos.is_some_and(|pos| span.contains(pos))
            })
            .cloned()
    }
}

/// Unwraps single-child wrapper nodes down to the leaf.
fn named_leaf(node: Node) -> Node {
    let mut node = node;
    while node.named_child_count() == 1 {
        let Some(child) = node.named_child(0) else {
            break;
        };
        node = child;
    }
    node
}

fn has_declare_op(node: Node) -> bool {
    let mut cursor = node.walk();
    let has_op = node.children(&mut cursor).any(|c| c.kind() == ":=");
    has_op
}
