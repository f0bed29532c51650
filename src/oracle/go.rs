//! Per-file parsing and declaration harvest.
//!
//! One [`GoFile`] holds the parse tree plus everything the top level of the
//! compilation unit declares. Spans and positions are rebased into the
//! global position space at harvest time, so later passes never touch
//! file-local byte offsets.

use anyhow::Result;
use tree_sitter::{Node, Parser, Tree};

use super::node_text;
use crate::types::{
    CallableDecl, Decl, Ident, ObjKind, Pos, Recv, Span, StructInfo, TypeDecl, ValueDecl,
};

/// One parsed compilation unit.
pub(crate) struct GoFile {
    pub path: String,
    pub base: Pos,
    pub package_name: String,
    pub imports: Vec<Import>,
    pub decls: Vec<Decl>,
    pub structs: Vec<StructInfo>,
    pub defs: Vec<RawDef>,
    pub source: String,
    pub tree: Tree,
}

/// A single import with its optional local alias.
pub(crate) struct Import {
    pub alias: Option<String>,
    pub path: String,
}

/// A declared name before package assembly. The package loader keys it by
/// `ident.span.start` and fills in the owning package.
pub(crate) struct RawDef {
    pub ident: Ident,
    pub kind: ObjKind,
    pub type_str: String,
}

/// Parses one file and harvests its top-level declarations.
pub(crate) fn parse_file(
    parser: &mut Parser,
    path: &str,
    base: Pos,
    source: String,
) -> Result<GoFile> {
    let tree = parser
        .parse(&source, None)
        .ok_or_else(|| anyhow::anyhow!("failed to parse {path}"))?;

    let mut package_name = None;
    let mut imports = Vec::new();
    let mut decls = Vec::new();
    let mut structs = Vec::new();
    let mut defs = Vec::new();

    let root = tree.root_node();
    for child in root.named_children(&mut root.walk()) {
        match child.kind() {
            "package_clause" => {
                package_name = child
                    .named_child(0)
                    .map(|n| node_text(n, &source).to_string());
            }
            "import_declaration" => collect_imports(child, &source, &mut imports),
            "function_declaration" | "method_declaration" => {
                if let Some((decl, def)) = harvest_callable(child, &source, base) {
                    decls.push(Decl::Callable(decl));
                    defs.push(def);
                }
            }
            "type_declaration" => {
                harvest_types(child, &source, base, &mut decls, &mut structs, &mut defs);
            }
            "const_declaration" => {
                harvest_values(child, &source, base, true, &mut decls, &mut defs);
            }
            "var_declaration" => {
                harvest_values(child, &source, base, false, &mut decls, &mut defs);
            }
            _ => {}
        }
    }

    let package_name =
        package_name.ok_or_else(|| anyhow::anyhow!("{path} has no package clause"))?;
    Ok(GoFile {
        path: path.to_string(),
        base,
        package_name,
        imports,
        decls,
        structs,
        defs,
        source,
        tree,
    })
}

/// Whether a Go name is exported: first letter uppercase.
pub(crate) fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

pub(crate) fn span_of(node: Node, base: Pos) -> Span {
    Span::new(base + node.start_byte() as Pos, base + node.end_byte() as Pos)
}

pub(crate) fn ident_of(node: Node, source: &str, base: Pos) -> Ident {
    Ident::new(node_text(node, source), span_of(node, base))
}

/// Collapses source formatting to a single line for signature strings.
fn flatten(text: &str) -> String {
    if text.contains('\n') {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    } else {
        text.to_string()
    }
}

fn flat_text(node: Node, source: &str) -> String {
    flatten(node_text(node, source))
}

// ── Imports ──

fn collect_imports(node: Node, source: &str, imports: &mut Vec<Import>) {
    // A bare import holds the import_spec directly; parenthesized
    // imports wrap them in an import_spec_list, so recurse once.
    for child in node.named_children(&mut node.walk()) {
        match child.kind() {
            "import_spec" => {
                if let Some(import) = import_of(child, source) {
                    imports.push(import);
                }
            }
            "import_spec_list" => collect_imports(child, source, imports),
            _ => {}
        }
    }
}

fn import_of(spec: Node, source: &str) -> Option<Import> {
    let path = spec
        .child_by_field_name("path")
        .map(|p| strip_string_quotes(node_text(p, source)))?;
    if path.is_empty() {
        return None;
    }
    let alias = spec
        .child_by_field_name("name")
        .map(|n| node_text(n, source).to_string());
    Some(Import { alias, path })
}

fn strip_string_quotes(s: &str) -> String {
    s.trim_matches('"').trim_matches('`').to_string()
}

// ── Functions and methods ──

fn harvest_callable(node: Node, source: &str, base: Pos) -> Option<(CallableDecl, RawDef)> {
    let name = ident_of(node.child_by_field_name("name")?, source, base);
    let params = node.child_by_field_name("parameters")?;
    let recv = node
        .child_by_field_name("receiver")
        .and_then(|r| receiver_of(r, source));

    let def = RawDef {
        ident: name.clone(),
        kind: ObjKind::Func { recv },
        type_str: signature_of(node, source),
    };
    let decl = CallableDecl {
        name,
        params_open: base + params.start_byte() as Pos,
        body_close: node
            .child_by_field_name("body")
            .map(|b| base + b.end_byte() as Pos),
    };
    Some((decl, def))
}

/// Textual signature from the parameter list up to the body,
/// e.g. `func(x int) string`. Receivers and type parameters are skipped.
fn signature_of(node: Node, source: &str) -> String {
    let Some(params) = node.child_by_field_name("parameters") else {
        return "func".to_string();
    };
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let text = source.get(params.start_byte()..end).unwrap_or("").trim_end();
    format!("func{}", flatten(text))
}

/// Receiver of a method declaration.
/// `func (s *Server) Handle()` → `Server` with the pointer flag set.
fn receiver_of(receiver: Node, source: &str) -> Option<Recv> {
    for child in receiver.named_children(&mut receiver.walk()) {
        if child.kind() == "parameter_declaration" {
            if let Some(ty) = child.child_by_field_name("type") {
                return Some(recv_of(ty, source));
            }
            // Fallback: the type is the last named child.
            let count = child.named_child_count();
            if let Some(last) = count.checked_sub(1).and_then(|i| child.named_child(i)) {
                return Some(recv_of(last, source));
            }
        }
    }
    None
}

fn recv_of(ty: Node, source: &str) -> Recv {
    match ty.kind() {
        "parenthesized_type" => ty
            .named_child(0)
            .map(|inner| recv_of(inner, source))
            .unwrap_or_else(|| Recv {
                type_name: String::new(),
                pointer: false,
            }),
        "pointer_type" => Recv {
            type_name: ty
                .named_child(0)
                .map(|inner| base_type_name(inner, source))
                .unwrap_or_default(),
            pointer: true,
        },
        _ => Recv {
            type_name: base_type_name(ty, source),
            pointer: false,
        },
    }
}

/// Bare name of a receiver type, with generic arguments dropped:
/// `List[T]` → `List`.
fn base_type_name(ty: Node, source: &str) -> String {
    match ty.kind() {
        "generic_type" => ty
            .child_by_field_name("type")
            .map(|n| node_text(n, source).to_string())
            .unwrap_or_default(),
        "parenthesized_type" => ty
            .named_child(0)
            .map(|n| base_type_name(n, source))
            .unwrap_or_default(),
        _ => node_text(ty, source).to_string(),
    }
}

// ── Type declarations ──

fn harvest_types(
    node: Node,
    source: &str,
    base: Pos,
    decls: &mut Vec<Decl>,
    structs: &mut Vec<StructInfo>,
    defs: &mut Vec<RawDef>,
) {
    for spec in node.named_children(&mut node.walk()) {
        if !matches!(spec.kind(), "type_spec" | "type_alias") {
            continue;
        }
        let Some(name_node) = spec.child_by_field_name("name") else {
            continue;
        };
        let Some(ty) = spec.child_by_field_name("type") else {
            continue;
        };
        let name = ident_of(name_node, source, base);
        defs.push(RawDef {
            ident: name.clone(),
            kind: ObjKind::TypeName,
            type_str: flat_text(ty, source),
        });
        if ty.kind() == "struct_type" {
            if let Some(info) = struct_of(&name.name, ty, base) {
                structs.push(info);
            }
            harvest_fields(ty, source, base, defs);
        }
        decls.push(Decl::Type(TypeDecl {
            name,
            rhs: span_of(ty, base),
        }));
    }
}

/// Field block of a struct type, or `None` when the struct has no fields.
fn struct_of(name: &str, ty: Node, base: Pos) -> Option<StructInfo> {
    let list = field_list(ty)?;
    let mut first = None;
    let mut last = None;
    for field in list.named_children(&mut list.walk()) {
        if field.kind() != "field_declaration" {
            continue;
        }
        let span = span_of(field, base);
        first.get_or_insert(span.start);
        last = Some(span.end);
    }
    Some(StructInfo {
        name: name.to_string(),
        fields: Span::new(first?, last?),
    })
}

/// Named struct fields become defs. Embedded fields declare no new name
/// and are left out.
fn harvest_fields(ty: Node, source: &str, base: Pos, defs: &mut Vec<RawDef>) {
    let Some(list) = field_list(ty) else {
        return;
    };
    for field in list.named_children(&mut list.walk()) {
        if field.kind() != "field_declaration" {
            continue;
        }
        let type_str = field
            .child_by_field_name("type")
            .map(|t| flat_text(t, source))
            .unwrap_or_default();
        let mut cursor = field.walk();
        for name in field.children_by_field_name("name", &mut cursor) {
            defs.push(RawDef {
                ident: ident_of(name, source, base),
                kind: ObjKind::Var { field: true },
                type_str: type_str.clone(),
            });
        }
    }
}

fn field_list(ty: Node) -> Option<Node> {
    ty.named_children(&mut ty.walk())
        .find(|n| n.kind() == "field_declaration_list")
}

// ── Constants and variables ──

fn harvest_values(
    node: Node,
    source: &str,
    base: Pos,
    is_const: bool,
    decls: &mut Vec<Decl>,
    defs: &mut Vec<RawDef>,
) {
    // Specs sit directly under the declaration, or one level down
    // inside a spec_list when the declaration is parenthesized.
    for child in node.named_children(&mut node.walk()) {
        match child.kind() {
            "const_spec" | "var_spec" => {
                harvest_value_spec(child, source, base, is_const, decls, defs);
            }
            "const_spec_list" | "var_spec_list" => {
                for spec in child.named_children(&mut child.walk()) {
                    if matches!(spec.kind(), "const_spec" | "var_spec") {
                        harvest_value_spec(spec, source, base, is_const, decls, defs);
                    }
                }
            }
            _ => {}
        }
    }
}

fn harvest_value_spec(
    spec: Node,
    source: &str,
    base: Pos,
    is_const: bool,
    decls: &mut Vec<Decl>,
    defs: &mut Vec<RawDef>,
) {
    let mut cursor = spec.walk();
    let names: Vec<Ident> = spec
        .children_by_field_name("name", &mut cursor)
        .map(|n| ident_of(n, source, base))
        .collect();
    if names.is_empty() {
        return;
    }

    let ty = spec.child_by_field_name("type");
    let type_str = ty.map(|t| flat_text(t, source)).unwrap_or_default();
    let kind = if is_const {
        ObjKind::Const
    } else {
        ObjKind::Var { field: false }
    };
    for name in &names {
        defs.push(RawDef {
            ident: name.clone(),
            kind: kind.clone(),
            type_str: type_str.clone(),
        });
    }

    let mut inits = Vec::new();
    if let Some(values) = spec.child_by_field_name("value") {
        for expr in values.named_children(&mut values.walk()) {
            inits.push(span_of(expr, base));
        }
    }
    decls.push(Decl::Value(ValueDecl {
        names,
        ty: ty.map(|t| span_of(t, base)),
        inits,
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Language;

    fn parse(source: &str) -> GoFile {
        let mut parser = Parser::new();
        parser
            .set_language(&Language::new(tree_sitter_go::LANGUAGE))
            .unwrap();
        parse_file(&mut parser, "main.go", 1, source.to_string()).unwrap()
    }

    fn pos_of(file: &GoFile, needle: &str) -> Pos {
        file.source.find(needle).unwrap() as Pos + file.base
    }

    #[test]
    fn test_package_clause_required() {
        let mut parser = Parser::new();
        parser
            .set_language(&Language::new(tree_sitter_go::LANGUAGE))
            .unwrap();
        let err = parse_file(&mut parser, "broken.go", 1, "var x = 1\n".to_string());
        assert!(err.is_err());
    }

    #[test]
    fn test_harvest_function() {
        let file = parse("package app\n\nfunc Run(count int) error {\n\treturn nil\n}\n");
        assert_eq!(file.package_name, "app");
        assert_eq!(file.defs.len(), 1);

        let def = &file.defs[0];
        assert_eq!(def.ident.name, "Run");
        assert_eq!(def.ident.span.start, pos_of(&file, "Run"));
        assert_eq!(def.kind, ObjKind::Func { recv: None });
        assert_eq!(def.type_str, "func(count int) error");

        let Decl::Callable(decl) = &file.decls[0] else {
            panic!("expected a callable decl");
        };
        assert_eq!(decl.params_open, pos_of(&file, "(count"));
        assert_eq!(
            decl.body_close,
            Some(file.source.rfind('}').unwrap() as Pos + file.base + 1)
        );
    }

    #[test]
    fn test_harvest_method_receiver() {
        let file = parse("package app\n\ntype Server struct{ addr string }\n\nfunc (s *Server) Close() error { return nil }\n\nfunc (s Server) Addr() string { return s.addr }\n");
        let close = file.defs.iter().find(|d| d.ident.name == "Close").unwrap();
        assert_eq!(
            close.kind,
            ObjKind::Func {
                recv: Some(Recv {
                    type_name: "Server".to_string(),
                    pointer: true,
                })
            }
        );
        assert_eq!(close.type_str, "func() error");

        let addr = file.defs.iter().find(|d| d.ident.name == "Addr").unwrap();
        let ObjKind::Func { recv: Some(recv) } = &addr.kind else {
            panic!("expected a method def");
        };
        assert!(!recv.pointer);
        assert_eq!(recv.type_name, "Server");
    }

    #[test]
    fn test_harvest_struct_fields() {
        let file = parse("package app\n\ntype X struct {\n\tFX1 string\n\tfx2 int\n\tio.Reader\n}\n");
        assert_eq!(file.structs.len(), 1);
        let info = &file.structs[0];
        assert_eq!(info.name, "X");
        assert!(info.fields.contains(pos_of(&file, "FX1")));
        assert!(info.fields.contains(pos_of(&file, "fx2")));

        let fields: Vec<_> = file
            .defs
            .iter()
            .filter(|d| d.kind == ObjKind::Var { field: true })
            .collect();
        assert_eq!(fields.len(), 2, "embedded io.Reader declares no field name");
        assert_eq!(fields[0].ident.name, "FX1");
        assert_eq!(fields[0].type_str, "string");
    }

    #[test]
    fn test_harvest_grouped_constants() {
        let file = parse("package app\n\nconst (\n\tKindA Kind = iota\n\tKindB\n)\n");
        assert_eq!(file.defs.len(), 2);
        assert!(file.defs.iter().all(|d| d.kind == ObjKind::Const));
        assert_eq!(file.defs[0].type_str, "Kind");
        assert_eq!(file.defs[1].type_str, "", "continuation spec has no type");

        assert_eq!(file.decls.len(), 2);
        let Decl::Value(second) = &file.decls[1] else {
            panic!("expected a value decl");
        };
        assert!(second.ty.is_none());
        assert!(second.inits.is_empty());
    }

    #[test]
    fn test_harvest_var_with_initializers() {
        let file = parse("package app\n\nvar A, B = 1, calc()\n");
        let Decl::Value(decl) = &file.decls[0] else {
            panic!("expected a value decl");
        };
        assert_eq!(decl.names.len(), 2);
        assert_eq!(decl.inits.len(), 2);
        assert_eq!(decl.index_of(decl.inits[1].start), Some(1));
    }

    #[test]
    fn test_harvest_type_alias() {
        let file = parse("package app\n\ntype Handler = func(w io.Writer) error\n");
        assert_eq!(file.defs.len(), 1);
        assert_eq!(file.defs[0].kind, ObjKind::TypeName);
        assert_eq!(file.defs[0].type_str, "func(w io.Writer) error");
    }

    #[test]
    fn test_collect_imports() {
        let file = parse(
            "package app\n\nimport (\n\t\"fmt\"\n\tstorage \"example.com/db\"\n\t_ \"net/http/pprof\"\n)\n\nimport \"strings\"\n",
        );
        assert_eq!(file.imports.len(), 4);
        assert_eq!(file.imports[0].path, "fmt");
        assert!(file.imports[0].alias.is_none());
        assert_eq!(file.imports[1].alias.as_deref(), Some("storage"));
        assert_eq!(file.imports[1].path, "example.com/db");
        assert_eq!(file.imports[2].alias.as_deref(), Some("_"));
        assert_eq!(file.imports[3].path, "strings");
    }

    #[test]
    fn test_multiline_signature_is_flattened() {
        let file = parse("package app\n\nfunc Join(\n\tleft string,\n\tright string,\n) string {\n\treturn left + right\n}\n");
        assert_eq!(
            file.defs[0].type_str,
            "func( left string, right string, ) string"
        );
    }
}
