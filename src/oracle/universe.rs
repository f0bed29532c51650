//! Universe scope: the predeclared names every Go file can reach without
//! importing anything.

use crate::types::{ObjKind, SymbolInfo};

/// Resolves a name against the universe scope. Returns `None` for names
/// that are not predeclared.
pub(crate) fn lookup(name: &str) -> Option<SymbolInfo> {
    let (kind, type_str) = match name {
        "append" | "cap" | "clear" | "close" | "complex" | "copy" | "delete" | "imag" | "len"
        | "make" | "max" | "min" | "new" | "panic" | "print" | "println" | "real" | "recover" => {
            (ObjKind::Builtin, "")
        }
        "any" | "bool" | "byte" | "comparable" | "complex64" | "complex128" | "error"
        | "float32" | "float64" | "int" | "int8" | "int16" | "int32" | "int64" | "rune"
        | "string" | "uint" | "uint8" | "uint16" | "uint32" | "uint64" | "uintptr" => {
            (ObjKind::TypeName, "")
        }
        "true" | "false" => (ObjKind::Const, "untyped bool"),
        "iota" => (ObjKind::Const, "untyped int"),
        // nil has no type; lump it with the builtin functions.
        "nil" => (ObjKind::Builtin, ""),
        _ => return None,
    };
    Some(SymbolInfo {
        name: name.to_string(),
        pkg: None,
        pos: None,
        exported: false,
        kind,
        type_str: type_str.to_string(),
    })
}
