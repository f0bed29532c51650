use std::collections::HashMap;

use crate::oracle::Package;
use crate::types::{Pos, StructInfo};

/// Per-package index answering "which struct's field list contains this
/// position". Recovers the owning type name of a struct field definition
/// for receiver-style rendering.
#[derive(Debug, Default)]
pub struct FieldOwnerIndex {
    by_pkg: HashMap<String, Vec<StructInfo>>,
}

impl FieldOwnerIndex {
    pub fn build(packages: &[Package]) -> Self {
        let mut by_pkg = HashMap::with_capacity(packages.len());
        for pkg in packages {
            by_pkg.insert(pkg.path.clone(), pkg.structs.clone());
        }
        Self { by_pkg }
    }

    /// Name of the struct whose field-list span contains `pos`, inclusive
    /// on both ends. The first matching struct wins.
    pub fn owner(&self, pkg_path: &str, pos: Pos) -> Option<&str> {
        self.by_pkg
            .get(pkg_path)?
            .iter()
            .find(|s| s.fields.contains(pos))
            .map(|s| s.name.as_str())
    }
}
