use std::collections::{HashMap, HashSet};

use crate::oracle::Package;
use crate::types::{CallableDecl, Decl, Pos, TypeDecl, ValueDecl};

/// Top-level declarations of one package, bucketed by kind. Buckets keep
/// source order within each kind.
#[derive(Debug, Default)]
pub struct DeclSet {
    pub callables: Vec<CallableDecl>,
    pub types: Vec<TypeDecl>,
    pub values: Vec<ValueDecl>,
}

impl DeclSet {
    pub fn from_decls(decls: &[Decl]) -> Self {
        let mut set = Self::default();
        for decl in decls {
            match decl {
                Decl::Callable(d) => set.callables.push(d.clone()),
                Decl::Type(d) => set.types.push(d.clone()),
                Decl::Value(d) => set.values.push(d.clone()),
            }
        }
        set
    }

    /// Start positions of every declared name in this set.
    pub fn name_positions(&self) -> HashSet<Pos> {
        let mut positions = HashSet::new();
        for d in &self.callables {
            positions.insert(d.name.span.start);
        }
        for d in &self.types {
            positions.insert(d.name.span.start);
        }
        for d in &self.values {
            for name in &d.names {
                positions.insert(name.span.start);
            }
        }
        positions
    }
}

/// Declaration sets for all loaded packages, keyed by package path.
#[derive(Debug, Default)]
pub struct DeclSetMap {
    sets: HashMap<String, DeclSet>,
}

impl DeclSetMap {
    pub fn build(packages: &[Package]) -> Self {
        let mut sets = HashMap::with_capacity(packages.len());
        for pkg in packages {
            sets.insert(pkg.path.clone(), DeclSet::from_decls(&pkg.decls));
        }
        Self { sets }
    }

    pub fn get(&self, pkg_path: &str) -> Option<&DeclSet> {
        self.sets.get(pkg_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DeclSet)> {
        self.sets.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Ident, Span};

    fn callable(name: &str, at: Pos) -> Decl {
        Decl::Callable(CallableDecl {
            name: Ident::new(name, Span::new(at, at + name.len() as Pos)),
            params_open: at + 10,
            body_close: Some(at + 50),
        })
    }

    fn type_decl(name: &str, at: Pos) -> Decl {
        Decl::Type(TypeDecl {
            name: Ident::new(name, Span::new(at, at + name.len() as Pos)),
            rhs: Span::new(at + 10, at + 30),
        })
    }

    fn value(names: &[(&str, Pos)]) -> Decl {
        Decl::Value(ValueDecl {
            names: names
                .iter()
                .map(|(n, at)| Ident::new(*n, Span::new(*at, *at + n.len() as Pos)))
                .collect(),
            ty: None,
            inits: Vec::new(),
        })
    }

    #[test]
    fn test_from_decls_buckets_by_kind() {
        let decls = vec![
            value(&[("v1", 10)]),
            callable("F", 100),
            type_decl("T", 200),
            callable("G", 300),
        ];
        let set = DeclSet::from_decls(&decls);
        assert_eq!(set.callables.len(), 2);
        assert_eq!(set.types.len(), 1);
        assert_eq!(set.values.len(), 1);
        assert_eq!(set.callables[0].name.name, "F", "source order kept");
        assert_eq!(set.callables[1].name.name, "G");
    }

    #[test]
    fn test_name_positions_covers_all_declared_names() {
        let decls = vec![
            value(&[("v1", 10), ("v2", 20)]),
            callable("F", 100),
            type_decl("T", 200),
        ];
        let set = DeclSet::from_decls(&decls);
        let positions = set.name_positions();
        assert_eq!(positions.len(), 4);
        assert!(positions.contains(&10));
        assert!(positions.contains(&20));
        assert!(positions.contains(&100));
        assert!(positions.contains(&200));
    }

    #[test]
    fn test_decl_set_map_keyed_by_path() {
        let pkg = Package {
            name: "app".to_string(),
            path: "example.com/app".to_string(),
            decls: vec![callable("F", 100)],
            ..Package::default()
        };
        let map = DeclSetMap::build(&[pkg]);
        assert!(map.get("example.com/app").is_some());
        assert!(map.get("example.com/other").is_none());
    }
}
