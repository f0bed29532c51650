use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use regex::Regex;

use crate::search::decl::DeclSetMap;
use crate::types::{Pos, SymbolInfo};

/// Accept/deny regex pair. A string passes when it matches `accept` (if
/// present) and does not match `deny` (if present).
#[derive(Debug, Clone)]
pub struct RegexPair {
    accept: Option<Regex>,
    deny: Option<Regex>,
}

impl RegexPair {
    /// `None` when neither pattern is given, so callers can skip the filter
    /// entirely.
    pub fn new(accept: Option<Regex>, deny: Option<Regex>) -> Option<Self> {
        if accept.is_none() && deny.is_none() {
            return None;
        }
        Some(Self { accept, deny })
    }

    pub fn matches(&self, s: &str) -> bool {
        self.accept.as_ref().map_or(true, |re| re.is_match(s))
            && self.deny.as_ref().map_or(true, |re| !re.is_match(s))
    }
}

/// Predicate over a candidate symbol, shareable across worker threads.
/// Combined with [`Filter::and`] / [`Filter::or`], both short-circuiting.
#[derive(Clone)]
pub struct Filter {
    pred: Arc<dyn Fn(&SymbolInfo) -> bool + Send + Sync>,
}

impl Filter {
    pub fn new<F>(pred: F) -> Self
    where
        F: Fn(&SymbolInfo) -> bool + Send + Sync + 'static,
    {
        Self {
            pred: Arc::new(pred),
        }
    }

    pub fn pass(&self, sym: &SymbolInfo) -> bool {
        (self.pred)(sym)
    }

    pub fn and(self, other: Filter) -> Filter {
        Filter::new(move |sym| self.pass(sym) && other.pass(sym))
    }

    pub fn or(self, other: Filter) -> Filter {
        Filter::new(move |sym| self.pass(sym) || other.pass(sym))
    }

    /// Universe-scope symbols: no owning package.
    pub fn builtin() -> Filter {
        Filter::new(|sym| sym.pkg.is_none())
    }

    pub fn exported() -> Filter {
        Filter::new(|sym| sym.exported)
    }

    /// Symbol name passes the accept/deny pair.
    pub fn name(pair: RegexPair) -> Filter {
        Filter::new(move |sym| pair.matches(&sym.name))
    }

    /// Owning package's name passes the accept/deny pair. Symbols without a
    /// package never pass.
    pub fn pkg_name(pair: RegexPair) -> Filter {
        Filter::new(move |sym| {
            sym.pkg
                .as_ref()
                .map_or(false, |pkg| pair.matches(&pkg.name))
        })
    }

    /// Symbol belongs to a package outside the loaded set.
    pub fn foreign_to(loaded_paths: HashSet<String>) -> Filter {
        Filter::new(move |sym| {
            sym.pkg
                .as_ref()
                .map_or(false, |pkg| !loaded_paths.contains(&pkg.path))
        })
    }

    /// Symbol's position is the position of a declared name in one of the
    /// loaded packages' declaration sets.
    pub fn member_of(decl_sets: &DeclSetMap) -> Filter {
        let mut positions: HashMap<String, HashSet<Pos>> = HashMap::new();
        for (path, set) in decl_sets.iter() {
            positions.insert(path.clone(), set.name_positions());
        }
        Filter::new(move |sym| {
            let (pkg, pos) = match (&sym.pkg, sym.pos) {
                (Some(pkg), Some(pos)) => (pkg, pos),
                _ => return false,
            };
            positions
                .get(&pkg.path)
                .map_or(false, |set| set.contains(&pos))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::Package;
    use crate::types::{CallableDecl, Decl, Ident, ObjKind, PkgInfo, Span};

    fn sym(name: &str, pkg: Option<(&str, &str)>, pos: Option<Pos>, exported: bool) -> SymbolInfo {
        SymbolInfo {
            name: name.to_string(),
            pkg: pkg.map(|(name, path)| PkgInfo {
                name: name.to_string(),
                path: path.to_string(),
            }),
            pos,
            exported,
            kind: ObjKind::Var { field: false },
            type_str: String::new(),
        }
    }

    fn pair(accept: Option<&str>, deny: Option<&str>) -> RegexPair {
        RegexPair::new(
            accept.map(|p| Regex::new(p).unwrap()),
            deny.map(|p| Regex::new(p).unwrap()),
        )
        .unwrap()
    }

    #[test]
    fn test_regex_pair_requires_at_least_one_pattern() {
        assert!(RegexPair::new(None, None).is_none());
    }

    #[test]
    fn test_regex_pair_accept_and_deny() {
        let p = pair(Some("^Get"), Some("Internal$"));
        assert!(p.matches("GetUser"));
        assert!(!p.matches("SetUser"), "accept misses");
        assert!(!p.matches("GetInternal"), "deny hits");

        let accept_only = pair(Some("^Get"), None);
        assert!(accept_only.matches("GetUser"));
        assert!(!accept_only.matches("SetUser"));

        let deny_only = pair(None, Some("^Get"));
        assert!(!deny_only.matches("GetUser"));
        assert!(deny_only.matches("SetUser"));
    }

    #[test]
    fn test_builtin_filter() {
        let f = Filter::builtin();
        assert!(f.pass(&sym("len", None, None, false)));
        assert!(!f.pass(&sym("V1", Some(("app", "example.com/app")), Some(1), true)));
    }

    #[test]
    fn test_exported_filter() {
        let f = Filter::exported();
        assert!(f.pass(&sym("V1", Some(("app", "example.com/app")), Some(1), true)));
        assert!(!f.pass(&sym("v1", Some(("app", "example.com/app")), Some(1), false)));
    }

    #[test]
    fn test_and_or_composition() {
        let exported_or_builtin = Filter::exported().or(Filter::builtin());
        assert!(exported_or_builtin.pass(&sym("len", None, None, false)));
        assert!(exported_or_builtin.pass(&sym(
            "V1",
            Some(("app", "example.com/app")),
            Some(1),
            true
        )));
        assert!(!exported_or_builtin.pass(&sym(
            "v1",
            Some(("app", "example.com/app")),
            Some(1),
            false
        )));

        let exported_named = Filter::exported().and(Filter::name(pair(Some("^V"), None)));
        assert!(exported_named.pass(&sym("V1", Some(("app", "example.com/app")), Some(1), true)));
        assert!(!exported_named.pass(&sym("W1", Some(("app", "example.com/app")), Some(1), true)));
    }

    #[test]
    fn test_pkg_name_filter_requires_pkg() {
        let f = Filter::pkg_name(pair(Some("^app$"), None));
        assert!(f.pass(&sym("V1", Some(("app", "example.com/app")), Some(1), true)));
        assert!(!f.pass(&sym("V1", Some(("other", "example.com/other")), Some(1), true)));
        assert!(!f.pass(&sym("len", None, None, false)));
    }

    #[test]
    fn test_foreign_filter() {
        let loaded: HashSet<String> = ["example.com/app".to_string()].into_iter().collect();
        let f = Filter::foreign_to(loaded);
        assert!(f.pass(&sym("Println", Some(("fmt", "fmt")), None, true)));
        assert!(!f.pass(&sym("V1", Some(("app", "example.com/app")), Some(1), true)));
        assert!(!f.pass(&sym("len", None, None, false)), "builtins are not foreign");
    }

    #[test]
    fn test_member_filter() {
        let pkg = Package {
            name: "app".to_string(),
            path: "example.com/app".to_string(),
            decls: vec![Decl::Callable(CallableDecl {
                name: Ident::new("F", Span::new(100, 101)),
                params_open: 102,
                body_close: Some(120),
            })],
            ..Package::default()
        };
        let sets = DeclSetMap::build(&[pkg]);
        let f = Filter::member_of(&sets);
        assert!(f.pass(&sym("F", Some(("app", "example.com/app")), Some(100), true)));
        assert!(
            !f.pass(&sym("F", Some(("app", "example.com/app")), Some(101), true)),
            "position must be the declared name's start"
        );
        assert!(!f.pass(&sym("len", None, None, false)));
    }
}
