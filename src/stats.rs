use std::collections::BTreeMap;

use serde::Serialize;

use crate::search::{GraphNode, NodeKind, PkgRef, UseEdge};
use crate::types::Pos;

/// Stable identity of a graph node: `pkg-kind-name`, with the raw receiver
/// inserted as `(recv)` for methods and fields. The kind discriminant keeps
/// same-named symbols of different kinds apart.
pub fn node_id(node: &dyn GraphNode) -> String {
    let pkg = node.pkg().path();
    let kind = node.kind() as u8;
    let name = &node.sym().name;
    match node.recv(true) {
        Some(recv) => format!("{}-{}-({})-{}", pkg, kind, recv, name),
        None => format!("{}-{}-{}", pkg, kind, name),
    }
}

/// Identity and display data retained per node once the originating edge is
/// gone.
#[derive(Debug, Clone, Serialize)]
pub struct NodeMeta {
    #[serde(skip)]
    pub id: String,
    /// Import path of the owning package.
    pub pkg: String,
    #[serde(skip)]
    pub pkg_name: String,
    #[serde(skip)]
    pub loaded: bool,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    /// Display receiver, pointer sigil included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recv: Option<String>,
    #[serde(skip)]
    pub pos: Option<Pos>,
}

impl NodeMeta {
    pub fn of(node: &dyn GraphNode) -> Self {
        Self {
            id: node_id(node),
            pkg: node.pkg().path().to_string(),
            pkg_name: node.pkg().name().to_string(),
            loaded: node.pkg().is_loaded(),
            name: node.sym().name.clone(),
            kind: node.kind(),
            recv: node.recv(false),
            pos: node.sym().pos,
        }
    }

    /// `(recv).name` when a receiver is present, the bare name otherwise.
    pub fn display_name(&self) -> String {
        match &self.recv {
            Some(recv) => format!("({}).{}", recv, self.name),
            None => self.name.clone(),
        }
    }
}

/// One counterpart of a node together with the number of uses between the
/// two.
#[derive(Debug, Clone, Serialize)]
pub struct NodeDep {
    pub node: NodeMeta,
    pub weight: usize,
}

/// One direction of a node's uses: counterparts keyed by node id.
#[derive(Debug, Clone, Serialize)]
pub struct NodeCell {
    pub node: NodeMeta,
    #[serde(skip)]
    pub weight: usize,
    pub deps: BTreeMap<String, NodeDep>,
}

impl NodeCell {
    fn new(node: NodeMeta) -> Self {
        Self {
            node,
            weight: 0,
            deps: BTreeMap::new(),
        }
    }

    fn add(&mut self, other: &NodeMeta) {
        self.weight += 1;
        self.deps
            .entry(other.id.clone())
            .and_modify(|dep| dep.weight += 1)
            .or_insert_with(|| NodeDep {
                node: other.clone(),
                weight: 1,
            });
    }
}

/// Per-node totals. `defs` accumulates uses where the node is the definition
/// (incoming), `refs` where it is the referencing side (outgoing).
#[derive(Debug, Clone, Serialize)]
pub struct NodeStat {
    pub node: NodeMeta,
    pub defs: NodeCell,
    pub refs: NodeCell,
}

impl NodeStat {
    fn new(node: NodeMeta) -> Self {
        Self {
            defs: NodeCell::new(node.clone()),
            refs: NodeCell::new(node.clone()),
            node,
        }
    }

    /// Total uses touching the node, both directions.
    pub fn weight(&self) -> usize {
        self.defs.weight + self.refs.weight
    }

    pub fn in_weight(&self) -> usize {
        self.defs.weight
    }

    pub fn out_weight(&self) -> usize {
        self.refs.weight
    }

    pub fn uniq_in(&self) -> usize {
        self.defs.deps.len()
    }

    pub fn uniq_out(&self) -> usize {
        self.refs.deps.len()
    }
}

/// A deduplicated node-to-node edge with its use count.
#[derive(Debug, Clone)]
pub struct EdgeStat {
    pub src: NodeMeta,
    pub dst: NodeMeta,
    pub weight: usize,
}

/// Node-level aggregation over the stream of uses.
#[derive(Debug, Default)]
pub struct NodeStats {
    stats: BTreeMap<String, NodeStat>,
    edges: BTreeMap<String, EdgeStat>,
}

impl NodeStats {
    pub fn add(&mut self, edge: &UseEdge) {
        let src = NodeMeta::of(&edge.src);
        let dst = NodeMeta::of(&edge.dst);
        self.stats
            .entry(src.id.clone())
            .or_insert_with(|| NodeStat::new(src.clone()))
            .refs
            .add(&dst);
        self.stats
            .entry(dst.id.clone())
            .or_insert_with(|| NodeStat::new(dst.clone()))
            .defs
            .add(&src);
        let key = format!("{}>{}", src.id, dst.id);
        self.edges
            .entry(key)
            .and_modify(|e| e.weight += 1)
            .or_insert_with(|| EdgeStat {
                src,
                dst,
                weight: 1,
            });
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Node rows keyed by id, iteration sorted by id.
    pub fn nodes(&self) -> &BTreeMap<String, NodeStat> {
        &self.stats
    }

    pub fn edges(&self) -> impl Iterator<Item = &EdgeStat> {
        self.edges.values()
    }

    /// Node rows grouped by package path. Within a package, rows keep their
    /// id order.
    pub fn by_pkg(&self) -> BTreeMap<&str, Vec<&NodeStat>> {
        let mut groups: BTreeMap<&str, Vec<&NodeStat>> = BTreeMap::new();
        for stat in self.stats.values() {
            groups.entry(stat.node.pkg.as_str()).or_default().push(stat);
        }
        groups
    }
}

/// One counterpart package of a package cell.
#[derive(Debug, Clone, Serialize)]
pub struct PkgDep {
    pub pkg: String,
    pub weight: usize,
}

/// One direction of a package's uses, counterparts keyed by import path.
#[derive(Debug, Clone, Serialize)]
pub struct PkgCell {
    pub pkg: String,
    #[serde(skip)]
    pub weight: usize,
    pub deps: BTreeMap<String, PkgDep>,
}

impl PkgCell {
    fn new(pkg: &str) -> Self {
        Self {
            pkg: pkg.to_string(),
            weight: 0,
            deps: BTreeMap::new(),
        }
    }

    fn add(&mut self, path: &str) {
        self.weight += 1;
        self.deps
            .entry(path.to_string())
            .and_modify(|dep| dep.weight += 1)
            .or_insert_with(|| PkgDep {
                pkg: path.to_string(),
                weight: 1,
            });
    }
}

/// Per-package totals; `weight` counts both directions, so a self-loop
/// contributes two.
#[derive(Debug, Clone, Serialize)]
pub struct PkgStat {
    pub pkg: String,
    #[serde(skip)]
    pub name: String,
    pub defs: PkgCell,
    pub refs: PkgCell,
    pub weight: usize,
}

impl PkgStat {
    fn new(pkg: &PkgRef) -> Self {
        Self {
            pkg: pkg.path().to_string(),
            name: pkg.name().to_string(),
            defs: PkgCell::new(pkg.path()),
            refs: PkgCell::new(pkg.path()),
            weight: 0,
        }
    }

    pub fn in_weight(&self) -> usize {
        self.defs.weight
    }

    pub fn out_weight(&self) -> usize {
        self.refs.weight
    }

    pub fn uniq_in(&self) -> usize {
        self.defs.deps.len()
    }

    pub fn uniq_out(&self) -> usize {
        self.refs.deps.len()
    }
}

/// A deduplicated package-to-package edge with its use count.
#[derive(Debug, Clone)]
pub struct PkgEdgeStat {
    pub src: String,
    pub dst: String,
    pub weight: usize,
}

/// Package-level aggregation over the stream of uses.
#[derive(Debug, Default)]
pub struct PkgStats {
    stats: BTreeMap<String, PkgStat>,
    edges: BTreeMap<String, PkgEdgeStat>,
}

impl PkgStats {
    pub fn add(&mut self, edge: &UseEdge) {
        let src = edge.src.pkg();
        let dst = edge.dst.pkg();
        {
            let stat = self
                .stats
                .entry(src.path().to_string())
                .or_insert_with(|| PkgStat::new(src));
            stat.refs.add(dst.path());
            stat.weight += 1;
        }
        {
            let stat = self
                .stats
                .entry(dst.path().to_string())
                .or_insert_with(|| PkgStat::new(dst));
            stat.defs.add(src.path());
            stat.weight += 1;
        }
        let key = format!("{}>{}", src.path(), dst.path());
        self.edges
            .entry(key)
            .and_modify(|e| e.weight += 1)
            .or_insert_with(|| PkgEdgeStat {
                src: src.path().to_string(),
                dst: dst.path().to_string(),
                weight: 1,
            });
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// Package rows keyed by import path, iteration sorted by path.
    pub fn pkgs(&self) -> &BTreeMap<String, PkgStat> {
        &self.stats
    }

    pub fn edges(&self) -> impl Iterator<Item = &PkgEdgeStat> {
        self.edges.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{DefNode, RefNode};
    use crate::types::{Ident, ObjKind, PkgInfo, Recv, Span, SymbolInfo};

    fn sym(pkg: Option<(&str, &str)>, name: &str, kind: ObjKind, pos: Option<Pos>) -> SymbolInfo {
        SymbolInfo {
            name: name.to_string(),
            pkg: pkg.map(|(name, path)| PkgInfo {
                name: name.to_string(),
                path: path.to_string(),
            }),
            pos,
            exported: true,
            kind,
            type_str: String::new(),
        }
    }

    fn loaded(name: &str, path: &str) -> PkgRef {
        PkgRef::Loaded {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    fn ref_node(pkg: PkgRef, name: &str, kind: ObjKind, ident_pos: Pos) -> RefNode {
        let s = sym(Some((pkg.name(), pkg.path())).filter(|_| !pkg.is_builtin()), name, kind, Some(0));
        RefNode::new(
            pkg,
            s,
            Ident::new(name, Span::new(ident_pos, ident_pos + 1)),
            None,
        )
    }

    fn def_node(pkg: PkgRef, name: &str, kind: ObjKind) -> DefNode {
        let s = sym(Some((pkg.name(), pkg.path())).filter(|_| !pkg.is_builtin()), name, kind, Some(0));
        DefNode::new(pkg, s, None)
    }

    fn edge(src: RefNode, dst: DefNode) -> UseEdge {
        UseEdge { src, dst }
    }

    #[test]
    fn test_node_id_plain() {
        let node = def_node(loaded("app", "example.com/app"), "Run", ObjKind::Func { recv: None });
        assert_eq!(node_id(&node), "example.com/app-2-Run");
    }

    #[test]
    fn test_node_id_with_receiver() {
        let node = def_node(
            loaded("app", "example.com/app"),
            "Close",
            ObjKind::Func {
                recv: Some(Recv {
                    type_name: "Server".to_string(),
                    pointer: true,
                }),
            },
        );
        assert_eq!(node_id(&node), "example.com/app-3-(Server)-Close");
    }

    #[test]
    fn test_field_owner_wins_over_receiver() {
        let s = sym(
            Some(("app", "example.com/app")),
            "FX1",
            ObjKind::Var { field: true },
            Some(0),
        );
        let node = DefNode::new(loaded("app", "example.com/app"), s, Some("X".to_string()));
        assert_eq!(node_id(&node), "example.com/app-7-(X)-FX1");
        let meta = NodeMeta::of(&node);
        assert_eq!(meta.display_name(), "(X).FX1");
    }

    #[test]
    fn test_repeated_use_accumulates_weight() {
        let pkg = loaded("app", "example.com/app");
        let mut stats = NodeStats::default();
        for pos in [10, 20] {
            stats.add(&edge(
                ref_node(pkg.clone(), "Run", ObjKind::Func { recv: None }, pos),
                def_node(pkg.clone(), "V1", ObjKind::Var { field: false }),
            ));
        }

        let run = &stats.nodes()["example.com/app-2-Run"];
        assert_eq!(run.out_weight(), 2);
        assert_eq!(run.in_weight(), 0);
        assert_eq!(run.uniq_out(), 1);
        assert_eq!(run.weight(), 2);

        let v1 = &stats.nodes()["example.com/app-5-V1"];
        assert_eq!(v1.in_weight(), 2);
        assert_eq!(v1.out_weight(), 0);
        assert_eq!(v1.uniq_in(), 1);

        let edges: Vec<_> = stats.edges().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, 2);
        assert_eq!(edges[0].src.id, "example.com/app-2-Run");
        assert_eq!(edges[0].dst.id, "example.com/app-5-V1");
    }

    #[test]
    fn test_self_loop_fills_both_cells() {
        let pkg = loaded("app", "example.com/app");
        let mut stats = NodeStats::default();
        stats.add(&edge(
            ref_node(pkg.clone(), "Run", ObjKind::Func { recv: None }, 10),
            def_node(pkg.clone(), "Run", ObjKind::Func { recv: None }),
        ));

        assert_eq!(stats.nodes().len(), 1);
        let run = &stats.nodes()["example.com/app-2-Run"];
        assert_eq!(run.in_weight(), 1);
        assert_eq!(run.out_weight(), 1);
        assert_eq!(run.weight(), 2);
    }

    #[test]
    fn test_by_pkg_groups_rows() {
        let app = loaded("app", "example.com/app");
        let sub = loaded("sub", "example.com/app/sub");
        let mut stats = NodeStats::default();
        stats.add(&edge(
            ref_node(app.clone(), "Run", ObjKind::Func { recv: None }, 10),
            def_node(sub.clone(), "Helper", ObjKind::Func { recv: None }),
        ));
        stats.add(&edge(
            ref_node(app.clone(), "V1", ObjKind::Var { field: false }, 20),
            def_node(app.clone(), "C1", ObjKind::Const),
        ));

        let groups = stats.by_pkg();
        let paths: Vec<_> = groups.keys().copied().collect();
        assert_eq!(paths, ["example.com/app", "example.com/app/sub"]);
        assert_eq!(groups["example.com/app"].len(), 3);
        assert_eq!(groups["example.com/app/sub"].len(), 1);
    }

    #[test]
    fn test_feed_order_does_not_change_totals() {
        let app = loaded("app", "example.com/app");
        let sub = loaded("sub", "example.com/app/sub");
        let edges = [
            edge(
                ref_node(app.clone(), "Run", ObjKind::Func { recv: None }, 10),
                def_node(sub.clone(), "Helper", ObjKind::Func { recv: None }),
            ),
            edge(
                ref_node(app.clone(), "Run", ObjKind::Func { recv: None }, 20),
                def_node(app.clone(), "V1", ObjKind::Var { field: false }),
            ),
            edge(
                ref_node(app.clone(), "Run", ObjKind::Func { recv: None }, 30),
                def_node(sub.clone(), "Helper", ObjKind::Func { recv: None }),
            ),
        ];

        let mut forward = NodeStats::default();
        let mut reverse = NodeStats::default();
        for e in &edges {
            forward.add(e);
        }
        for e in edges.iter().rev() {
            reverse.add(e);
        }

        assert_eq!(
            serde_json::to_value(forward.nodes()).unwrap(),
            serde_json::to_value(reverse.nodes()).unwrap()
        );
        let weights: Vec<usize> = forward.edges().map(|e| e.weight).collect();
        assert_eq!(
            weights,
            reverse.edges().map(|e| e.weight).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_node_stat_json_shape() {
        let pkg = loaded("app", "example.com/app");
        let mut stats = NodeStats::default();
        stats.add(&edge(
            ref_node(pkg.clone(), "Run", ObjKind::Func { recv: None }, 10),
            def_node(pkg.clone(), "V1", ObjKind::Var { field: false }),
        ));

        let value = serde_json::to_value(&stats.nodes()["example.com/app-2-Run"]).unwrap();
        assert_eq!(value["node"]["pkg"], "example.com/app");
        assert_eq!(value["node"]["name"], "Run");
        assert_eq!(value["node"]["type"], "func");
        assert!(value["node"].get("recv").is_none());
        assert_eq!(value["refs"]["deps"]["example.com/app-5-V1"]["weight"], 1);
        assert_eq!(
            value["refs"]["deps"]["example.com/app-5-V1"]["node"]["type"],
            "var"
        );
        assert!(value["defs"]["deps"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_method_meta_keeps_pointer_sigil_for_display() {
        let node = def_node(
            loaded("app", "example.com/app"),
            "Close",
            ObjKind::Func {
                recv: Some(Recv {
                    type_name: "Server".to_string(),
                    pointer: true,
                }),
            },
        );
        let meta = NodeMeta::of(&node);
        assert_eq!(meta.recv.as_deref(), Some("*Server"));
        assert_eq!(meta.display_name(), "(*Server).Close");
        let value = serde_json::to_value(&meta).unwrap();
        assert_eq!(value["recv"], "*Server");
        assert_eq!(value["type"], "method");
    }

    #[test]
    fn test_builtin_def_keyed_under_builtin_pkg() {
        let app = loaded("app", "example.com/app");
        let mut stats = NodeStats::default();
        stats.add(&edge(
            ref_node(app.clone(), "Run", ObjKind::Func { recv: None }, 10),
            DefNode::new(
                PkgRef::Builtin,
                SymbolInfo {
                    name: "len".to_string(),
                    pkg: None,
                    pos: None,
                    exported: false,
                    kind: ObjKind::Builtin,
                    type_str: String::new(),
                },
                None,
            ),
        ));

        let len = &stats.nodes()["builtin-1-len"];
        assert!(!len.node.loaded);
        assert_eq!(len.node.pkg, "builtin");
        assert_eq!(len.in_weight(), 1);
    }

    #[test]
    fn test_pkg_stats_accumulate_both_directions() {
        let app = loaded("app", "example.com/app");
        let sub = loaded("sub", "example.com/app/sub");
        let mut stats = PkgStats::default();
        for pos in [10, 20] {
            stats.add(&edge(
                ref_node(app.clone(), "Run", ObjKind::Func { recv: None }, pos),
                def_node(sub.clone(), "Helper", ObjKind::Func { recv: None }),
            ));
        }

        let app_stat = &stats.pkgs()["example.com/app"];
        assert_eq!(app_stat.out_weight(), 2);
        assert_eq!(app_stat.in_weight(), 0);
        assert_eq!(app_stat.weight, 2);
        assert_eq!(app_stat.name, "app");

        let sub_stat = &stats.pkgs()["example.com/app/sub"];
        assert_eq!(sub_stat.in_weight(), 2);
        assert_eq!(sub_stat.uniq_in(), 1);
        assert_eq!(sub_stat.weight, 2);

        let edges: Vec<_> = stats.edges().collect();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].weight, 2);
    }

    #[test]
    fn test_pkg_self_loop_counts_twice() {
        let app = loaded("app", "example.com/app");
        let mut stats = PkgStats::default();
        stats.add(&edge(
            ref_node(app.clone(), "V2", ObjKind::Var { field: false }, 10),
            def_node(app.clone(), "C1", ObjKind::Const),
        ));

        let app_stat = &stats.pkgs()["example.com/app"];
        assert_eq!(app_stat.weight, 2);
        assert_eq!(app_stat.in_weight(), 1);
        assert_eq!(app_stat.out_weight(), 1);

        let value = serde_json::to_value(app_stat).unwrap();
        assert_eq!(value["pkg"], "example.com/app");
        assert_eq!(value["weight"], 2);
        assert_eq!(value["defs"]["deps"]["example.com/app"]["weight"], 1);
    }
}
