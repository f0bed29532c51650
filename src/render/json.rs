use std::collections::BTreeMap;
use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::oracle::Workspace;
use crate::search::{GraphNode, NodeKind, PkgRef, UseEdge};
use crate::stats::{NodeStat, NodeStats, PkgStat, PkgStats};
use crate::types::Pos;

use super::Writer;

/// Streams one JSON object per use. With `stat` set, `flush` appends a
/// final line aggregating per-node and per-package totals.
pub struct JsonWriter<W> {
    out: W,
    ws: Arc<Workspace>,
    stat: bool,
    nodes: NodeStats,
    pkgs: PkgStats,
}

impl<W: io::Write> JsonWriter<W> {
    pub fn new(out: W, ws: Arc<Workspace>, stat: bool) -> Self {
        Self {
            out,
            ws,
            stat,
            nodes: NodeStats::default(),
            pkgs: PkgStats::default(),
        }
    }
}

#[derive(Serialize)]
struct PkgView {
    name: String,
    path: String,
}

impl PkgView {
    fn of(pkg: &PkgRef) -> Self {
        Self {
            name: pkg.name().to_string(),
            path: pkg.path().to_string(),
        }
    }
}

#[derive(Serialize)]
struct PosView {
    pos: Pos,
    #[serde(skip_serializing_if = "Option::is_none")]
    position: Option<String>,
}

#[derive(Serialize)]
struct ObjView {
    str: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    recv: Option<String>,
    #[serde(rename = "type")]
    kind: NodeKind,
    p: PosView,
    name: String,
}

#[derive(Serialize)]
struct IdentView {
    name: String,
    p: PosView,
}

#[derive(Serialize)]
struct RefView {
    pkg: PkgView,
    ident: IdentView,
    obj: ObjView,
}

#[derive(Serialize)]
struct DefView {
    pkg: PkgView,
    obj: ObjView,
}

#[derive(Serialize)]
struct UseView {
    #[serde(rename = "ref")]
    src: RefView,
    #[serde(rename = "def")]
    dst: DefView,
}

#[derive(Serialize)]
struct StatView<'a> {
    nodes: &'a BTreeMap<String, NodeStat>,
    pkgs: &'a BTreeMap<String, PkgStat>,
}

impl<W: io::Write> JsonWriter<W> {
    /// Numeric offset plus the resolved location for loaded packages.
    fn pos_view(&self, pos: Option<Pos>, pkg: &PkgRef) -> PosView {
        let position = if pkg.is_loaded() {
            pos.and_then(|p| self.ws.positions.position(p))
                .map(|loc| loc.to_string())
        } else {
            None
        };
        PosView {
            pos: pos.unwrap_or(0),
            position,
        }
    }

    fn obj_view(&self, node: &dyn GraphNode) -> ObjView {
        ObjView {
            str: node.sym().descriptor(),
            recv: node.recv(true),
            kind: node.kind(),
            p: self.pos_view(node.sym().pos, node.pkg()),
            name: node.sym().name.clone(),
        }
    }

    fn use_view(&self, edge: &UseEdge) -> UseView {
        UseView {
            src: RefView {
                pkg: PkgView::of(edge.src.pkg()),
                ident: IdentView {
                    name: edge.src.ident.name.clone(),
                    p: self.pos_view(Some(edge.src.ident.span.start), edge.src.pkg()),
                },
                obj: self.obj_view(&edge.src),
            },
            dst: DefView {
                pkg: PkgView::of(edge.dst.pkg()),
                obj: self.obj_view(&edge.dst),
            },
        }
    }
}

impl<W: io::Write> Writer for JsonWriter<W> {
    fn write(&mut self, edge: &UseEdge) -> Result<()> {
        let line = serde_json::to_string(&self.use_view(edge)).context("failed to encode use")?;
        writeln!(self.out, "{}", line).context("failed to write use")?;
        if self.stat {
            self.nodes.add(edge);
            self.pkgs.add(edge);
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if !self.stat {
            return Ok(());
        }
        let view = StatView {
            nodes: self.nodes.nodes(),
            pkgs: self.pkgs.pkgs(),
        };
        let line = serde_json::to_string(&view).context("failed to encode stats")?;
        writeln!(self.out, "{}", line).context("failed to write stats")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::{DefNode, RefNode};
    use crate::types::{Ident, ObjKind, PkgInfo, Recv, Span, SymbolInfo};

    fn loaded(name: &str, path: &str) -> PkgRef {
        PkgRef::Loaded {
            name: name.to_string(),
            path: path.to_string(),
        }
    }

    fn sym(pkg: &PkgRef, name: &str, kind: ObjKind, type_str: &str) -> SymbolInfo {
        SymbolInfo {
            name: name.to_string(),
            pkg: Some(PkgInfo {
                name: pkg.name().to_string(),
                path: pkg.path().to_string(),
            }),
            pos: Some(5),
            exported: true,
            kind,
            type_str: type_str.to_string(),
        }
    }

    fn render(edges: &[UseEdge], stat: bool) -> Vec<serde_json::Value> {
        let mut out = Vec::new();
        let mut writer = JsonWriter::new(&mut out, Arc::new(Workspace::default()), stat);
        for edge in edges {
            writer.write(edge).unwrap();
        }
        writer.flush().unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_use_line_shape() {
        let pkg = loaded("app", "example.com/app");
        let edge = UseEdge {
            src: RefNode::new(
                pkg.clone(),
                sym(&pkg, "Run", ObjKind::Func { recv: None }, "func()"),
                Ident::new("V1", Span::new(42, 44)),
                None,
            ),
            dst: DefNode::new(
                pkg.clone(),
                sym(&pkg, "V1", ObjKind::Var { field: false }, "string"),
                None,
            ),
        };

        let lines = render(&[edge], false);
        assert_eq!(lines.len(), 1);
        let v = &lines[0];
        assert_eq!(v["ref"]["pkg"]["name"], "app");
        assert_eq!(v["ref"]["pkg"]["path"], "example.com/app");
        assert_eq!(v["ref"]["ident"]["name"], "V1");
        assert_eq!(v["ref"]["ident"]["p"]["pos"], 42);
        assert_eq!(v["ref"]["obj"]["str"], "func example.com/app.Run()");
        assert_eq!(v["ref"]["obj"]["type"], "func");
        assert_eq!(v["ref"]["obj"]["name"], "Run");
        assert!(v["ref"]["obj"].get("recv").is_none());
        assert_eq!(v["def"]["obj"]["str"], "var example.com/app.V1 string");
        assert_eq!(v["def"]["obj"]["type"], "var");
        assert_eq!(v["def"]["obj"]["p"]["pos"], 5);
    }

    #[test]
    fn test_method_obj_has_raw_recv() {
        let pkg = loaded("app", "example.com/app");
        let edge = UseEdge {
            src: RefNode::new(
                pkg.clone(),
                sym(&pkg, "Run", ObjKind::Func { recv: None }, "func()"),
                Ident::new("Close", Span::new(42, 47)),
                None,
            ),
            dst: DefNode::new(
                pkg.clone(),
                sym(
                    &pkg,
                    "Close",
                    ObjKind::Func {
                        recv: Some(Recv {
                            type_name: "Server".to_string(),
                            pointer: true,
                        }),
                    },
                    "func() error",
                ),
                None,
            ),
        };

        let lines = render(&[edge], false);
        let v = &lines[0];
        assert_eq!(v["def"]["obj"]["recv"], "Server");
        assert_eq!(v["def"]["obj"]["type"], "method");
        assert_eq!(
            v["def"]["obj"]["str"],
            "func (*Server) example.com/app.Close() error"
        );
    }

    #[test]
    fn test_builtin_def() {
        let pkg = loaded("app", "example.com/app");
        let edge = UseEdge {
            src: RefNode::new(
                pkg.clone(),
                sym(&pkg, "Run", ObjKind::Func { recv: None }, "func()"),
                Ident::new("len", Span::new(42, 45)),
                None,
            ),
            dst: DefNode::new(
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
        };

        let lines = render(&[edge], false);
        let v = &lines[0];
        assert_eq!(v["def"]["pkg"]["name"], "builtin");
        assert_eq!(v["def"]["pkg"]["path"], "builtin");
        assert_eq!(v["def"]["obj"]["str"], "builtin len");
        assert_eq!(v["def"]["obj"]["p"]["pos"], 0);
        assert!(v["def"]["obj"]["p"].get("position").is_none());
    }

    #[test]
    fn test_stat_flush_appends_aggregate_line() {
        let pkg = loaded("app", "example.com/app");
        let edges: Vec<UseEdge> = [10, 20]
            .into_iter()
            .map(|pos| UseEdge {
                src: RefNode::new(
                    pkg.clone(),
                    sym(&pkg, "Run", ObjKind::Func { recv: None }, "func()"),
                    Ident::new("V1", Span::new(pos, pos + 2)),
                    None,
                ),
                dst: DefNode::new(
                    pkg.clone(),
                    sym(&pkg, "V1", ObjKind::Var { field: false }, "string"),
                    None,
                ),
            })
            .collect();

        let lines = render(&edges, true);
        assert_eq!(lines.len(), 3);
        let stats = &lines[2];
        assert_eq!(
            stats["nodes"]["example.com/app-2-Run"]["refs"]["deps"]["example.com/app-5-V1"]
                ["weight"],
            2
        );
        assert_eq!(stats["pkgs"]["example.com/app"]["weight"], 4);

        let lines = render(&edges, false);
        assert_eq!(lines.len(), 2, "no aggregate line without stat");
    }
}
