use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::oracle::Workspace;
use crate::search::UseEdge;
use crate::stats::{EdgeStat, NodeMeta, NodeStat, NodeStats};

use super::dot::{Attr, Edge, Graph, Node, Subgraph};
use super::{label_html, RefDefTooltip, RenderOptions, WeightScale, Writer};

/// Renders one dot graph with a node per symbol, clustered by package.
/// Everything is buffered until `flush`.
pub struct DotNodeWriter<W> {
    out: W,
    ws: Arc<Workspace>,
    opts: RenderOptions,
    stats: NodeStats,
}

impl<W: io::Write> DotNodeWriter<W> {
    pub fn new(out: W, ws: Arc<Workspace>, opts: RenderOptions) -> Self {
        Self {
            out,
            ws,
            opts,
            stats: NodeStats::default(),
        }
    }

    fn build(&self) -> Graph {
        let fontsize = WeightScale::of(
            self.stats.nodes().values().map(NodeStat::weight),
            self.opts.fontsize_min,
            self.opts.fontsize_max,
        );
        let groups = self.stats.by_pkg();
        let pkg_fontsize = WeightScale::of(
            groups
                .values()
                .map(|rows| rows.iter().map(|s| s.weight()).sum()),
            self.opts.fontsize_min,
            self.opts.fontsize_max,
        );

        let mut subgraphs = Vec::new();
        for (path, rows) in &groups {
            let mut nodes = Vec::new();
            let mut pkg_weight = 0;
            for stat in rows {
                pkg_weight += stat.weight();
                nodes.push(Node {
                    id: stat.node.id.clone(),
                    attrs: vec![
                        Attr::new("color", "white"),
                        Attr::new("style", "filled"),
                        Attr::new("shape", "box"),
                        Attr::raw("label", self.node_label(stat)),
                        Attr::new("tooltip", self.node_tooltip(stat)),
                        Attr::new("fontsize", fontsize.value(stat.weight()).to_string()),
                    ],
                });
            }
            let name = rows
                .first()
                .map(|s| s.node.pkg_name.clone())
                .unwrap_or_default();
            subgraphs.push(Subgraph {
                id: path.to_string(),
                cluster: true,
                attrs: vec![
                    Attr::new("color", "lightgrey"),
                    Attr::new("style", "filled"),
                    Attr::new("label", name),
                    Attr::new("tooltip", *path),
                    Attr::new("fontsize", pkg_fontsize.value(pkg_weight).to_string()),
                ],
                nodes,
            });
        }

        let penwidth = WeightScale::of(
            self.stats.edges().map(|e| e.weight),
            self.opts.penwidth_min,
            self.opts.penwidth_max,
        );
        let weight = WeightScale::of(
            self.stats.edges().map(|e| e.weight),
            self.opts.weight_min,
            self.opts.weight_max,
        );
        let mut edges = Vec::new();
        for e in self.stats.edges() {
            let pw = penwidth.value(e.weight);
            let arrowsize = pw as f64 / 2.0;
            let tooltip = edge_tooltip(e);
            let mut attrs = vec![
                Attr::new("tooltip", tooltip.clone()),
                Attr::new("labeltooltip", tooltip),
                Attr::new("arrowsize", arrowsize.to_string()),
                Attr::new("penwidth", pw.to_string()),
                Attr::new("weight", weight.value(e.weight).to_string()),
            ];
            if e.weight > 1 {
                attrs.push(Attr::new("label", e.weight.to_string()));
            }
            edges.push(Edge {
                from: e.src.id.clone(),
                to: e.dst.id.clone(),
                attrs,
            });
        }

        Graph {
            id: "G".to_string(),
            // dot fails triangulation on large clustered layouts without newrank.
            attrs: vec![Attr::new("newrank", "true")],
            subgraphs,
            nodes: Vec::new(),
            edges,
        }
    }

    fn node_label(&self, stat: &NodeStat) -> String {
        format!(
            "<\n{}\n>",
            label_html(
                stat.node.kind.as_str(),
                &stat.node.display_name(),
                stat.in_weight(),
                stat.out_weight(),
                stat.uniq_in(),
                stat.uniq_out(),
            )
        )
    }

    fn node_tooltip(&self, stat: &NodeStat) -> String {
        let mut tooltip = RefDefTooltip::new(self.tooltip_details(&stat.node));
        for dep in stat.defs.deps.values() {
            tooltip.add_in(tooltip_id(&dep.node), dep.weight);
        }
        for dep in stat.refs.deps.values() {
            tooltip.add_out(tooltip_id(&dep.node), dep.weight);
        }
        tooltip.render()
    }

    /// Name and resolved location for nodes of loaded packages, the
    /// package-qualified id otherwise.
    fn tooltip_details(&self, meta: &NodeMeta) -> String {
        if meta.loaded {
            if let Some(loc) = meta.pos.and_then(|pos| self.ws.positions.position(pos)) {
                return format!("{} {}", meta.display_name(), loc);
            }
        }
        tooltip_id(meta)
    }
}

fn tooltip_id(meta: &NodeMeta) -> String {
    format!("{}.{}", meta.pkg, meta.display_name())
}

fn edge_tooltip(e: &EdgeStat) -> String {
    format!(
        "{} -> {} [{}]",
        tooltip_id(&e.src),
        tooltip_id(&e.dst),
        e.weight
    )
}

impl<W: io::Write> Writer for DotNodeWriter<W> {
    fn write(&mut self, edge: &UseEdge) -> Result<()> {
        self.stats.add(edge);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        writeln!(self.out, "{}", self.build()).context("failed to write node graph")
    }
}
