use std::io;

use anyhow::{Context, Result};

use crate::search::UseEdge;
use crate::stats::{PkgEdgeStat, PkgStat, PkgStats};

use super::dot::{Attr, Edge, Graph, Node};
use super::{label_html, RefDefTooltip, RenderOptions, WeightScale, Writer};

/// Renders one dot graph with a node per package.
pub struct DotPackageWriter<W> {
    out: W,
    opts: RenderOptions,
    stats: PkgStats,
}

impl<W: io::Write> DotPackageWriter<W> {
    pub fn new(out: W, opts: RenderOptions) -> Self {
        Self {
            out,
            opts,
            stats: PkgStats::default(),
        }
    }

    fn build(&self) -> Graph {
        let fontsize = WeightScale::of(
            self.stats.pkgs().values().map(|s| s.weight),
            self.opts.fontsize_min,
            self.opts.fontsize_max,
        );
        let mut nodes = Vec::new();
        for stat in self.stats.pkgs().values() {
            nodes.push(Node {
                id: stat.pkg.clone(),
                attrs: vec![
                    Attr::new("shape", "box"),
                    Attr::raw("label", node_label(stat)),
                    Attr::new("tooltip", node_tooltip(stat)),
                    Attr::new("fontsize", fontsize.value(stat.weight).to_string()),
                ],
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
            let tooltip = edge_tooltip(e);
            edges.push(Edge {
                from: e.src.clone(),
                to: e.dst.clone(),
                attrs: vec![
                    Attr::new("label", e.weight.to_string()),
                    Attr::new("tooltip", tooltip.clone()),
                    Attr::new("labeltooltip", tooltip),
                    Attr::new("penwidth", penwidth.value(e.weight).to_string()),
                    Attr::new("weight", weight.value(e.weight).to_string()),
                ],
            });
        }

        Graph {
            id: "G".to_string(),
            attrs: Vec::new(),
            subgraphs: Vec::new(),
            nodes,
            edges,
        }
    }
}

fn node_label(stat: &PkgStat) -> String {
    format!(
        "<\n{}\n>",
        label_html(
            "package",
            &stat.name,
            stat.in_weight(),
            stat.out_weight(),
            stat.uniq_in(),
            stat.uniq_out(),
        )
    )
}

fn node_tooltip(stat: &PkgStat) -> String {
    let mut tooltip = RefDefTooltip::new(stat.pkg.as_str());
    for dep in stat.defs.deps.values() {
        tooltip.add_in(dep.pkg.as_str(), dep.weight);
    }
    for dep in stat.refs.deps.values() {
        tooltip.add_out(dep.pkg.as_str(), dep.weight);
    }
    tooltip.render()
}

fn edge_tooltip(e: &PkgEdgeStat) -> String {
    format!("{} -> {} [{}]", e.src, e.dst, e.weight)
}

impl<W: io::Write> Writer for DotPackageWriter<W> {
    fn write(&mut self, edge: &UseEdge) -> Result<()> {
        self.stats.add(edge);
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        writeln!(self.out, "{}", self.build()).context("failed to write package graph")
    }
}
