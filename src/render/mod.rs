pub mod dot;
pub mod json;
pub mod node;
pub mod package;

pub use json::JsonWriter;
pub use node::DotNodeWriter;
pub use package::DotPackageWriter;

use anyhow::Result;

use crate::ranking::{Percentiler, Ranking};
use crate::search::UseEdge;

/// Sink for the stream of resolved uses. `write` may buffer; `flush` emits
/// whatever the format renders at end of stream.
pub trait Writer {
    fn write(&mut self, edge: &UseEdge) -> Result<()>;
    fn flush(&mut self) -> Result<()>;
}

/// Output ranges for the visual attributes derived from use counts.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub fontsize_min: usize,
    pub fontsize_max: usize,
    pub penwidth_min: usize,
    pub penwidth_max: usize,
    pub weight_min: usize,
    pub weight_max: usize,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            fontsize_min: 8,
            fontsize_max: 24,
            penwidth_min: 1,
            penwidth_max: 1,
            weight_min: 1,
            weight_max: 100,
        }
    }
}

/// Percentile-ranked mapping from a weight distribution onto an attribute
/// range.
#[derive(Debug, Clone)]
pub(crate) struct WeightScale {
    ranking: Ranking,
    percentiler: Percentiler,
}

impl WeightScale {
    pub(crate) fn of<I>(weights: I, min: usize, max: usize) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        Self {
            ranking: Ranking::from_weights(weights),
            percentiler: Percentiler::new(min, max),
        }
    }

    pub(crate) fn value(&self, weight: usize) -> usize {
        self.percentiler.map(self.ranking.rank(weight))
    }
}

/// The HTML table shown inside dot node labels: a title row followed by the
/// in/out counters.
pub(crate) fn label_html(
    title_key: &str,
    title_value: &str,
    in_weight: usize,
    out_weight: usize,
    uniq_in: usize,
    uniq_out: usize,
) -> String {
    format!(
        r#"<table border="0">
  <tr>
    <td><b>{}</b></td>
    <td><b>{}</b></td>
  </tr>
  <tr>
    <td align="left"><b>IO</b></td>
    <td align="right">{}</td>
  </tr>
  <tr>
    <td align="left"><b>In</b></td>
    <td align="right">{}</td>
  </tr>
  <tr>
    <td align="left"><b>Out</b></td>
    <td align="right">{}</td>
  </tr>
  <tr>
    <td align="left"><b>UniqIn</b></td>
    <td align="right">{}</td>
  </tr>
  <tr>
    <td align="left"><b>UniqOut</b></td>
    <td align="right">{}</td>
  </tr>
</table>"#,
        title_key,
        title_value,
        in_weight + out_weight,
        in_weight,
        out_weight,
        uniq_in,
        uniq_out,
    )
}

/// Plain-text node tooltip: a details line, then the counterparts that use
/// the node and the counterparts it uses, one `id weight` per line.
#[derive(Debug, Default)]
pub(crate) struct RefDefTooltip {
    details: String,
    ins: Vec<(String, usize)>,
    outs: Vec<(String, usize)>,
}

impl RefDefTooltip {
    pub(crate) fn new(details: impl Into<String>) -> Self {
        Self {
            details: details.into(),
            ins: Vec::new(),
            outs: Vec::new(),
        }
    }

    pub(crate) fn add_in(&mut self, id: impl Into<String>, weight: usize) {
        self.ins.push((id.into(), weight));
    }

    pub(crate) fn add_out(&mut self, id: impl Into<String>, weight: usize) {
        self.outs.push((id.into(), weight));
    }

    pub(crate) fn render(&self) -> String {
        let mut s = String::new();
        s.push_str(&self.details);
        s.push('\n');
        s.push_str("In:\n");
        for (id, weight) in &self.ins {
            s.push_str(&format!("{} {}\n", id, weight));
        }
        s.push_str("Out:\n");
        for (id, weight) in &self.outs {
            s.push_str(&format!("{} {}\n", id, weight));
        }
        s
    }
}
