use std::fmt;

/// Replaces characters that dot does not accept in bare identifiers.
pub fn escape(v: &str) -> String {
    v.chars()
        .map(|c| match c {
            '/' | '$' | '.' | '(' | ')' => '_',
            c => c,
        })
        .collect()
}

/// A single `key=value` attribute. Values are quoted unless `raw`, which is
/// needed for HTML-like labels.
#[derive(Debug, Clone)]
pub struct Attr {
    key: String,
    value: String,
    raw: bool,
}

impl Attr {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            raw: false,
        }
    }

    pub fn raw(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            raw: true,
        }
    }

    fn value(&self) -> String {
        if self.raw {
            self.value.clone()
        } else {
            format!("\"{}\"", self.value)
        }
    }

    fn statement(&self) -> String {
        format!("{}={};", self.key, self.value())
    }
}

impl fmt::Display for Attr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value())
    }
}

fn inline(attrs: &[Attr]) -> String {
    let parts: Vec<String> = attrs.iter().map(|a| a.to_string()).collect();
    format!("[{}]", parts.join(","))
}

fn statements(attrs: &[Attr]) -> String {
    let parts: Vec<String> = attrs.iter().map(|a| a.statement()).collect();
    parts.join("\n")
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: String,
    pub attrs: Vec<Attr>,
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{};", escape(&self.id))
        } else {
            write!(f, "{} {};", escape(&self.id), inline(&self.attrs))
        }
    }
}

#[derive(Debug, Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub attrs: Vec<Attr>,
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.attrs.is_empty() {
            write!(f, "{} -> {};", escape(&self.from), escape(&self.to))
        } else {
            write!(
                f,
                "{} -> {} {};",
                escape(&self.from),
                escape(&self.to),
                inline(&self.attrs)
            )
        }
    }
}

/// A `cluster_`-prefixed subgraph groups its nodes visually.
#[derive(Debug, Clone)]
pub struct Subgraph {
    pub id: String,
    pub cluster: bool,
    pub attrs: Vec<Attr>,
    pub nodes: Vec<Node>,
}

impl fmt::Display for Subgraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cluster {
            writeln!(f, "subgraph cluster_{} {{", escape(&self.id))?;
        } else {
            writeln!(f, "subgraph {} {{", escape(&self.id))?;
        }
        if !self.attrs.is_empty() {
            writeln!(f, "{}", statements(&self.attrs))?;
        }
        if !self.nodes.is_empty() {
            for node in &self.nodes {
                writeln!(f, "{}", node)?;
            }
        }
        write!(f, "}}")
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    pub id: String,
    pub attrs: Vec<Attr>,
    pub subgraphs: Vec<Subgraph>,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl fmt::Display for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "strict digraph {} {{", escape(&self.id))?;
        if !self.attrs.is_empty() {
            writeln!(f, "{}", statements(&self.attrs))?;
        }
        for subgraph in &self.subgraphs {
            writeln!(f, "{}", subgraph)?;
        }
        for node in &self.nodes {
            writeln!(f, "{}", node)?;
        }
        for edge in &self.edges {
            writeln!(f, "{}", edge)?;
        }
        write!(f, "}}")
    }
}
