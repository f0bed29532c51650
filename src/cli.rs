use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use regex::Regex;

use crate::render::RenderOptions;
use crate::search::{RegexPair, SearchConfig};

#[derive(Debug, Parser)]
#[command(name = "refgraph")]
#[command(about = "Reference graph generator for Go packages.")]
#[command(version)]
pub struct Cli {
    /// Directories to load
    #[arg(value_name = "DIR", default_value = ".")]
    pub dirs: Vec<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Dot)]
    pub format: Format,

    /// Aggregate per package instead of per symbol
    #[arg(long)]
    pub stat: bool,

    /// Include references into packages outside the load
    #[arg(long)]
    pub foreign: bool,

    /// Include references to predeclared names (len, error, ...)
    #[arg(long)]
    pub builtin: bool,

    /// Include unexported declarations
    #[arg(long)]
    pub private: bool,

    /// Drop self-referencing edges
    #[arg(long)]
    pub no_self_loop: bool,

    /// Keep only symbols whose name matches the pattern
    #[arg(long, value_name = "REGEX")]
    pub accept_name: Option<String>,

    /// Drop symbols whose name matches the pattern
    #[arg(long, value_name = "REGEX")]
    pub deny_name: Option<String>,

    /// Keep only packages whose name matches the pattern
    #[arg(long, value_name = "REGEX")]
    pub accept_pkg: Option<String>,

    /// Drop packages whose name matches the pattern
    #[arg(long, value_name = "REGEX")]
    pub deny_pkg: Option<String>,

    /// Search worker threads
    #[arg(long, default_value_t = 4)]
    pub workers: usize,

    /// Result channel capacity
    #[arg(long, default_value_t = 1000)]
    pub buffer: usize,

    /// Smallest node font size
    #[arg(long, default_value_t = 8)]
    pub fontsize_min: usize,

    /// Largest node font size
    #[arg(long, default_value_t = 24)]
    pub fontsize_max: usize,

    /// Thinnest edge pen width
    #[arg(long, default_value_t = 1)]
    pub penwidth_min: usize,

    /// Thickest edge pen width
    #[arg(long, default_value_t = 1)]
    pub penwidth_max: usize,

    /// Smallest edge layout weight
    #[arg(long, default_value_t = 1)]
    pub weight_min: usize,

    /// Largest edge layout weight
    #[arg(long, default_value_t = 100)]
    pub weight_max: usize,

    /// Report run counters and phase timings on stderr
    #[arg(long)]
    pub profile: bool,

    /// Errors only
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    Dot,
    Json,
}

impl Cli {
    /// Search options for this invocation. Regex patterns compile here,
    /// once, so bad patterns fail before any work starts.
    pub fn search_config(&self) -> Result<SearchConfig> {
        Ok(SearchConfig {
            workers: self.workers.max(1),
            buffer: self.buffer.max(1),
            include_private: self.private,
            include_foreign: self.foreign,
            include_builtin: self.builtin,
            ignore_pkg_selfloop: self.no_self_loop && self.stat && self.format == Format::Dot,
            ignore_use_selfloop: self.no_self_loop && !self.stat && self.format == Format::Dot,
            name_filter: RegexPair::new(
                compile(self.accept_name.as_deref())?,
                compile(self.deny_name.as_deref())?,
            ),
            pkg_filter: RegexPair::new(
                compile(self.accept_pkg.as_deref())?,
                compile(self.deny_pkg.as_deref())?,
            ),
        })
    }

    pub fn render_options(&self) -> RenderOptions {
        RenderOptions {
            fontsize_min: self.fontsize_min,
            fontsize_max: self.fontsize_max,
            penwidth_min: self.penwidth_min,
            penwidth_max: self.penwidth_max,
            weight_min: self.weight_min,
            weight_max: self.weight_max,
        }
    }

    /// Default log level: warnings, raised by --verbose and --profile,
    /// lowered by --quiet. RUST_LOG still overrides it.
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else if self.profile {
            "info"
        } else {
            "warn"
        }
    }
}

fn compile(pattern: Option<&str>) -> Result<Option<Regex>> {
    pattern
        .map(|p| Regex::new(p).with_context(|| format!("bad pattern {p:?}")))
        .transpose()
}
