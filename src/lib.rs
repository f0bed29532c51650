//! Reference graph generator for Go packages.
//!
//! Loads Go source from disk, resolves identifier uses to their
//! declarations, and streams the resulting use edges into dot or JSON
//! renderers with percentile-scaled visual weights.

pub mod cli;
pub mod oracle;
pub mod profile;
pub mod ranking;
pub mod render;
pub mod search;
pub mod stats;
pub mod types;
