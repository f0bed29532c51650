//! Run counters and phase timings behind the --profile flag.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::info;

/// Why a qualifying use was dropped without an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropCause {
    /// The occurrence sits outside every top-level declaration.
    NoEnclosingDecl,
    /// The enclosing declaration's name has no symbol entry.
    Unresolved,
    /// Suppressed by a self-loop flag.
    SelfLoop,
}

/// Run counters, shared across the load and the worker pool.
#[derive(Debug, Default)]
pub struct Counters {
    packages: AtomicU64,
    files: AtomicU64,
    defs: AtomicU64,
    uses: AtomicU64,
    targets: AtomicU64,
    edges: AtomicU64,
    dropped_no_decl: AtomicU64,
    dropped_unresolved: AtomicU64,
    dropped_selfloop: AtomicU64,
}

impl Counters {
    pub fn record_package(&self) {
        self.packages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_file(&self) {
        self.files.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_defs(&self, count: usize) {
        self.defs.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn add_uses(&self, count: usize) {
        self.uses.fetch_add(count as u64, Ordering::Relaxed);
    }

    /// A use passed the filter chain.
    pub fn record_target(&self) {
        self.targets.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_edge(&self) {
        self.edges.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_drop(&self, cause: DropCause) {
        let counter = match cause {
            DropCause::NoEnclosingDecl => &self.dropped_no_decl,
            DropCause::Unresolved => &self.dropped_unresolved,
            DropCause::SelfLoop => &self.dropped_selfloop,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn edges(&self) -> u64 {
        self.edges.load(Ordering::Relaxed)
    }

    /// Emits the run profile as structured events on stderr. The caller
    /// times the phases; the streaming phase covers search and rendering
    /// together since edges render as they arrive.
    pub fn report(&self, load_time: Duration, stream_time: Duration) {
        info!(
            packages = self.packages.load(Ordering::Relaxed),
            files = self.files.load(Ordering::Relaxed),
            defs = self.defs.load(Ordering::Relaxed),
            uses = self.uses.load(Ordering::Relaxed),
            elapsed_ms = load_time.as_millis() as u64,
            "load phase"
        );
        info!(
            targets = self.targets.load(Ordering::Relaxed),
            edges = self.edges.load(Ordering::Relaxed),
            dropped_no_decl = self.dropped_no_decl.load(Ordering::Relaxed),
            dropped_unresolved = self.dropped_unresolved.load(Ordering::Relaxed),
            dropped_selfloop = self.dropped_selfloop.load(Ordering::Relaxed),
            elapsed_ms = stream_time.as_millis() as u64,
            "stream phase"
        );
    }
}
