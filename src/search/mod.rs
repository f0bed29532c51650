pub mod decl;
pub mod field;
pub mod filter;
pub mod node;
pub mod position;

pub use filter::{Filter, RegexPair};
pub use node::{DefNode, GraphNode, NodeKind, PkgRef, RefNode, UseEdge};

use std::collections::HashSet;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use anyhow::{Context, Result};
use tracing::debug;

use crate::oracle::{Package, Workspace};
use crate::profile::{Counters, DropCause};
use crate::types::SymbolInfo;
use decl::DeclSetMap;
use field::FieldOwnerIndex;

/// Search options, assembled from CLI flags.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub workers: usize,
    pub buffer: usize,
    pub include_private: bool,
    pub include_foreign: bool,
    pub include_builtin: bool,
    pub ignore_pkg_selfloop: bool,
    pub ignore_use_selfloop: bool,
    pub name_filter: Option<RegexPair>,
    pub pkg_filter: Option<RegexPair>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            buffer: 1000,
            include_private: false,
            include_foreign: false,
            include_builtin: false,
            ignore_pkg_selfloop: false,
            ignore_use_selfloop: false,
            name_filter: None,
            pkg_filter: None,
        }
    }
}

/// Read-only state shared by all workers, built once before the pool
/// starts.
struct SearchIndex {
    decl_sets: DeclSetMap,
    fields: FieldOwnerIndex,
    filter: Filter,
    loaded: HashSet<String>,
    config: SearchConfig,
}

/// Concurrent search over the loaded packages: resolves every qualifying
/// identifier use into a [`UseEdge`] and streams the edges to the caller.
pub struct Searcher {
    ws: Arc<Workspace>,
    config: SearchConfig,
    counters: Arc<Counters>,
}

impl Searcher {
    pub fn new(ws: Arc<Workspace>, config: SearchConfig, counters: Arc<Counters>) -> Self {
        Self {
            ws,
            config,
            counters,
        }
    }

    /// Spawns the worker pool and returns the result stream. A dispatcher
    /// thread feeds one package at a time into a bounded work queue and
    /// closes the stream only after joining every worker, so the stream
    /// ending means the search is complete. Dropping the stream early stops
    /// the workers at their next send.
    pub fn search(&self) -> Result<mpsc::IntoIter<UseEdge>> {
        let workers = self.config.workers.max(1);
        debug!(
            workers,
            buffer = self.config.buffer,
            packages = self.ws.packages.len(),
            "starting search"
        );
        let index = Arc::new(self.build_index());
        let (tx, rx) = mpsc::sync_channel(self.config.buffer);
        let (work_tx, work_rx) = mpsc::sync_channel::<usize>(workers);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let ws = Arc::clone(&self.ws);
            let index = Arc::clone(&index);
            let counters = Arc::clone(&self.counters);
            let work_rx = Arc::clone(&work_rx);
            let tx = tx.clone();
            let handle = thread::Builder::new()
                .name(format!("refgraph-search-{i}"))
                .spawn(move || loop {
                    // Hold the queue lock only for the receive itself.
                    let received = match work_rx.lock() {
                        Ok(queue) => queue.recv(),
                        Err(_) => break,
                    };
                    let Ok(idx) = received else {
                        break;
                    };
                    let Some(pkg) = ws.packages.get(idx) else {
                        continue;
                    };
                    if search_pkg(pkg, &index, &counters, &tx).is_err() {
                        break;
                    }
                })
                .context("failed to spawn search worker")?;
            handles.push(handle);
        }

        let package_count = self.ws.packages.len();
        thread::Builder::new()
            .name("refgraph-dispatch".into())
            .spawn(move || {
                for idx in 0..package_count {
                    if work_tx.send(idx).is_err() {
                        break;
                    }
                }
                drop(work_tx);
                for handle in handles {
                    let _ = handle.join();
                }
                drop(tx);
            })
            .context("failed to spawn search dispatcher")?;

        Ok(rx.into_iter())
    }

    fn build_index(&self) -> SearchIndex {
        let decl_sets = DeclSetMap::build(&self.ws.packages);
        let fields = FieldOwnerIndex::build(&self.ws.packages);
        let loaded: HashSet<String> = self
            .ws
            .packages
            .iter()
            .map(|pkg| pkg.path.clone())
            .collect();

        let mut filter = Filter::member_of(&decl_sets);
        if !self.config.include_private {
            debug!("searching exported declarations only");
            filter = filter.and(Filter::exported());
        }
        if self.config.include_foreign {
            debug!("including foreign packages");
            filter = filter.or(Filter::foreign_to(loaded.clone()));
        }
        if self.config.include_builtin {
            debug!("including builtins");
            filter = filter.or(Filter::builtin());
        }
        if let Some(pair) = &self.config.pkg_filter {
            filter = filter.and(Filter::pkg_name(pair.clone()));
        }
        if let Some(pair) = &self.config.name_filter {
            filter = filter.and(Filter::name(pair.clone()));
        }

        SearchIndex {
            decl_sets,
            fields,
            filter,
            loaded,
            config: self.config.clone(),
        }
    }
}

/// Resolves one package's qualifying uses into edges. Returns `Err` only
/// when the receiving side is gone.
fn search_pkg(
    pkg: &Package,
    index: &SearchIndex,
    counters: &Counters,
    tx: &mpsc::SyncSender<UseEdge>,
) -> Result<(), mpsc::SendError<UseEdge>> {
    if let Some(pair) = &index.config.pkg_filter {
        if !pair.matches(&pkg.name) {
            return Ok(());
        }
    }
    let Some(decls) = index.decl_sets.get(&pkg.path) else {
        return Ok(());
    };

    let mut targets = 0usize;
    for site in &pkg.uses {
        if !index.filter.pass(&site.target) {
            continue;
        }
        targets += 1;
        counters.record_target();

        if index.config.ignore_pkg_selfloop && same_pkg(&site.target, &pkg.path) {
            counters.record_drop(DropCause::SelfLoop);
            continue;
        }

        // Attribute the occurrence to its enclosing top-level declaration.
        let pos = site.ident.span.start;
        let Some(decl) = position::enclosing(decls, pos) else {
            counters.record_drop(DropCause::NoEnclosingDecl);
            continue;
        };
        let value_index = decl.value_index(pos);
        let ref_sym = decl
            .name_at(pos)
            .and_then(|name| pkg.defs.get(&name.span.start));
        let Some(ref_sym) = ref_sym else {
            counters.record_drop(DropCause::Unresolved);
            continue;
        };

        if index.config.ignore_use_selfloop && same_sym(ref_sym, &site.target) {
            counters.record_drop(DropCause::SelfLoop);
            continue;
        }

        let src = RefNode::new(
            PkgRef::Loaded {
                name: pkg.name.clone(),
                path: pkg.path.clone(),
            },
            ref_sym.clone(),
            site.ident.clone(),
            value_index,
        );
        let owner = site
            .target
            .pkg
            .as_ref()
            .zip(site.target.pos)
            .and_then(|(p, pos)| index.fields.owner(&p.path, pos))
            .map(str::to_string);
        let dst = DefNode::new(def_pkg(&site.target, &index.loaded), site.target.clone(), owner);

        tx.send(UseEdge { src, dst })?;
        counters.record_edge();
    }
    debug!(pkg = %pkg.path, targets, "searched package");
    Ok(())
}

fn def_pkg(sym: &SymbolInfo, loaded: &HashSet<String>) -> PkgRef {
    match &sym.pkg {
        None => PkgRef::Builtin,
        Some(pkg) if loaded.contains(&pkg.path) => PkgRef::Loaded {
            name: pkg.name.clone(),
            path: pkg.path.clone(),
        },
        Some(pkg) => PkgRef::Foreign {
            name: pkg.name.clone(),
            path: pkg.path.clone(),
        },
    }
}

fn same_pkg(def: &SymbolInfo, ref_pkg_path: &str) -> bool {
    def.pkg.as_ref().map_or(false, |p| p.path == ref_pkg_path)
}

/// Whether the two symbols resolve to the same definition. Builtins have no
/// position, so any two builtins compare equal.
fn same_sym(left: &SymbolInfo, right: &SymbolInfo) -> bool {
    match (&left.pkg, &right.pkg) {
        (None, None) => true,
        (Some(l), Some(r)) => l.path == r.path && left.pos == right.pos,
        _ => false,
    }
}
