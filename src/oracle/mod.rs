//! Workspace loading: file discovery, parsing, and name resolution.
//!
//! The oracle walks the requested directories, parses every Go file with
//! tree-sitter, and assembles per-package declaration and symbol tables. A
//! second pass resolves identifier uses against those tables, so uses can
//! point at packages that are loaded later in the walk.

mod go;
mod resolve;
mod universe;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use tree_sitter::{Language, Node, Parser};
use walkdir::WalkDir;

use crate::profile::Counters;
use crate::types::{Decl, Location, PkgInfo, Pos, StructInfo, SymbolInfo, UseSite};

use go::GoFile;

/// One loaded Go package: declarations, the symbol table keyed by the
/// position of each declared name, and every resolved identifier use.
#[derive(Debug, Clone, Default)]
pub struct Package {
    pub name: String,
    pub path: String,
    pub decls: Vec<Decl>,
    pub structs: Vec<StructInfo>,
    pub defs: HashMap<Pos, SymbolInfo>,
    pub uses: Vec<UseSite>,
}

/// Everything the load produced.
#[derive(Debug, Default)]
pub struct Workspace {
    pub packages: Vec<Package>,
    pub positions: PosTable,
}

/// Maps global positions back to file:line:column.
#[derive(Debug, Clone, Default)]
pub struct PosTable {
    files: Vec<FileEntry>,
}

#[derive(Debug, Clone)]
struct FileEntry {
    path: String,
    base: Pos,
    end: Pos,
    /// File-relative byte offset of each line start.
    line_starts: Vec<Pos>,
}

impl PosTable {
    fn add_file(&mut self, path: &str, base: Pos, source: &str) {
        let mut line_starts = vec![0];
        for (offset, byte) in source.bytes().enumerate() {
            if byte == b'\n' {
                line_starts.push(offset as Pos + 1);
            }
        }
        self.files.push(FileEntry {
            path: path.to_string(),
            base,
            end: base + source.len() as Pos,
            line_starts,
        });
    }

    pub fn position(&self, pos: Pos) -> Option<Location> {
        let idx = self.files.partition_point(|f| f.end < pos);
        let file = self.files.get(idx)?;
        if pos < file.base {
            return None;
        }
        let rel = pos - file.base;
        let line = file.line_starts.partition_point(|&start| start <= rel);
        let column = rel - file.line_starts[line - 1] + 1;
        Some(Location {
            file: file.path.clone(),
            line: line as u32,
            column,
        })
    }
}

pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    source.get(node.start_byte()..node.end_byte()).unwrap_or("")
}

/// Loads every Go package under the given roots.
///
/// Files get consecutive base offsets in a shared position space, so any
/// [`Pos`] maps back through the returned workspace's [`PosTable`].
pub fn load(dirs: &[PathBuf], counters: &Counters) -> Result<Workspace> {
    let mut parser = Parser::new();
    parser
        .set_language(&Language::new(tree_sitter_go::LANGUAGE))
        .context("failed to load Go grammar")?;

    let mut positions = PosTable::default();
    let mut files: Vec<GoFile> = Vec::new();
    let mut keys: Vec<(String, String)> = Vec::new();
    let mut base: Pos = 1;

    for dir in dirs {
        let module = module_path(dir);
        if module.is_none() {
            debug!(dir = %dir.display(), "no go.mod found, using directory package paths");
        }
        for entry in WalkDir::new(dir)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e))
        {
            let entry = entry.with_context(|| format!("failed to walk {}", dir.display()))?;
            if !entry.file_type().is_file() || !is_go_source(entry.path()) {
                continue;
            }
            let path = entry.path();
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let display = path.display().to_string();
            let file = go::parse_file(&mut parser, &display, base, source)?;

            positions.add_file(&display, base, &file.source);
            base += file.source.len() as Pos + 1;
            keys.push((
                pkg_path_of(dir, module.as_deref(), path),
                file.package_name.clone(),
            ));
            counters.record_file();
            files.push(file);
        }
    }

    Ok(build_workspace(files, keys, positions, counters))
}

/// Groups parsed files into packages and resolves their identifier uses.
fn build_workspace(
    mut files: Vec<GoFile>,
    keys: Vec<(String, String)>,
    positions: PosTable,
    counters: &Counters,
) -> Workspace {
    let mut packages: Vec<Package> = Vec::new();
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut file_pkg: Vec<usize> = Vec::with_capacity(files.len());

    for (file, (path, name)) in files.iter_mut().zip(keys) {
        let idx = *index.entry((path.clone(), name.clone())).or_insert_with(|| {
            packages.push(Package {
                name,
                path,
                ..Package::default()
            });
            counters.record_package();
            packages.len() - 1
        });
        file_pkg.push(idx);

        let pkg = &mut packages[idx];
        let pkg_info = PkgInfo {
            name: pkg.name.clone(),
            path: pkg.path.clone(),
        };
        pkg.decls.append(&mut file.decls);
        pkg.structs.append(&mut file.structs);
        for def in file.defs.drain(..) {
            let pos = def.ident.span.start;
            pkg.defs.insert(
                pos,
                SymbolInfo {
                    exported: go::is_exported(&def.ident.name),
                    name: def.ident.name,
                    pkg: Some(pkg_info.clone()),
                    pos: Some(pos),
                    kind: def.kind,
                    type_str: def.type_str,
                },
            );
        }
    }

    let resolver = resolve::Resolver::new(&packages);
    let mut all_uses: Vec<Vec<UseSite>> = vec![Vec::new(); packages.len()];
    for (file, &idx) in files.iter().zip(&file_pkg) {
        all_uses[idx].extend(resolver.file_uses(file, idx));
    }
    drop(resolver);

    let mut defs = 0;
    let mut uses = 0;
    for (pkg, pkg_uses) in packages.iter_mut().zip(all_uses) {
        pkg.uses = pkg_uses;
        pkg.uses.sort_by_key(|site| site.ident.span.start);
        defs += pkg.defs.len();
        uses += pkg.uses.len();
    }
    counters.add_defs(defs);
    counters.add_uses(uses);
    debug!(packages = packages.len(), defs, uses, "load complete");

    Workspace {
        packages,
        positions,
    }
}

fn is_skipped(entry: &walkdir::DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    if entry.file_type().is_dir() {
        return name.starts_with('.') || matches!(name.as_ref(), "vendor" | "testdata");
    }
    false
}

fn is_go_source(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_test.go") && !name.starts_with('.')
}

/// Module path from the nearest go.mod at or above `dir`.
fn module_path(dir: &Path) -> Option<String> {
    for ancestor in dir.ancestors() {
        let Ok(text) = std::fs::read_to_string(ancestor.join("go.mod")) else {
            continue;
        };
        for line in text.lines() {
            if let Some(rest) = line.trim().strip_prefix("module ") {
                return Some(rest.trim().trim_matches('"').to_string());
            }
        }
    }
    None
}

/// Package path: the module path plus the directory relative to the walk
/// root, or the plain directory when no module is known.
fn pkg_path_of(root: &Path, module: Option<&str>, file: &Path) -> String {
    let dir = file.parent().unwrap_or(root);
    match module {
        Some(module) => {
            let rel = dir
                .strip_prefix(root)
                .ok()
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            if rel.is_empty() {
                module.to_string()
            } else {
                format!("{module}/{rel}")
            }
        }
        None => dir.to_string_lossy().replace('\\', "/"),
    }
}
