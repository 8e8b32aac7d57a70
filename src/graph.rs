//! Import graph over the corpus and circular-import detection.

use crate::document::Document;
use crate::extract::extract_imports;
use crate::issue::{ValidationIssue, CROSS_FILE};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Directed graph: absolute file path -> imported absolute paths, in citation order.
#[derive(Debug, Clone)]
pub struct ImportGraph {
    edges: BTreeMap<PathBuf, Vec<PathBuf>>,
    home: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Color {
    White,
    Gray,
    Black,
}

/// A closed import chain `[n0, n1, ..., n0]`.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    pub nodes: Vec<PathBuf>,
}

impl ImportGraph {
    /// Graph that expands `~` using `$HOME`.
    pub fn new() -> Self {
        Self::with_home(std::env::var_os("HOME").map(PathBuf::from))
    }

    /// Graph with an explicit home directory; `None` drops every `~` citation.
    pub fn with_home(home: Option<PathBuf>) -> Self {
        ImportGraph {
            edges: BTreeMap::new(),
            home,
        }
    }

    pub fn from_documents(documents: &[Document]) -> Self {
        let mut graph = Self::new();
        for doc in documents {
            graph.add_file(&doc.path, &extract_imports(&doc.content));
        }
        graph
    }

    /// Record (or replace) the outgoing edges of `path`.
    pub fn add_file(&mut self, path: &Path, citations: &[String]) {
        let from = clean_path(path);
        let targets: Vec<PathBuf> = citations
            .iter()
            .filter_map(|c| self.resolve(&from, c))
            .collect();
        debug!(file = %from.display(), imports = targets.len(), "import edges");
        self.edges.insert(from, targets);
    }

    /// Resolve one citation relative to the importing file.
    pub fn resolve(&self, from: &Path, citation: &str) -> Option<PathBuf> {
        let resolved = if citation == "~" {
            self.home.clone()?
        } else if let Some(rest) = citation.strip_prefix("~/") {
            self.home.as_ref()?.join(rest)
        } else if citation.starts_with("./") || citation.starts_with("../") {
            from.parent()?.join(citation)
        } else {
            return None;
        };
        Some(clean_path(&resolved))
    }

    pub fn imports_of(&self, path: &Path) -> &[PathBuf] {
        self.edges.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn files(&self) -> impl Iterator<Item = &Path> {
        self.edges.keys().map(PathBuf::as_path)
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    /// Every cycle found by a three-colour depth-first traversal.
    ///
    /// Each back-edge to a node on the active path yields one cycle, so
    /// overlapping cycles through the same ancestor are all reported.
    /// Uses an explicit stack; deep import chains cannot overflow.
    pub fn detect_cycles(&self) -> Vec<Cycle> {
        let mut color: HashMap<&Path, Color> = HashMap::new();
        let mut cycles = Vec::new();

        for root in self.files() {
            if color.get(root).copied().unwrap_or(Color::White) != Color::White {
                continue;
            }

            color.insert(root, Color::Gray);
            let mut path: Vec<&Path> = vec![root];
            let mut stack: Vec<(&Path, usize)> = vec![(root, 0)];

            while let Some(frame) = stack.last_mut() {
                let node = frame.0;
                let imports = self.imports_of(node);

                if frame.1 >= imports.len() {
                    color.insert(node, Color::Black);
                    path.pop();
                    stack.pop();
                    continue;
                }

                let next = imports[frame.1].as_path();
                frame.1 += 1;

                match color.get(next).copied().unwrap_or(Color::White) {
                    Color::White => {
                        color.insert(next, Color::Gray);
                        path.push(next);
                        stack.push((next, 0));
                    }
                    Color::Gray => {
                        if let Some(start) = path.iter().position(|p| *p == next) {
                            let mut nodes: Vec<PathBuf> =
                                path[start..].iter().map(|p| p.to_path_buf()).collect();
                            nodes.push(next.to_path_buf());
                            debug!(len = nodes.len() - 1, "import cycle");
                            cycles.push(Cycle { nodes });
                        }
                    }
                    Color::Black => {}
                }
            }
        }

        cycles
    }
}

impl Default for ImportGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl Cycle {
    /// Distinct members, without the closing repeat.
    pub fn members(&self) -> &[PathBuf] {
        &self.nodes[..self.nodes.len().saturating_sub(1)]
    }

    /// `a.md -> b.md -> a.md`, with paths shown relative to `root` when possible.
    pub fn chain(&self, root: &Path) -> String {
        self.nodes
            .iter()
            .map(|p| display_path(p, root))
            .collect::<Vec<_>>()
            .join(" -> ")
    }

    pub fn to_issue(&self, root: &Path) -> ValidationIssue {
        let file = self.nodes.first().map(|p| display_path(p, root)).unwrap_or_default();
        let message = format!("Circular import detected: {}", self.chain(root));
        ValidationIssue::error(file, CROSS_FILE, message)
    }
}

pub fn display_path(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .to_string()
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
pub fn clean_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for comp in path.components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}
