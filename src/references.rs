//! Resolution of `references/` mentions against each document's companion directory.

use crate::document::Document;
use crate::extract::extract_references;
use crate::issue::{ValidationIssue, CROSS_FILE};
use ignore::WalkBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const REFERENCES_DIR: &str = "references";

/// Per-document partition of reference filenames. The three sets never overlap.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceState {
    pub resolved: BTreeSet<String>,
    /// Mentioned in the body, missing on disk.
    pub phantom: BTreeSet<String>,
    /// On disk, never mentioned.
    pub orphaned: BTreeSet<String>,
}

impl ReferenceState {
    pub fn new(mentioned: &[String], present: &BTreeSet<String>) -> Self {
        let mut state = ReferenceState::default();
        for name in mentioned {
            if present.contains(name) {
                state.resolved.insert(name.clone());
            } else {
                state.phantom.insert(name.clone());
            }
        }
        state.orphaned = present
            .iter()
            .filter(|name| !state.resolved.contains(*name))
            .cloned()
            .collect();
        state
    }

    pub fn is_clean(&self) -> bool {
        self.phantom.is_empty() && self.orphaned.is_empty()
    }
}

pub fn companion_dir(doc_path: &Path) -> PathBuf {
    doc_path
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(REFERENCES_DIR)
}

/// Filenames of every regular file under `dir`, at any depth, keyed the same
/// way mentions are: by bare filename. A missing directory is empty.
pub fn list_reference_files(dir: &Path) -> BTreeSet<String> {
    if !dir.is_dir() {
        return BTreeSet::new();
    }

    let mut names = BTreeSet::new();
    for entry in WalkBuilder::new(dir).standard_filters(false).build() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                debug!(dir = %dir.display(), error = %e, "cannot list references");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.insert(name.to_string());
        }
    }
    names
}

/// Whether a document takes part in reference checking at all.
pub fn should_check(doc: &Document) -> bool {
    doc.doc_type.owns_references() || companion_dir(&doc.path).is_dir()
}

pub fn reference_state(doc: &Document) -> (Vec<String>, ReferenceState) {
    let mentioned = extract_references(&doc.content);
    let present = list_reference_files(&companion_dir(&doc.path));
    let state = ReferenceState::new(&mentioned, &present);
    (mentioned, state)
}

/// Phantom references become errors, orphaned ones become info.
pub fn check_document(doc: &Document) -> Vec<ValidationIssue> {
    if !should_check(doc) {
        return Vec::new();
    }

    let (mentioned, state) = reference_state(doc);
    let mut issues = Vec::new();

    for name in mentioned.iter().filter(|n| state.phantom.contains(*n)) {
        issues.push(ValidationIssue::error(
            &doc.relative_path,
            CROSS_FILE,
            format!("Referenced file {}/{} does not exist", REFERENCES_DIR, name),
        ));
    }

    let owner = doc
        .path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| doc.relative_path.clone());
    for name in &state.orphaned {
        issues.push(ValidationIssue::info(
            &doc.relative_path,
            CROSS_FILE,
            format!(
                "Reference file {}/{} is not mentioned in {}",
                REFERENCES_DIR, name, owner
            ),
        ));
    }

    issues
}
