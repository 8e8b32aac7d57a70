//! Runs per-document validators and the corpus-level checks, buckets the
//! resulting issues per file and applies the baseline.

use crate::document::{Document, DocumentType};
use crate::fingerprint::Baseline;
use crate::graph::{display_path, ImportGraph};
use crate::issue::{Severity, ValidationIssue};
use crate::references;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

/// A check that looks at one document at a time.
pub trait Validator: Send + Sync {
    fn name(&self) -> &str;
    fn validate(&self, doc: &Document) -> Vec<ValidationIssue>;
}

/// Reports a frontmatter header that could not be parsed.
pub struct FrontmatterCheck;

impl Validator for FrontmatterCheck {
    fn name(&self) -> &str {
        "frontmatter"
    }

    fn validate(&self, doc: &Document) -> Vec<ValidationIssue> {
        match &doc.frontmatter_error {
            Some(err) => vec![ValidationIssue::error(
                &doc.relative_path,
                self.name(),
                format!("Invalid frontmatter: {}", err),
            )],
            None => Vec::new(),
        }
    }
}

/// Issues that only show up when documents are looked at together.
pub struct CrossFileCheck {
    root: PathBuf,
    graph: ImportGraph,
}

impl CrossFileCheck {
    pub fn new(root: impl Into<PathBuf>, corpus: &[Document]) -> Self {
        CrossFileCheck {
            root: root.into(),
            graph: ImportGraph::from_documents(corpus),
        }
    }

    pub fn graph(&self) -> &ImportGraph {
        &self.graph
    }

    pub fn references(&self, doc: &Document) -> Vec<ValidationIssue> {
        references::check_document(doc)
    }

    /// One error per detected cycle, paired with the cycle's members as
    /// root-relative paths in chain order. The issue itself is always filed
    /// against the first member, so its fingerprint does not depend on which
    /// files a run targets.
    pub fn cycles(&self) -> Vec<(Vec<String>, ValidationIssue)> {
        self.graph
            .detect_cycles()
            .iter()
            .map(|c| {
                let members: Vec<String> =
                    c.members().iter().map(|p| display_path(p, &self.root)).collect();
                (members, c.to_issue(&self.root))
            })
            .collect()
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct DocumentResult {
    pub file: String,
    pub doc_type: DocumentType,
    pub errors: Vec<ValidationIssue>,
    pub warnings: Vec<ValidationIssue>,
    pub suggestions: Vec<ValidationIssue>,
    pub passed: bool,
}

impl DocumentResult {
    pub fn new(file: impl Into<String>, doc_type: DocumentType) -> Self {
        DocumentResult {
            file: file.into(),
            doc_type,
            errors: Vec::new(),
            warnings: Vec::new(),
            suggestions: Vec::new(),
            passed: true,
        }
    }

    /// Route an issue to its bucket. Info findings travel with suggestions.
    pub fn push(&mut self, issue: ValidationIssue) {
        match issue.severity {
            Severity::Error => self.errors.push(issue),
            Severity::Warning => self.warnings.push(issue),
            Severity::Suggestion | Severity::Info => self.suggestions.push(issue),
        }
        self.recompute();
    }

    /// Only errors decide pass/fail.
    pub fn recompute(&mut self) {
        self.passed = self.errors.is_empty();
    }

    pub fn issues(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.errors.iter().chain(&self.warnings).chain(&self.suggestions)
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total_files: usize,
    pub passed_files: usize,
    pub failed_files: usize,
    pub total_errors: usize,
    pub total_warnings: usize,
    pub total_suggestions: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[DocumentResult]) -> Self {
        let mut summary = BatchSummary {
            total_files: results.len(),
            ..BatchSummary::default()
        };
        for r in results {
            if r.passed {
                summary.passed_files += 1;
            } else {
                summary.failed_files += 1;
            }
            summary.total_errors += r.errors.len();
            summary.total_warnings += r.warnings.len();
            summary.total_suggestions += r.suggestions.len();
        }
        summary
    }

    pub fn passed(&self) -> bool {
        self.failed_files == 0
    }
}

#[derive(Serialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub total_ignored: usize,
    pub errors_ignored: usize,
    pub suggestions_ignored: usize,
}

/// Drop every issue the baseline already knows, then recompute pass/fail.
/// `None` leaves the results untouched.
pub fn apply_baseline(results: &mut [DocumentResult], baseline: Option<&Baseline>) -> FilterStats {
    let mut stats = FilterStats::default();
    let Some(baseline) = baseline else {
        return stats;
    };

    for result in results.iter_mut() {
        let before = (result.errors.len(), result.warnings.len(), result.suggestions.len());
        result.errors.retain(|i| !baseline.is_known(i));
        result.warnings.retain(|i| !baseline.is_known(i));
        result.suggestions.retain(|i| !baseline.is_known(i));

        let errors = before.0 - result.errors.len();
        let warnings = before.1 - result.warnings.len();
        let suggestions = before.2 - result.suggestions.len();
        stats.errors_ignored += errors;
        stats.suggestions_ignored += suggestions;
        stats.total_ignored += errors + warnings + suggestions;
        result.recompute();
    }

    debug!(ignored = stats.total_ignored, "baseline applied");
    stats
}

/// Everything a run produced, after filtering.
#[derive(Serialize, Debug, Clone)]
pub struct Report {
    pub results: Vec<DocumentResult>,
    pub summary: BatchSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline: Option<FilterStats>,
}

impl Report {
    pub fn new(mut results: Vec<DocumentResult>, baseline: Option<&Baseline>) -> Self {
        let filter = baseline.map(|b| apply_baseline(&mut results, Some(b)));
        let summary = BatchSummary::from_results(&results);
        Report {
            results,
            summary,
            baseline: filter,
        }
    }

    pub fn passed(&self) -> bool {
        self.summary.passed()
    }
}

pub struct Pipeline {
    root: PathBuf,
    validators: Vec<Box<dyn Validator>>,
    cross_file: bool,
}

impl Pipeline {
    /// Pipeline with the built-in checks.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::empty(root).with_validator(FrontmatterCheck)
    }

    /// Cross-file checks only; per-document validators are added by the caller.
    pub fn empty(root: impl Into<PathBuf>) -> Self {
        Pipeline {
            root: root.into(),
            validators: Vec::new(),
            cross_file: true,
        }
    }

    pub fn with_validator(mut self, validator: impl Validator + 'static) -> Self {
        self.validators.push(Box::new(validator));
        self
    }

    pub fn without_cross_file(mut self) -> Self {
        self.cross_file = false;
        self
    }

    /// Validate `targets` (every document when `None`) with the whole corpus as context.
    pub fn run(&self, corpus: &[Document], targets: Option<&[PathBuf]>) -> Vec<DocumentResult> {
        let wanted: Option<HashSet<&Path>> =
            targets.map(|t| t.iter().map(PathBuf::as_path).collect());
        let selected: Vec<&Document> = corpus
            .iter()
            .filter(|d| wanted.as_ref().map_or(true, |w| w.contains(d.path.as_path())))
            .collect();

        let cross = self.cross_file.then(|| CrossFileCheck::new(&self.root, corpus));

        let mut results: Vec<DocumentResult> = Vec::with_capacity(selected.len());
        let mut index: HashMap<String, usize> = HashMap::new();
        for doc in &selected {
            let mut result = DocumentResult::new(&doc.relative_path, doc.doc_type);
            for validator in &self.validators {
                for issue in validator.validate(doc) {
                    result.push(issue);
                }
            }
            if let Some(cross) = &cross {
                for issue in cross.references(doc) {
                    result.push(issue);
                }
            }
            index.insert(doc.relative_path.clone(), results.len());
            results.push(result);
        }

        // A cycle is shown on its first member, or on the first member the
        // run actually targets when that one is left out.
        if let Some(cross) = &cross {
            for (members, issue) in cross.cycles() {
                if let Some(&i) = members.iter().find_map(|m| index.get(m)) {
                    results[i].push(issue);
                }
            }
        }

        results
    }

    /// Flat list of every issue in `results`, e.g. to snapshot a baseline.
    pub fn collect_issues(results: &[DocumentResult]) -> Vec<ValidationIssue> {
        results.iter().flat_map(|r| r.issues().cloned()).collect()
    }
}
