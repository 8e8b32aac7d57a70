//! agentlint - cross-document checks and issue baselines for agent config corpora.
//!
//! The crate looks at a corpus of markdown documents (agents, skills,
//! commands, ...) as a whole: circular `@` imports, `references/` files that
//! are cited but missing or present but never cited. Every finding can be
//! fingerprinted so a checked-in baseline hides issues that were already
//! accepted, and only new ones are reported.

pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod extract;
pub mod fingerprint;
pub mod graph;
pub mod issue;
pub mod pipeline;
pub mod references;

pub use config::Config;
pub use discovery::{CorpusCache, Discovery, FsDiscovery};
pub use document::{Document, DocumentType, FieldValue};
pub use error::{Error, Result};
pub use fingerprint::{fingerprint, normalize_message, Baseline};
pub use graph::{Cycle, ImportGraph};
pub use issue::{Severity, ValidationIssue};
pub use pipeline::{
    apply_baseline, BatchSummary, DocumentResult, FilterStats, Pipeline, Report, Validator,
};
pub use references::ReferenceState;
