//! Stable issue fingerprints and the baseline of accepted issues.
//!
//! A fingerprint hashes `(file, source, normalized message)`. Normalization
//! masks the parts of a message that drift between runs without changing what
//! the issue is about: quoted values, numbers and spacing. Line numbers never
//! enter the hash.

use crate::error::{Error, Result};
use crate::issue::ValidationIssue;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

pub const BASELINE_VERSION: &str = "1.0";
pub const DEFAULT_BASELINE_FILE: &str = ".agentlint-baseline.json";

const QUOTED_PLACEHOLDER: &str = "\"*\"";
const SINGLE_QUOTED_PLACEHOLDER: &str = "'*'";
const NUMBER_PLACEHOLDER: &str = "N";

static DOUBLE_QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"]*""#).expect("double quote pattern"));

// Opening quote must follow whitespace, `(`, `[` or start of text so contractions
// like "doesn't" are left alone. The closing side is checked by hand.
static SINGLE_QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(^|[\s(\[])'[^']*'").expect("single quote pattern"));

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d+\b").expect("number pattern"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern"));

fn closes_quote(next: Option<char>) -> bool {
    match next {
        None => true,
        Some(c) => c.is_whitespace() || (c.is_ascii_punctuation() && c != '\''),
    }
}

fn mask_single_quoted(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut last = 0;
    for caps in SINGLE_QUOTED_RE.captures_iter(message) {
        let whole = caps.get(0).expect("match");
        if !closes_quote(message[whole.end()..].chars().next()) {
            continue;
        }
        let lead = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        out.push_str(&message[last..whole.start()]);
        out.push_str(lead);
        out.push_str(SINGLE_QUOTED_PLACEHOLDER);
        last = whole.end();
    }
    out.push_str(&message[last..]);
    out
}

/// Mask quoted values and numbers, then collapse whitespace.
pub fn normalize_message(message: &str) -> String {
    let masked = DOUBLE_QUOTED_RE.replace_all(message, QUOTED_PLACEHOLDER);
    let masked = mask_single_quoted(&masked);
    let masked = NUMBER_RE.replace_all(&masked, NUMBER_PLACEHOLDER);
    WHITESPACE_RE.replace_all(masked.trim(), " ").into_owned()
}

/// Lowercase hex SHA-256 of the issue's stable identity.
pub fn fingerprint(issue: &ValidationIssue) -> String {
    let mut hasher = Sha256::new();
    hasher.update(issue.file.as_bytes());
    hasher.update([0u8]);
    hasher.update(issue.source.as_bytes());
    hasher.update([0u8]);
    hasher.update(normalize_message(&issue.message).as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
struct BaselineFile {
    version: String,
    created_at: String,
    fingerprints: Vec<String>,
}

/// A snapshot of accepted issues. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    pub version: String,
    pub created_at: String,
    fingerprints: BTreeSet<String>,
}

impl Baseline {
    /// Snapshot the given issues. Duplicates collapse to one fingerprint.
    pub fn create(issues: &[ValidationIssue]) -> Self {
        Baseline {
            version: BASELINE_VERSION.to_string(),
            created_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            fingerprints: issues.iter().map(fingerprint).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    /// Fingerprints in sorted order.
    pub fn fingerprints(&self) -> impl Iterator<Item = &str> {
        self.fingerprints.iter().map(String::as_str)
    }

    pub fn contains(&self, fingerprint: &str) -> bool {
        self.fingerprints.contains(fingerprint)
    }

    pub fn is_known(&self, issue: &ValidationIssue) -> bool {
        self.contains(&fingerprint(issue))
    }

    pub fn to_json(&self) -> Result<String> {
        let file = BaselineFile {
            version: self.version.clone(),
            created_at: self.created_at.clone(),
            fingerprints: self.fingerprints.iter().cloned().collect(),
        };
        Ok(serde_json::to_string_pretty(&file)? + "\n")
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        fs::write(path, self.to_json()?).map_err(|e| Error::io(path, e))?;
        info!(path = %path.display(), fingerprints = self.len(), "baseline written");
        Ok(())
    }

    /// Read a baseline file. Missing and malformed files are both errors;
    /// use [`Error::is_not_found`] to tell them apart.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let file: BaselineFile =
            serde_json::from_str(&content).map_err(|source| Error::MalformedBaseline {
                path: path.to_path_buf(),
                source,
            })?;

        let major = file.version.split('.').next().unwrap_or_default();
        if major != "1" {
            return Err(Error::BaselineVersion {
                found: file.version,
                expected: BASELINE_VERSION,
            });
        }

        Ok(Baseline {
            version: file.version,
            created_at: file.created_at,
            fingerprints: file.fingerprints.into_iter().collect(),
        })
    }

    /// Load for a normal lint run: a missing file means no baseline, a broken
    /// one is logged and skipped.
    pub fn load_optional(path: &Path) -> Option<Self> {
        match Self::load(path) {
            Ok(baseline) => {
                debug!(path = %path.display(), fingerprints = baseline.len(), "baseline loaded");
                Some(baseline)
            }
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "no baseline");
                None
            }
            Err(e) => {
                warn!("ignoring baseline: {}", e);
                None
            }
        }
    }
}

/// Membership test that tolerates "no baseline loaded".
pub fn is_known(baseline: Option<&Baseline>, issue: &ValidationIssue) -> bool {
    baseline.map(|b| b.is_known(issue)).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::Severity;

    fn issue(file: &str, message: &str) -> ValidationIssue {
        ValidationIssue::new(file, Severity::Error, "frontmatter", message)
    }

    #[test]
    fn test_fingerprint_ignores_line() {
        let msg = "Name 'test-agent' doesn't match filename 'other-name'";
        let a = issue("agents/test-agent.md", msg).at_line(10);
        let b = issue("agents/test-agent.md", msg).at_line(20);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a).len(), 64);
    }

    #[test]
    fn test_fingerprint_sensitive_to_substance() {
        let a = issue("agents/a.md", "Missing required field name");
        let b = issue("agents/a.md", "Missing required field model");
        let c = issue("agents/b.md", "Missing required field name");
        let d = ValidationIssue::error("agents/a.md", "schema", "Missing required field name");
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
        assert_ne!(fingerprint(&a), fingerprint(&d));
    }

    #[test]
    fn test_normalize_masks_quotes_and_numbers() {
        assert_eq!(
            normalize_message("Name 'test-agent' doesn't match filename 'other-name'"),
            "Name '*' doesn't match filename '*'"
        );
        assert_eq!(
            normalize_message("Value \"opus 4\" exceeds   limit of 200\tchars"),
            "Value \"*\" exceeds limit of N chars"
        );
        assert_eq!(normalize_message("Line 12: v2 uses 10ms"), "Line N: v2 uses 10ms");
    }

    #[test]
    fn test_normalize_leaves_contractions() {
        assert_eq!(normalize_message("it's fine, isn't it"), "it's fine, isn't it");
        assert_eq!(normalize_message("'x'y and 'z'."), "'x'y and '*'.");
    }

    #[test]
    fn test_normalize_idempotent() {
        let samples = [
            "Name 'a' doesn't match 'b'",
            "  lots\n of   space 42 ",
            "mixed \"q 1\" and 'q 2' and 3",
            "'x'5 then a\"b\"'c'",
            "",
        ];
        for s in samples {
            let once = normalize_message(s);
            assert_eq!(normalize_message(&once), once, "input: {:?}", s);
        }
    }

    #[test]
    fn test_create_dedupes_and_sorts() {
        let issues = vec![
            issue("a.md", "problem one"),
            issue("b.md", "problem two"),
            issue("a.md", "problem one"),
        ];
        let baseline = Baseline::create(&issues);
        assert_eq!(baseline.len(), 2);
        assert_eq!(baseline.version, BASELINE_VERSION);

        let fps: Vec<&str> = baseline.fingerprints().collect();
        let mut sorted = fps.clone();
        sorted.sort();
        assert_eq!(fps, sorted);
    }

    #[test]
    fn test_save_load_round_trip() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("baseline.json");
        let issues = vec![issue("a.md", "problem one"), issue("b.md", "problem two")];

        let baseline = Baseline::create(&issues);
        baseline.save(&path).unwrap();
        let loaded = Baseline::load(&path).unwrap();

        assert_eq!(loaded, baseline);
        assert!(issues.iter().all(|i| loaded.is_known(i)));
        assert!(!loaded.is_known(&issue("c.md", "problem three")));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"createdAt\""));
        assert!(raw.contains("\"version\": \"1.0\""));
    }

    #[test]
    fn test_load_missing_and_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = Baseline::load(&tmp.path().join("nope.json")).unwrap_err();
        assert!(missing.is_not_found());

        let bad = tmp.path().join("bad.json");
        fs::write(&bad, "{ not json").unwrap();
        let err = Baseline::load(&bad).unwrap_err();
        assert!(matches!(err, Error::MalformedBaseline { .. }));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_load_rejects_future_version() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("b.json");
        let raw = r#"{"version":"2.0","createdAt":"2026-01-01T00:00:00Z","fingerprints":[]}"#;
        fs::write(&path, raw).unwrap();
        assert!(matches!(Baseline::load(&path), Err(Error::BaselineVersion { .. })));
    }

    #[test]
    fn test_load_optional_never_fails() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Baseline::load_optional(&tmp.path().join("absent.json")).is_none());

        let bad = tmp.path().join("bad.json");
        fs::write(&bad, "[]").unwrap();
        assert!(Baseline::load_optional(&bad).is_none());

        let good = tmp.path().join("good.json");
        Baseline::create(&[issue("a.md", "x")]).save(&good).unwrap();
        assert_eq!(Baseline::load_optional(&good).map(|b| b.len()), Some(1));
    }

    #[test]
    fn test_is_known_without_baseline() {
        assert!(!is_known(None, &issue("a.md", "x")));
    }
}
