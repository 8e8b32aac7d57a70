use serde::{Deserialize, Serialize};
use std::fmt;

/// Source tag for findings that need more than one document to see.
pub const CROSS_FILE: &str = "cross-file";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Suggestion,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suggestion => "suggestion",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single finding raised against one file.
///
/// Issues are values: validators build them once and nothing downstream
/// mutates them. `source` names the check that raised the issue and is part
/// of the fingerprint; `line` is deliberately not.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub file: String,
    pub message: String,
    pub severity: Severity,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl ValidationIssue {
    pub fn new(
        file: impl Into<String>,
        severity: Severity,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ValidationIssue {
            file: file.into(),
            message: message.into(),
            severity,
            source: source.into(),
            line: None,
        }
    }

    pub fn error(
        file: impl Into<String>,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(file, Severity::Error, source, message)
    }

    pub fn info(
        file: impl Into<String>,
        source: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(file, Severity::Info, source, message)
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.file)?;
        if let Some(line) = self.line {
            write!(f, ":{}", line)?;
        }
        write!(f, ": {} [{}] {}", self.severity, self.source, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_and_without_line() {
        let issue = ValidationIssue::error("agents/a.md", "frontmatter", "missing name");
        assert_eq!(issue.to_string(), "agents/a.md: error [frontmatter] missing name");

        let issue = issue.at_line(3);
        assert_eq!(issue.to_string(), "agents/a.md:3: error [frontmatter] missing name");
    }

    #[test]
    fn test_severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Suggestion).unwrap();
        assert_eq!(json, "\"suggestion\"");
    }
}
