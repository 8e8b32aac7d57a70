use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    Agent,
    Skill,
    Command,
    Memory,
    Rule,
    Other,
}

impl DocumentType {
    /// Classify a file by its position in the corpus.
    pub fn classify(relative: &Path) -> DocumentType {
        let file_name = relative.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        let in_dir = |dir: &str| relative.components().any(|c| c.as_os_str() == dir);

        if file_name == "SKILL.md" && in_dir("skills") {
            DocumentType::Skill
        } else if file_name == "CLAUDE.md" {
            DocumentType::Memory
        } else if in_dir("agents") {
            DocumentType::Agent
        } else if in_dir("commands") {
            DocumentType::Command
        } else if in_dir("rules") {
            DocumentType::Rule
        } else {
            DocumentType::Other
        }
    }

    /// Types whose references/ directory is expected to be kept in step with the body.
    pub fn owns_references(self) -> bool {
        matches!(self, DocumentType::Skill)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DocumentType::Agent => "agent",
            DocumentType::Skill => "skill",
            DocumentType::Command => "command",
            DocumentType::Memory => "memory",
            DocumentType::Rule => "rule",
            DocumentType::Other => "other",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A frontmatter value. Validators match on this instead of poking at raw YAML.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum FieldValue {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<FieldValue>),
    Map(BTreeMap<String, FieldValue>),
}

impl FieldValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Convert a YAML node. Nulls have no counterpart and yield `None`.
    pub fn from_yaml(value: serde_yaml::Value) -> Option<FieldValue> {
        use serde_yaml::Value;
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(FieldValue::Bool(b)),
            Value::Number(n) => n.as_f64().map(FieldValue::Number),
            Value::String(s) => Some(FieldValue::String(s)),
            Value::Sequence(items) => Some(FieldValue::List(
                items.into_iter().filter_map(FieldValue::from_yaml).collect(),
            )),
            Value::Mapping(map) => Some(FieldValue::Map(
                map.into_iter()
                    .filter_map(|(k, v)| Some((yaml_key(k)?, FieldValue::from_yaml(v)?)))
                    .collect(),
            )),
            Value::Tagged(tagged) => FieldValue::from_yaml(tagged.value),
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> Option<String> {
    use serde_yaml::Value;
    match key {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

pub type Fields = BTreeMap<String, FieldValue>;

/// Split a leading `---` YAML header off `content` and parse it.
///
/// Returns the parsed fields and, if the header exists but is not valid YAML
/// mapping, the parse error message. No header means no fields and no error.
pub fn parse_frontmatter(content: &str) -> (Fields, Option<String>) {
    let mut lines = content.lines();
    if lines.next().map(str::trim_end) != Some("---") {
        return (Fields::new(), None);
    }

    let mut header = Vec::new();
    let mut closed = false;
    for line in lines {
        if line.trim_end() == "---" {
            closed = true;
            break;
        }
        header.push(line);
    }
    if !closed {
        return (Fields::new(), Some("frontmatter is not closed with '---'".to_string()));
    }

    match serde_yaml::from_str::<serde_yaml::Value>(&header.join("\n")) {
        Ok(serde_yaml::Value::Mapping(map)) => {
            let fields = map
                .into_iter()
                .filter_map(|(k, v)| Some((yaml_key(k)?, FieldValue::from_yaml(v)?)))
                .collect();
            (fields, None)
        }
        Ok(serde_yaml::Value::Null) => (Fields::new(), None),
        Ok(_) => (Fields::new(), Some("frontmatter must be a mapping".to_string())),
        Err(e) => (Fields::new(), Some(e.to_string())),
    }
}

/// One file of the corpus, read once per run.
#[derive(Serialize, Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub relative_path: String,
    #[serde(skip)]
    pub content: String,
    pub doc_type: DocumentType,
    pub fields: Fields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frontmatter_error: Option<String>,
}

impl Document {
    pub fn new(
        path: impl Into<PathBuf>,
        relative_path: impl Into<String>,
        content: impl Into<String>,
        doc_type: DocumentType,
    ) -> Self {
        let content = content.into();
        let (fields, frontmatter_error) = parse_frontmatter(&content);
        Document {
            path: path.into(),
            relative_path: relative_path.into(),
            content,
            doc_type,
            fields,
            frontmatter_error,
        }
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify() {
        assert_eq!(DocumentType::classify(Path::new("skills/pdf/SKILL.md")), DocumentType::Skill);
        assert_eq!(DocumentType::classify(Path::new("agents/reviewer.md")), DocumentType::Agent);
        assert_eq!(DocumentType::classify(Path::new("commands/ship.md")), DocumentType::Command);
        assert_eq!(DocumentType::classify(Path::new("CLAUDE.md")), DocumentType::Memory);
        assert_eq!(DocumentType::classify(Path::new("rules/style.md")), DocumentType::Rule);
        assert_eq!(DocumentType::classify(Path::new("docs/notes.md")), DocumentType::Other);
        // A stray markdown file inside a skill is not the skill itself
        assert_eq!(DocumentType::classify(Path::new("skills/pdf/notes.md")), DocumentType::Other);
    }

    #[test]
    fn test_parse_frontmatter_typed_values() {
        let content = "---\nname: reviewer\nmodel: 3\nenabled: true\n\
                       tools:\n  - Read\n  - Grep\n\
                       meta:\n  owner: docs\nempty:\n---\n# Body\n";
        let (fields, err) = parse_frontmatter(content);

        assert!(err.is_none());
        assert_eq!(fields.get("name").and_then(FieldValue::as_str), Some("reviewer"));
        assert_eq!(fields.get("model"), Some(&FieldValue::Number(3.0)));
        assert_eq!(fields.get("enabled"), Some(&FieldValue::Bool(true)));
        assert_eq!(fields.get("tools").and_then(FieldValue::as_list).map(|l| l.len()), Some(2));
        assert!(matches!(fields.get("meta"), Some(FieldValue::Map(m)) if m.contains_key("owner")));
        assert!(!fields.contains_key("empty"));
    }

    #[test]
    fn test_parse_frontmatter_absent_and_broken() {
        let (fields, err) = parse_frontmatter("# Just a heading\n");
        assert!(fields.is_empty());
        assert!(err.is_none());

        let (fields, err) = parse_frontmatter("---\nname: [unclosed\n---\n");
        assert!(fields.is_empty());
        assert!(err.is_some());

        let (_, err) = parse_frontmatter("---\nname: x\n");
        assert!(err.unwrap().contains("not closed"));
    }
}
