//! Citation extraction from raw document text.
//!
//! Two kinds of citation are recognized:
//!
//! - imports: `@~/path`, `@./path` or `@../path`, captured up to the next
//!   whitespace or backtick, so inline-code citations count. Lines inside
//!   fenced code blocks are ignored.
//! - reference mentions: a path under `references/` written as prose, as a
//!   markdown link target, or as a tool-call argument. Every form is reduced
//!   to the bare filename.
//!
//! Both lists are deduplicated and keep first-occurrence order.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

static IMPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s(\[`])@((?:~|\.\.?)/[^\s`]+)").expect("import pattern")
});

static REF_PROSE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:^|[\s(\[<"'`=:,])(?:\./)?references/([^\s)\]>"'`,;]+)"#)
        .expect("prose pattern")
});

static REF_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\]\(\s*<?(?:\./)?references/([^\s)>#?]+)").expect("link pattern")
});

static REF_TOOL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\w+\(\s*(?:\w+\s*[=:]\s*)?["'`]?(?:\./)?references/([^\s)"'`,]+)"#)
        .expect("tool pattern")
});

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Citations {
    pub imports: Vec<String>,
    pub references: Vec<String>,
}

pub fn extract(text: &str) -> Citations {
    Citations {
        imports: extract_imports(text),
        references: extract_references(text),
    }
}

fn is_fence(line: &str) -> bool {
    line.trim().starts_with("```")
}

pub fn extract_imports(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut imports = Vec::new();
    let mut in_code_block = false;

    for line in text.lines() {
        if is_fence(line) {
            in_code_block = !in_code_block;
            continue;
        }
        if in_code_block {
            continue;
        }
        for caps in IMPORT_RE.captures_iter(line) {
            let target = &caps[1];
            if seen.insert(target.to_string()) {
                imports.push(target.to_string());
            }
        }
    }

    imports
}

/// Reduce a captured `references/...` remainder to its filename.
fn reference_filename(raw: &str) -> Option<&str> {
    let path = raw.split(['#', '?']).next()?;
    let name = path.rsplit('/').next()?;
    let name = name.trim_end_matches(['.', ',', ';', ':', '!', '?', '*', '_']);
    if name.is_empty() || name.chars().all(|c| c == '.') {
        None
    } else {
        Some(name)
    }
}

pub fn extract_references(text: &str) -> Vec<String> {
    let mut hits: Vec<(usize, &str)> = Vec::new();
    for re in [&*REF_PROSE_RE, &*REF_LINK_RE, &*REF_TOOL_RE] {
        for caps in re.captures_iter(text) {
            let m = caps.get(1).expect("capture group 1");
            if let Some(name) = reference_filename(m.as_str()) {
                hits.push((m.start(), name));
            }
        }
    }
    hits.sort_by_key(|(offset, _)| *offset);

    let mut seen = HashSet::new();
    hits.into_iter()
        .filter(|(_, name)| seen.insert(*name))
        .map(|(_, name)| name.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_imports_basic_forms() {
        let text = "See @./b.md and @../shared/c.md.\nAlso @~/.claude/global.md\n";
        assert_eq!(
            extract_imports(text),
            vec!["./b.md", "../shared/c.md.", "~/.claude/global.md"]
        );
    }

    #[test]
    fn test_imports_skip_fenced_blocks() {
        let text =
            "@./real.md\n```md\n@./in-code.md\n```\n  ```\n@./also-code.md\n  ```\n@./after.md";
        assert_eq!(extract_imports(text), vec!["./real.md", "./after.md"]);
    }

    #[test]
    fn test_imports_inside_inline_code() {
        let text = "Load `@./b.md` and `@~/.claude/rules.md` first.";
        assert_eq!(extract_imports(text), vec!["./b.md", "~/.claude/rules.md"]);
    }

    #[test]
    fn test_imports_ignore_non_path_mentions() {
        let text = "ping @alice or mail bob@example.com or @docs/x.md";
        assert!(extract_imports(text).is_empty());
    }

    #[test]
    fn test_imports_dedupe_keeps_first_order() {
        let text = "@./b.md @./a.md\n@./b.md";
        assert_eq!(extract_imports(text), vec!["./b.md", "./a.md"]);
    }

    #[test]
    fn test_reference_forms() {
        let text = "Read references/prose.md first.\n\
                    See [the guide](references/guide.md) or [local](./references/local.md#top).\n\
                    Then Read(\"references/tool.md\") and Read(file_path: 'references/arg.txt').\n";
        assert_eq!(
            extract_references(text),
            vec!["prose.md", "guide.md", "local.md", "tool.md", "arg.txt"]
        );
    }

    #[test]
    fn test_reference_without_filename_is_ignored() {
        let text = "Put files in references/ when needed. Also references/. and references/sub/";
        assert!(extract_references(text).is_empty());
    }

    #[test]
    fn test_reference_nested_normalizes_to_filename() {
        let text = "Check references/api/endpoints.md";
        assert_eq!(extract_references(text), vec!["endpoints.md"]);
    }

    #[test]
    fn test_reference_dedupe_across_forms() {
        let text = "[x](references/foo.md) then references/bar.md then Read(references/foo.md)";
        assert_eq!(extract_references(text), vec!["foo.md", "bar.md"]);
    }

    #[test]
    fn test_other_skill_references_are_not_ours() {
        let text = "Borrowed from skills/pdf/references/forms.md";
        assert!(extract_references(text).is_empty());
    }

    #[test]
    fn test_malformed_text_yields_nothing() {
        let c = extract("```\n@./never.md\n");
        assert_eq!(c, Citations::default());
    }
}
