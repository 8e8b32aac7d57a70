use crate::document::{Document, DocumentType};
use crate::error::{Error, Result};
use crate::references::REFERENCES_DIR;
use globset::GlobSet;
use ignore::WalkBuilder;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::{debug, warn};

/// Source of the corpus for one run.
pub trait Discovery: Send + Sync {
    fn discover(&self) -> Result<Vec<Document>>;
}

/// Gitignore-aware filesystem walk rooted at one directory.
#[derive(Debug, Clone)]
pub struct FsDiscovery {
    root: PathBuf,
    extensions: HashSet<String>,
    exclude: GlobSet,
}

impl FsDiscovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        FsDiscovery {
            root: root.into(),
            extensions: ["md".to_string()].into_iter().collect(),
            exclude: GlobSet::empty(),
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.extensions = extensions
            .into_iter()
            .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
            .filter(|e| !e.is_empty())
            .collect();
        self
    }

    pub fn with_exclude(mut self, exclude: GlobSet) -> Self {
        self.exclude = exclude;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn wanted(&self, relative: &Path) -> bool {
        let ext = relative
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();
        if !self.extensions.contains(&ext) {
            return false;
        }
        // Companion material belongs to its owning document.
        if relative.components().any(|c| c.as_os_str() == REFERENCES_DIR) {
            return false;
        }
        !self.exclude.is_match(relative)
    }
}

impl Discovery for FsDiscovery {
    fn discover(&self) -> Result<Vec<Document>> {
        let root = fs::canonicalize(&self.root).map_err(|e| Error::io(&self.root, e))?;

        let mut builder = WalkBuilder::new(&root);
        // Agent configs commonly live under .claude/, so hidden dirs are walked.
        builder
            .hidden(false)
            .git_ignore(true)
            .git_global(true)
            .filter_entry(|e| e.file_name() != ".git");

        let mut documents = Vec::new();
        for entry in builder.build() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(&root).unwrap_or(path);
            if !self.wanted(relative) {
                continue;
            }

            let content = match fs::read_to_string(path) {
                Ok(content) => content,
                Err(e) => {
                    warn!(file = %path.display(), error = %e, "skipping unreadable document");
                    continue;
                }
            };

            let doc_type = DocumentType::classify(relative);
            let rel = relative.to_string_lossy().replace('\\', "/");
            documents.push(Document::new(path, rel, content, doc_type));
        }

        documents.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
        debug!(root = %root.display(), documents = documents.len(), "corpus discovered");
        Ok(documents)
    }
}

/// Memoized discovery shared by every check in one process run.
///
/// The first `get` runs discovery; concurrent callers block until it finishes
/// and all observe the same corpus (or the same failure).
pub struct CorpusCache<D> {
    discovery: D,
    corpus: OnceLock<std::result::Result<Arc<[Document]>, String>>,
}

impl<D: Discovery> CorpusCache<D> {
    pub fn new(discovery: D) -> Self {
        CorpusCache {
            discovery,
            corpus: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Result<Arc<[Document]>> {
        let cached = self
            .corpus
            .get_or_init(|| self.discovery.discover().map(Arc::from).map_err(|e| e.to_string()));
        match cached {
            Ok(docs) => Ok(Arc::clone(docs)),
            Err(msg) => Err(Error::Discovery(msg.clone())),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.corpus.get().is_some()
    }

    /// Look up one document by absolute path.
    pub fn find(&self, path: &Path) -> Result<Option<Document>> {
        Ok(self.get()?.iter().find(|d| d.path == path).cloned())
    }

    pub fn discovery(&self) -> &D {
        &self.discovery
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use globset::{Glob, GlobSetBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, body).unwrap();
    }

    #[test]
    fn test_fs_discovery_classifies_and_skips_references() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "agents/reviewer.md", "---\nname: reviewer\n---\n");
        write(tmp.path(), "skills/pdf/SKILL.md", "# PDF\n");
        write(tmp.path(), "skills/pdf/references/forms.md", "# forms\n");
        write(tmp.path(), ".claude/commands/ship.md", "# ship\n");
        write(tmp.path(), "notes.txt", "not markdown\n");

        let docs = FsDiscovery::new(tmp.path()).discover().unwrap();
        let rels: Vec<&str> = docs.iter().map(|d| d.relative_path.as_str()).collect();
        assert_eq!(
            rels,
            vec![".claude/commands/ship.md", "agents/reviewer.md", "skills/pdf/SKILL.md"]
        );

        assert_eq!(docs[0].doc_type, DocumentType::Command);
        assert_eq!(docs[1].doc_type, DocumentType::Agent);
        assert_eq!(docs[2].doc_type, DocumentType::Skill);
        assert!(docs.iter().all(|d| d.path.is_absolute()));
        assert_eq!(docs[1].field("name").and_then(|v| v.as_str()), Some("reviewer"));
    }

    #[test]
    fn test_fs_discovery_excludes_and_extensions() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "agents/a.md", "");
        write(tmp.path(), "drafts/b.md", "");
        write(tmp.path(), "rules/c.mdx", "");

        let mut exclude = GlobSetBuilder::new();
        exclude.add(Glob::new("drafts/**").unwrap());
        let docs = FsDiscovery::new(tmp.path())
            .with_extensions([".md", "MDX"])
            .with_exclude(exclude.build().unwrap())
            .discover()
            .unwrap();

        let rels: Vec<&str> = docs.iter().map(|d| d.relative_path.as_str()).collect();
        assert_eq!(rels, vec!["agents/a.md", "rules/c.mdx"]);
    }

    #[test]
    fn test_fs_discovery_missing_root_is_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = FsDiscovery::new(tmp.path().join("absent")).discover().unwrap_err();
        assert!(err.is_not_found());
    }

    struct Counting {
        calls: AtomicUsize,
    }

    impl Discovery for Counting {
        fn discover(&self) -> Result<Vec<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(std::time::Duration::from_millis(20));
            Ok(vec![Document::new("/c/a.md", "a.md", "", DocumentType::Other)])
        }
    }

    #[test]
    fn test_cache_discovers_at_most_once() {
        let cache = CorpusCache::new(Counting { calls: AtomicUsize::new(0) });
        assert!(!cache.is_loaded());

        let results: Vec<Arc<[Document]>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| cache.get().unwrap())).collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(cache.discovery().calls.load(Ordering::SeqCst), 1);
        assert!(results.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert!(cache.find(Path::new("/c/a.md")).unwrap().is_some());
        assert!(cache.find(Path::new("/c/b.md")).unwrap().is_none());
    }

    struct Failing;

    impl Discovery for Failing {
        fn discover(&self) -> Result<Vec<Document>> {
            Err(Error::Discovery("boom".to_string()))
        }
    }

    #[test]
    fn test_cache_remembers_failure() {
        let cache = CorpusCache::new(Failing);
        assert!(cache.get().is_err());
        assert!(cache.is_loaded());
        assert!(matches!(cache.get(), Err(Error::Discovery(msg)) if msg.contains("boom")));
    }
}
