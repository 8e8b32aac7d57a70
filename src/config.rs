use crate::discovery::FsDiscovery;
use crate::error::{Error, Result};
use crate::fingerprint::DEFAULT_BASELINE_FILE;
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = ".agentlint.toml";

/// Contents of `.agentlint.toml`. Every key is optional.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub root: PathBuf,
    pub baseline: PathBuf,
    pub extensions: Vec<String>,
    pub exclude: Vec<String>,
    pub use_baseline: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            root: PathBuf::from("."),
            baseline: PathBuf::from(DEFAULT_BASELINE_FILE),
            extensions: vec!["md".to_string()],
            exclude: Vec::new(),
            use_baseline: true,
        }
    }
}

impl Config {
    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Config> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(Error::io(path, e)),
        };
        Self::parse(&raw, path)
    }

    pub fn parse(raw: &str, path: &Path) -> Result<Config> {
        toml::from_str(raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Baseline location; relative paths are taken from the corpus root.
    pub fn baseline_path(&self) -> PathBuf {
        self.root.join(&self.baseline)
    }

    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            builder.add(Glob::new(pattern)?);
        }
        Ok(builder.build()?)
    }

    pub fn discovery(&self) -> Result<FsDiscovery> {
        Ok(FsDiscovery::new(&self.root)
            .with_extensions(&self.extensions)
            .with_exclude(self.exclude_set()?))
    }
}
