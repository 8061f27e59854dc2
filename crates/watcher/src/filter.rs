//! Relevance filtering for watched paths
//!
//! Only `.pdf` files (any case) reach the pipeline. On top of that, paths
//! can be excluded by:
//! 1. Built-in patterns (Office/LibreOffice lock files, partial downloads,
//!    OS metadata files, the `.polwatch/` state directory - always active)
//! 2. A `.polwatchignore` file in the watched root (gitignore syntax)
//! 3. Config-based patterns (gitignore syntax)

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional per-root ignore file
pub const IGNORE_FILE: &str = ".polwatchignore";

/// True if the path has a `.pdf` extension, case-insensitive
pub fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Ignore rule manager
pub struct IgnoreRules {
    /// Watched root directory
    root: PathBuf,

    /// Patterns from `.polwatchignore` (optional)
    ignore_file: Option<Gitignore>,

    /// Patterns from configuration (optional)
    configured: Option<Gitignore>,

    config: IgnoreConfig,
}

impl IgnoreRules {
    /// Load ignore rules for the watched root
    pub fn load(root: &Path, config: IgnoreConfig) -> Result<Self, ignore::Error> {
        let mut rules = Self {
            root: root.to_path_buf(),
            ignore_file: None,
            configured: None,
            config,
        };

        rules.reload()?;
        Ok(rules)
    }

    /// Rebuild matchers from disk and config
    pub fn reload(&mut self) -> Result<(), ignore::Error> {
        self.ignore_file = None;
        if self.config.use_ignore_file {
            let path = self.root.join(IGNORE_FILE);
            if path.exists() {
                let mut builder = GitignoreBuilder::new(&self.root);
                if let Some(err) = builder.add(&path) {
                    return Err(err);
                }
                self.ignore_file = Some(builder.build()?);
            }
        }

        self.configured = None;
        if !self.config.patterns.is_empty() {
            let mut builder = GitignoreBuilder::new(&self.root);
            for pattern in &self.config.patterns {
                builder.add_line(None, pattern)?;
            }
            self.configured = Some(builder.build()?);
        }

        Ok(())
    }

    /// Check if path should be ignored
    ///
    /// Accepts absolute paths under the root or paths relative to it.
    pub fn should_ignore(&self, path: &Path) -> bool {
        if is_builtin_ignored(path) {
            return true;
        }

        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.root) {
                Ok(rel) => rel,
                // Outside the root: only built-ins apply
                Err(_) => return false,
            }
        } else {
            path
        };
        let is_dir = self.root.join(relative).is_dir();

        [&self.ignore_file, &self.configured]
            .into_iter()
            .flatten()
            .any(|matcher| {
                matcher
                    .matched_path_or_any_parents(relative, is_dir)
                    .is_ignore()
            })
    }

    /// Number of active ignore sources
    pub fn active_sources(&self) -> usize {
        1 + usize::from(self.ignore_file.is_some()) + usize::from(self.configured.is_some())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Patterns that are never real documents
fn is_builtin_ignored(path: &Path) -> bool {
    if path.components().any(|c| c.as_os_str() == ".polwatch") {
        return true;
    }

    let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let lower = filename.to_ascii_lowercase();

    // Office owner files (~$policy.pdf) and LibreOffice locks (.~lock.policy.pdf#)
    if filename.starts_with("~$") || filename.starts_with(".~lock.") {
        return true;
    }

    // In-progress downloads and copies
    if [".tmp", ".part", ".partial", ".crdownload", ".download"]
        .iter()
        .any(|suffix| lower.ends_with(suffix))
    {
        return true;
    }

    // OS metadata
    filename == ".DS_Store"
        || filename.starts_with("._")
        || lower == "thumbs.db"
        || lower == "desktop.ini"
}

/// Ignore configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IgnoreConfig {
    /// Read `.polwatchignore` from the watched root (default: true)
    #[serde(default = "default_true")]
    pub use_ignore_file: bool,

    /// Additional gitignore-style patterns
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl Default for IgnoreConfig {
    fn default() -> Self {
        Self {
            use_ignore_file: true,
            patterns: vec![],
        }
    }
}

fn default_true() -> bool {
    true
}
