//! Which paths the watch loop reacts to

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::warn;

use crate::config::WatchConfig;

/// Patterns always ignored, in gitignore syntax
pub const DEFAULT_IGNORES: &[&str] = &[
    "node_modules/",
    ".git/",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "*.log",
    "*.swp",
    "*.swo",
    "*~",
];

/// Gitignore-style ignore rules plus an extension allowlist
#[derive(Debug)]
pub struct WatchFilter {
    root: PathBuf,
    ignores: Gitignore,
    extensions: Vec<String>,
}

impl WatchFilter {
    pub fn new(root: &Path, config: &WatchConfig) -> Self {
        let mut builder = GitignoreBuilder::new(root);
        for pattern in DEFAULT_IGNORES.iter().copied().chain(config.ignore.iter().map(String::as_str)) {
            if let Err(e) = builder.add_line(None, pattern) {
                warn!("Invalid ignore pattern {:?}: {}", pattern, e);
            }
        }
        let ignores = builder.build().unwrap_or_else(|e| {
            warn!("Ignore rules unusable, ignoring nothing: {}", e);
            Gitignore::empty()
        });

        Self {
            root: root.to_path_buf(),
            ignores,
            extensions: config.extensions.clone(),
        }
    }

    /// Ignored by a rule, or outside the watched root
    pub fn is_ignored(&self, path: &Path) -> bool {
        let rel = match path.strip_prefix(&self.root) {
            Ok(rel) => rel,
            Err(_) if path.is_relative() => path,
            Err(_) => return true,
        };
        self.ignores
            .matched_path_or_any_parents(rel, path.is_dir())
            .is_ignore()
    }

    /// Not ignored and carrying one of the watched extensions
    pub fn accepts(&self, path: &Path) -> bool {
        let watched_ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| self.extensions.iter().any(|x| x == e))
            .unwrap_or(false);
        watched_ext && !self.is_ignored(path)
    }
}
