use crate::error::{IndexerError, Result};
use crate::paths::{normalize_path_str, normalize_relative_path};
use ignore::WalkBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Where the list of repository files comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingSource {
    /// `git ls-files`: tracked files plus untracked files that are not ignored.
    #[default]
    Git,
    /// Gitignore-aware directory walk, usable outside a git checkout.
    Walk,
}

impl ListingSource {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "git" => Some(Self::Git),
            "walk" => Some(Self::Walk),
            _ => None,
        }
    }
}

/// Enumerates the files of a repository as relative, forward-slash paths.
pub struct FileScanner {
    root: PathBuf,
    source: ListingSource,
    max_files: usize,
}

impl FileScanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            source: ListingSource::default(),
            max_files: usize::MAX,
        }
    }

    #[must_use]
    pub fn with_source(mut self, source: ListingSource) -> Self {
        self.source = source;
        self
    }

    #[must_use]
    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// List files, stopping at `max_files` (logged, never silent).
    pub fn scan(&self) -> Result<Vec<String>> {
        let files = match self.source {
            ListingSource::Git => self.scan_git()?,
            ListingSource::Walk => self.scan_walk(),
        };
        log::info!("Found {} files under {}", files.len(), self.root.display());
        Ok(files)
    }

    fn scan_git(&self) -> Result<Vec<String>> {
        let output = Command::new("git")
            .args(["ls-files", "-z", "--cached", "--others", "--exclude-standard"])
            .current_dir(&self.root)
            .output()?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(IndexerError::ListingFailed(format!(
                "git ls-files exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        let mut files = Vec::new();
        let mut seen = HashSet::new();
        for raw in output.stdout.split(|b| *b == 0) {
            if raw.is_empty() {
                continue;
            }
            let rel = normalize_path_str(&String::from_utf8_lossy(raw));
            if rel.is_empty() || !seen.insert(rel.clone()) {
                continue;
            }
            if files.len() >= self.max_files {
                self.log_cap_hit();
                break;
            }
            files.push(rel);
        }
        Ok(files)
    }

    fn scan_walk(&self) -> Vec<String> {
        let mut files = Vec::new();

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(true)
            .git_ignore(true)
            .git_global(true)
            .git_exclude(true)
            .require_git(false)
            .sort_by_file_name(|a, b| a.cmp(b));
        builder.filter_entry(|entry| entry.file_name() != ".git");

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    let Some(file_type) = entry.file_type() else {
                        continue;
                    };
                    if !file_type.is_file() {
                        continue;
                    }
                    let Some(rel) = normalize_relative_path(&self.root, entry.path()) else {
                        continue;
                    };
                    if files.len() >= self.max_files {
                        self.log_cap_hit();
                        break;
                    }
                    files.push(rel);
                }
                Err(e) => log::warn!("Failed to read entry: {e}"),
            }
        }

        files
    }

    fn log_cap_hit(&self) {
        log::warn!(
            "File listing for {} reached the cap of {} files; remaining files are not indexed",
            self.root.display(),
            self.max_files
        );
    }
}
