//! File scanner for discovering measurement files.
//!
//! This module finds the `gas_analysis_*.json` files (or whatever name
//! pattern is configured) in the results directory.

use crate::error::AnalysisError;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Default file name pattern for measurement runs.
pub const DEFAULT_PATTERN: &str = "gas_analysis_*.json";

/// Configuration for file discovery.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File name pattern; `*` matches any run of characters, `?` a single one.
    pub pattern: String,
    /// Descend into subdirectories.
    pub recursive: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN.to_string(),
            recursive: false,
        }
    }
}

impl From<&crate::config::DiscoveryConfig> for ScanConfig {
    fn from(config: &crate::config::DiscoveryConfig) -> Self {
        Self {
            pattern: config.pattern.clone(),
            recursive: config.recursive,
        }
    }
}

/// Scanned file information.
#[derive(Debug, Clone)]
pub struct ScannedFile {
    /// Path of the file (results directory joined with the relative path)
    pub path: PathBuf,
    /// File size in bytes
    pub size: u64,
}

/// File scanner for discovering measurement files.
pub struct FileScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl FileScanner {
    /// Create a new file scanner.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching files, sorted by path.
    ///
    /// A results directory that does not exist yet holds no files.
    pub fn scan(&self) -> Result<Vec<ScannedFile>, AnalysisError> {
        if !self.root.exists() {
            debug!("Results directory {} does not exist", self.root.display());
            return Ok(Vec::new());
        }

        if !self.root.is_dir() {
            return Err(AnalysisError::Io {
                path: self.root.clone(),
                source: io::Error::new(io::ErrorKind::NotFound, "not a directory"),
            });
        }

        let max_depth = if self.config.recursive { usize::MAX } else { 1 };
        let walker = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

        let mut files = Vec::new();

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry under {}: {}", self.root.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !self.matches(&name) {
                continue;
            }

            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(e) => {
                    debug!("Cannot stat {}: {}", entry.path().display(), e);
                    0
                }
            };

            files.push(ScannedFile {
                path: entry.into_path(),
                size,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(files)
    }

    /// Scan and return the matching paths, failing with
    /// [`AnalysisError::NoInputFiles`] when nothing matches.
    pub fn discover(&self) -> Result<Vec<PathBuf>, AnalysisError> {
        let files = self.scan()?;

        if files.is_empty() {
            return Err(AnalysisError::NoInputFiles {
                dir: self.root.clone(),
                pattern: self.config.pattern.clone(),
            });
        }

        debug!("Discovered {} measurement files", files.len());
        Ok(files.into_iter().map(|f| f.path).collect())
    }

    /// Check if a file name matches the configured pattern.
    pub fn matches(&self, name: &str) -> bool {
        wildcard_match(&self.config.pattern, name)
    }

    /// Directory being scanned.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

/// Match `name` against a pattern where `*` is any run and `?` any one char.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();

    let (mut pi, mut ni) = (0, 0);
    // position of the last '*' and the name index it was tried at
    let mut backtrack: Option<(usize, usize)> = None;

    while ni < n.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == n[ni]) {
            pi += 1;
            ni += 1;
        } else if pi < p.len() && p[pi] == '*' {
            backtrack = Some((pi, ni));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ni = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    p[pi..].iter().all(|&c| c == '*')
}
