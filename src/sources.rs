//! Source file discovery

use crate::error::{Error, Result};
use glob::glob;
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directories never descended into while walking a source directory
pub const IGNORED_DIRS: &[&str] = &["node_modules", ".git", "target"];

/// A source file and its current contents
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub content: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
        }
    }

    pub async fn read(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(Self::new(path, content))
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Expand glob patterns; plain paths are passed through untouched
pub fn expand_globs<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for pattern in patterns {
        let pattern = pattern.as_ref();
        if !is_glob(pattern) {
            paths.push(PathBuf::from(pattern));
            continue;
        }

        let mut matched: Vec<PathBuf> = glob(pattern)?
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable glob match: {}", e);
                    None
                }
            })
            .collect();
        matched.sort();

        if matched.is_empty() {
            debug!("Pattern matched no files: {}", pattern);
        }
        paths.extend(matched);
    }

    Ok(paths)
}

fn has_extension(path: &Path, extensions: &BTreeSet<String>) -> bool {
    path.extension()
        .map(|ext| extensions.contains(&format!(".{}", ext.to_string_lossy())))
        .unwrap_or(false)
}

/// Resolve source paths to the list of files to transform.
///
/// `paths` are concrete paths, already expanded by [`expand_globs`]. Files
/// named explicitly are always included. Directories are walked recursively
/// and contribute files with a matching extension, skipping anything `ignore`
/// rejects. Each file appears once.
pub fn discover_sources<F>(
    paths: &[PathBuf],
    extensions: &BTreeSet<String>,
    ignore: F,
) -> Result<Vec<PathBuf>>
where
    F: Fn(&Path) -> bool,
{
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for path in paths {
        if path.is_dir() {
            let walker = WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| !ignore(entry.path()));

            for entry in walker {
                let entry = entry.map_err(|e| Error::Io(e.into()))?;
                let file = entry.path();
                if entry.file_type().is_file()
                    && has_extension(file, extensions)
                    && seen.insert(file.to_path_buf())
                {
                    files.push(file.to_path_buf());
                }
            }
        } else if !ignore(path) && seen.insert(path.clone()) {
            files.push(path.clone());
        }
    }

    Ok(files)
}

/// Default ignore rule: skip vendored and VCS directories
pub fn is_ignored(path: &Path) -> bool {
    path.file_name()
        .map(|name| IGNORED_DIRS.iter().any(|dir| name == *dir))
        .unwrap_or(false)
}
