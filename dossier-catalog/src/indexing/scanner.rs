//! Directory traversal for indexing and browsing

use ignore::WalkBuilder;
use serde::Serialize;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Enumerates every regular file under a root directory.
///
/// Nothing is filtered here: hidden files and `.gitignore`d paths are scanned
/// like any other, since document shares are not source trees. Eligibility is
/// decided later by format detection.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
}

impl Scanner {
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            root: std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the tree, yielding absolute file paths.
    ///
    /// A missing root yields nothing. Unreadable entries are logged and skipped.
    /// Each call starts a fresh walk.
    pub fn files(&self) -> impl Iterator<Item = PathBuf> + use<> {
        let walk = self.root.is_dir().then(|| {
            WalkBuilder::new(&self.root)
                .standard_filters(false)
                .follow_links(true)
                .build()
        });

        walk.into_iter().flatten().filter_map(|entry| match entry {
            Ok(entry) if entry.file_type().is_some_and(|t| t.is_file()) => Some(entry.into_path()),
            Ok(_) => None,
            Err(e) => {
                warn!("Skipping unreadable path: {}", e);
                None
            }
        })
    }
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeEntry {
    pub name: String,
    pub is_directory: bool,
    pub path: PathBuf,
    /// Lowercase extension with its dot (`".pdf"`), empty for files without one,
    /// absent for directories
    pub extension: Option<String>,
}

/// List the direct children of `dir`, directories first, then by name.
///
/// An unreadable directory yields an empty listing.
pub async fn list_directory(dir: &Path) -> Vec<TreeEntry> {
    let mut read_dir = match tokio::fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) => {
            warn!("Failed to read directory {}: {}", dir.display(), e);
            return Vec::new();
        }
    };

    let mut entries = Vec::new();
    loop {
        let entry = match read_dir.next_entry().await {
            Ok(Some(entry)) => entry,
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read directory {}: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let is_directory = entry.file_type().await.is_ok_and(|t| t.is_dir());
        let path = entry.path();
        let extension = (!is_directory).then(|| {
            path.extension()
                .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
                .unwrap_or_default()
        });

        entries.push(TreeEntry {
            name: entry.file_name().to_string_lossy().into_owned(),
            is_directory,
            path,
            extension,
        });
    }

    entries.sort_by(compare_entries);
    entries
}

/// Directories first, then names ignoring case; exact byte order breaks ties.
fn compare_entries(a: &TreeEntry, b: &TreeEntry) -> Ordering {
    b.is_directory
        .cmp(&a.is_directory)
        .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        .then_with(|| a.name.cmp(&b.name))
}
