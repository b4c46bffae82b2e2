//! Candidate file discovery
//!
//! Walks the search root concurrently (one task per subdirectory) and keeps
//! files that have a supported extension, fit under the size cap, and match
//! the optional glob. Excluded directories are pruned before they are read.
//!
//! Entries of each directory are visited in file-name order and the results
//! of subdirectory walks are stitched back in that order, so the candidate
//! list is the same for the same directory snapshot no matter how the reads
//! interleave.

use anyhow::{Context, Result};
use futures::future::{join_all, BoxFuture, FutureExt};
use globset::GlobMatcher;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::models::Language;

/// Largest file that will be parsed (bytes)
pub const MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Directory names that are never descended into
///
/// Dot-directories (`.git`, `.venv`, `.next`, ...) are skipped separately.
pub const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "bower_components",
    "jspm_packages",
    "dist",
    "build",
    "out",
    "target",
    "coverage",
    "__pycache__",
    "venv",
    "env",
    "site-packages",
];

/// A file selected for parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Full path used for reading
    pub path: PathBuf,
    /// Path relative to the search root, `/`-separated
    pub relative: String,
    pub language: Language,
}

/// Whether a directory with this name is pruned from the walk
pub fn is_excluded_dir(name: &str) -> bool {
    name.starts_with('.') || EXCLUDED_DIRS.contains(&name)
}

struct WalkContext {
    root: PathBuf,
    glob: Option<GlobMatcher>,
}

impl WalkContext {
    /// Apply the language, size and glob checks to one file
    fn accept(&self, path: &Path, size: u64) -> Option<Candidate> {
        let language = Language::for_path(path)?;

        if size > MAX_FILE_SIZE {
            log::warn!("Skipping {} (too large: {} bytes)", path.display(), size);
            return None;
        }

        let relative = relative_path(&self.root, path);
        if let Some(ref glob) = self.glob {
            if !glob.is_match(&relative) {
                log::trace!("Skipping {} (does not match glob)", relative);
                return None;
            }
        }

        Some(Candidate {
            path: path.to_path_buf(),
            relative,
            language,
        })
    }
}

/// Discover candidate files under `root`
///
/// A `root` naming a single file yields just that file when it qualifies.
/// Unreadable subdirectories are logged and skipped; only an unreadable root
/// is an error.
pub async fn discover_files(root: &Path, glob: Option<GlobMatcher>) -> Result<Vec<Candidate>> {
    let metadata = tokio::fs::metadata(root)
        .await
        .with_context(|| format!("Search path not found: {}", root.display()))?;

    if metadata.is_file() {
        let ctx = WalkContext {
            root: root.parent().map(Path::to_path_buf).unwrap_or_default(),
            glob,
        };
        return Ok(ctx.accept(root, metadata.len()).into_iter().collect());
    }

    let ctx = Arc::new(WalkContext {
        root: root.to_path_buf(),
        glob,
    });

    let entries = read_sorted(root)
        .await
        .with_context(|| format!("Failed to read directory: {}", root.display()))?;

    let files = walk_entries(ctx, entries).await;
    log::debug!("Discovered {} candidate files under {}", files.len(), root.display());
    Ok(files)
}

enum Slot {
    File(Candidate),
    Dir(usize),
}

fn walk_dir(ctx: Arc<WalkContext>, dir: PathBuf) -> BoxFuture<'static, Vec<Candidate>> {
    async move {
        match read_sorted(&dir).await {
            Ok(entries) => walk_entries(ctx, entries).await,
            Err(e) => {
                log::warn!("Failed to read directory {}: {}", dir.display(), e);
                Vec::new()
            }
        }
    }
    .boxed()
}

async fn walk_entries(ctx: Arc<WalkContext>, entries: Vec<tokio::fs::DirEntry>) -> Vec<Candidate> {
    let mut slots = Vec::new();
    let mut subdirs = Vec::new();

    for entry in entries {
        let file_type = match entry.file_type().await {
            Ok(ft) => ft,
            Err(e) => {
                log::debug!("Failed to stat {}: {}", entry.path().display(), e);
                continue;
            }
        };

        let path = entry.path();

        if file_type.is_dir() {
            let name = entry.file_name();
            if is_excluded_dir(&name.to_string_lossy()) {
                log::trace!("Pruning {}", path.display());
                continue;
            }
            slots.push(Slot::Dir(subdirs.len()));
            subdirs.push(walk_dir(Arc::clone(&ctx), path));
        } else if file_type.is_file() {
            if Language::for_path(&path).is_none() {
                continue;
            }
            let size = match entry.metadata().await {
                Ok(m) => m.len(),
                Err(e) => {
                    log::debug!("Failed to stat {}: {}", path.display(), e);
                    continue;
                }
            };
            if let Some(candidate) = ctx.accept(&path, size) {
                slots.push(Slot::File(candidate));
            }
        }
    }

    let mut nested: Vec<Option<Vec<Candidate>>> = join_all(subdirs).await.into_iter().map(Some).collect();

    let mut files = Vec::new();
    for slot in slots {
        match slot {
            Slot::File(candidate) => files.push(candidate),
            Slot::Dir(index) => files.extend(nested[index].take().unwrap_or_default()),
        }
    }
    files
}

async fn read_sorted(dir: &Path) -> std::io::Result<Vec<tokio::fs::DirEntry>> {
    let mut reader = tokio::fs::read_dir(dir).await?;
    let mut entries = Vec::new();
    while let Some(entry) = reader.next_entry().await? {
        entries.push(entry);
    }
    entries.sort_by_key(|e| e.file_name());
    Ok(entries)
}

fn relative_path(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
