//! Parallel, deterministic discovery of compiled class files with directory pruning.
//!
//! Performance optimizations:
//! - Early directory pruning via `WalkDir::filter_entry` (O(1) subtree skip)
//! - Parallel file processing via Rayon's `par_bridge`
//! - Minimal work in parallel threads (only .class extension check)
//!
//! Build output trees (`target/classes`, `build/classes`, ...) are where the
//! `.class` files live, so they are deliberately NOT excluded; only VCS and
//! IDE bookkeeping directories are pruned.

use anyhow::{Context, Result};
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories to exclude by default (VCS and IDE bookkeeping).
const EXCLUDED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".idea", ".gradle"];

/// Checks if a directory entry should be pruned (excluded from traversal).
///
/// This is called by `WalkDir::filter_entry` and runs sequentially,
/// but enables O(1) subtree skipping for excluded directories.
#[inline]
fn is_excluded_dir(entry: &walkdir::DirEntry, excludes: &HashSet<&str>) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| excludes.contains(name))
}

/// Gathers all .class files recursively starting from the root path using parallel iteration.
///
/// Performance characteristics:
/// - Uses early directory pruning to skip `.git/`, `.idea/`, etc. in O(1)
/// - Parallelizes file processing across available CPU cores
/// - Only processes entries that pass the directory filter
pub fn gather_class_files(root: &Path) -> Result<Vec<PathBuf>> {
    let excludes: HashSet<&str> = EXCLUDED_DIRS.iter().copied().collect();
    gather_with(root, &excludes)
}

/// Gathers all .class files with custom exclusion patterns using early pruning.
///
/// Combines default exclusions with custom patterns for efficient subtree skipping.
pub fn gather_class_files_with_excludes(root: &Path, excludes: &[&str]) -> Result<Vec<PathBuf>> {
    // Combine default and custom excludes into a single HashSet for O(1) lookup
    let all_excludes: HashSet<&str> = EXCLUDED_DIRS
        .iter()
        .copied()
        .chain(excludes.iter().copied())
        .collect();
    gather_with(root, &all_excludes)
}

fn gather_with(root: &Path, excludes: &HashSet<&str>) -> Result<Vec<PathBuf>> {
    WalkDir::new(root)
        .into_iter()
        // filter_entry prunes entire subtrees before iteration
        .filter_entry(|e| !is_excluded_dir(e, excludes))
        .par_bridge() // Parallelize processing of remaining entries
        .filter_map(|entry| match entry {
            Ok(e) => {
                let path = e.path();
                if path.is_file() && path.extension().is_some_and(|ext| ext == "class") {
                    Some(Ok(path.to_path_buf()))
                } else {
                    None
                }
            }
            Err(e) => Some(Err(e.into())),
        })
        .collect::<Result<Vec<_>>>()
        .context(format!("Failed to gather .class files from {}", root.display()))
}
