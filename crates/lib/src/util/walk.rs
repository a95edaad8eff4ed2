//! Source file discovery.
//!
//! Walks an asset source directory following symlinks. Directories are
//! tracked by canonical path so a symlink cycle, or a second link to an
//! already visited directory, is entered at most once. [`find_files`] skips
//! dotfiles and dot directories; [`find_all_files`] keeps them. Output is
//! sorted by relative path.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

/// A file discovered under a source root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
  /// Path to the file, through any symlinks that led to it.
  pub path: PathBuf,
  /// Path relative to the walk root, forward-slash separated.
  pub rel: String,
}

#[derive(Debug, Error)]
pub enum WalkError {
  #[error("failed to walk {}: {message}", root.display())]
  Walk { root: PathBuf, message: String },

  #[error("failed to resolve {}: {source}", path.display())]
  Canonicalize {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Find all non-hidden files under `root` whose relative path passes `filter`.
pub fn find_files(root: &Path, filter: impl FnMut(&str) -> bool) -> Result<Vec<SourceFile>, WalkError> {
  walk(root, false, filter)
}

/// Every file under `root`, dotfiles included.
pub fn find_all_files(root: &Path) -> Result<Vec<SourceFile>, WalkError> {
  walk(root, true, |_| true)
}

fn walk(root: &Path, hidden: bool, mut filter: impl FnMut(&str) -> bool) -> Result<Vec<SourceFile>, WalkError> {
  let mut visited: HashSet<PathBuf> = HashSet::new();
  let mut files = Vec::new();

  let mut it = WalkDir::new(root)
    .follow_links(true)
    .sort_by_file_name()
    .into_iter()
    .filter_entry(|e| hidden || e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));

  loop {
    let entry = match it.next() {
      None => break,
      Some(Ok(entry)) => entry,
      Some(Err(e)) => {
        if let Some(ancestor) = e.loop_ancestor() {
          debug!(ancestor = %ancestor.display(), "skipping symlink loop");
          continue;
        }
        return Err(WalkError::Walk {
          root: root.to_path_buf(),
          message: e.to_string(),
        });
      }
    };

    if entry.file_type().is_dir() {
      let canonical = dunce::canonicalize(entry.path()).map_err(|source| WalkError::Canonicalize {
        path: entry.path().to_path_buf(),
        source,
      })?;
      if !visited.insert(canonical) {
        debug!(path = %entry.path().display(), "skipping already visited directory");
        it.skip_current_dir();
      }
      continue;
    }

    if !entry.file_type().is_file() {
      continue;
    }

    let rel = relative_slash_path(root, entry.path());
    if rel.is_empty() || !filter(&rel) {
      continue;
    }

    files.push(SourceFile {
      path: entry.path().to_path_buf(),
      rel,
    });
  }

  files.sort_by(|a, b| a.rel.cmp(&b.rel));
  Ok(files)
}

/// Path of `path` relative to `root`, joined with `/`.
pub fn relative_slash_path(root: &Path, path: &Path) -> String {
  let rel = path.strip_prefix(root).unwrap_or(path);
  rel
    .components()
    .map(|c| c.as_os_str().to_string_lossy())
    .collect::<Vec<_>>()
    .join("/")
}
