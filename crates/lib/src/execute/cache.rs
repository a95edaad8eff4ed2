//! Incremental per-file output cache.
//!
//! Each cached output lives at `<root>/<rel>` next to a `<rel>.hash` sidecar
//! holding the content hash of the source it was produced from. An entry is
//! stale when the sidecar is missing or different, or the output itself is
//! gone. The sidecar is only written by [`IncrementalCache::mark_fresh`],
//! after the producing tool has succeeded.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::consts::CACHE_HASH_SUFFIX;
use crate::execute::types::ExecuteError;
use crate::util::hash::{ContentHash, hash_file};
use crate::util::walk::SourceFile;

/// Cache lookup result for one source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
  pub rel: String,
  pub source: PathBuf,
  pub output: PathBuf,
  pub hash: ContentHash,
  pub changed: bool,
}

#[derive(Debug, Clone)]
pub struct IncrementalCache {
  root: PathBuf,
}

impl IncrementalCache {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn output_path(&self, rel: &str) -> PathBuf {
    self.root.join(rel)
  }

  fn sidecar_path(output: &Path) -> PathBuf {
    let mut name = output.as_os_str().to_owned();
    name.push(CACHE_HASH_SUFFIX);
    PathBuf::from(name)
  }

  /// Hash `source` and compare it against the cached sidecar.
  ///
  /// Creates the output's parent directory so a tool can write into it. A
  /// changed entry loses its sidecar, so an output overwritten by a failed
  /// run is never taken for fresh later.
  pub fn check(&self, source: &SourceFile) -> Result<CacheEntry, ExecuteError> {
    let output = self.output_path(&source.rel);
    if let Some(parent) = output.parent() {
      fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }

    let hash = hash_file(&source.path).map_err(|e| ExecuteError::Io {
      path: e.path,
      source: e.source,
    })?;

    let sidecar = Self::sidecar_path(&output);
    let cached = match fs::read_to_string(&sidecar) {
      Ok(s) => Some(s),
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
      Err(e) => return Err(io_err(&sidecar, e)),
    };

    let changed = cached.as_deref() != Some(hash.0.as_str()) || !output.is_file();
    debug!(rel = %source.rel, changed, "checked cache entry");
    if changed && cached.is_some() {
      fs::remove_file(&sidecar).map_err(|e| io_err(&sidecar, e))?;
    }

    Ok(CacheEntry {
      rel: source.rel.clone(),
      source: source.path.clone(),
      output,
      hash,
      changed,
    })
  }

  /// Record that `entry`'s output is up to date with its source.
  pub fn mark_fresh(&self, entry: &CacheEntry) -> Result<(), ExecuteError> {
    let sidecar = Self::sidecar_path(&entry.output);
    fs::write(&sidecar, entry.hash.0.as_bytes()).map_err(|e| io_err(&sidecar, e))
  }
}

fn io_err(path: &Path, source: std::io::Error) -> ExecuteError {
  ExecuteError::Io {
    path: path.to_path_buf(),
    source,
  }
}
