//! Scaffold a new assets directory.
//!
//! This module provides the core logic for `assetpack init`, which writes:
//! - `assets.lua` step script with commented examples
//! - `.gitignore` for the generated bundle
//! - `.luarc.json` for LuaLS IDE integration
//!
//! Existing files are left untouched.

mod templates;

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::consts::SCRIPT_NAME;

pub use templates::{ASSETS_LUA_TEMPLATE, GITIGNORE_TEMPLATE, LUARC_JSON_TEMPLATE};

/// Errors that can occur during initialization.
#[derive(Debug, Error)]
pub enum InitError {
  #[error("{} must not be a directory", path.display())]
  IsDirectory { path: PathBuf },

  #[error("failed to create directory {}: {source}", path.display())]
  CreateDir { path: PathBuf, source: std::io::Error },

  #[error("failed to write file {}: {source}", path.display())]
  WriteFile { path: PathBuf, source: std::io::Error },

  #[error("failed to stat {}: {source}", path.display())]
  Stat { path: PathBuf, source: std::io::Error },
}

/// Options for scaffolding an assets directory.
pub struct InitOptions {
  /// The assets directory to populate
  pub assets_dir: PathBuf,
}

/// Result of a successful initialization.
#[derive(Debug, Default)]
pub struct InitResult {
  /// Files written by this run
  pub created: Vec<PathBuf>,
  /// Files that already existed and were left alone
  pub skipped: Vec<PathBuf>,
}

/// Write the template files into the assets directory, skipping any that
/// already exist.
pub fn scaffold(options: &InitOptions) -> Result<InitResult, InitError> {
  let dir = &options.assets_dir;
  fs::create_dir_all(dir).map_err(|e| InitError::CreateDir {
    path: dir.clone(),
    source: e,
  })?;

  let mut result = InitResult::default();
  for (name, contents) in [
    (SCRIPT_NAME, ASSETS_LUA_TEMPLATE),
    (".gitignore", GITIGNORE_TEMPLATE),
    (".luarc.json", LUARC_JSON_TEMPLATE),
  ] {
    let path = dir.join(name);
    if write_if_missing(&path, contents)? {
      result.created.push(path);
    } else {
      result.skipped.push(path);
    }
  }

  info!(dir = %dir.display(), created = result.created.len(), "scaffolded assets directory");
  Ok(result)
}

/// Write `contents` to `path` unless it exists. Returns whether it wrote.
///
/// Written files always end in exactly one newline.
pub fn write_if_missing(path: &Path, contents: &str) -> Result<bool, InitError> {
  match fs::metadata(path) {
    Ok(meta) if meta.is_dir() => Err(InitError::IsDirectory {
      path: path.to_path_buf(),
    }),
    Ok(_) => {
      debug!(path = %path.display(), "file exists, skipping");
      Ok(false)
    }
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      let contents = format!("{}\n", contents.strip_suffix('\n').unwrap_or(contents));
      fs::write(path, contents).map_err(|e| InitError::WriteFile {
        path: path.to_path_buf(),
        source: e,
      })?;
      Ok(true)
    }
    Err(e) => Err(InitError::Stat {
      path: path.to_path_buf(),
      source: e,
    }),
  }
}
