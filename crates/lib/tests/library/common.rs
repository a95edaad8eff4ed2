//! Shared helpers for library integration tests.

use std::path::{Path, PathBuf};

use assetpack_lib::config::BuildConfig;
use assetpack_lib::execute::ToolSpec;
use tempfile::TempDir;

/// A tool that copies `{in}` to `{out}`.
pub fn copy_tool() -> ToolSpec {
  ToolSpec::new("/bin/cp", ["{in}", "{out}"])
}

/// A tool that always fails.
pub fn failing_tool() -> ToolSpec {
  ToolSpec::new("/bin/sh", ["-c", "echo 'tool exploded' >&2; exit 3"])
}

/// Isolated project directory.
pub struct Project {
  pub temp: TempDir,
}

impl Project {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("assets")).unwrap();
    Self { temp }
  }

  pub fn wd(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the project directory.
  pub fn write(&self, rel: &str, content: &str) {
    let path = self.temp.path().join(rel);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Unresolved config using copy tools in place of the real toolchain.
  pub fn config(&self) -> BuildConfig {
    let mut config = BuildConfig::new(self.wd());
    config.workers = 2;
    config.tools.image_optimizer = copy_tool();
    config.tools.sass = copy_tool();
    config.tools.css_post = Vec::new();
    config.tools.js_minifier = None;
    config.tools.html_minifier = copy_tool();
    config
  }

  pub fn dist(&self) -> PathBuf {
    dunce::canonicalize(self.wd()).unwrap().join("assets").join("dist")
  }
}
