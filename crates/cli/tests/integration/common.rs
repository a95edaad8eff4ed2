//! Shared test helpers for CLI integration tests.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Path of the binary under test, for step scripts that call back into it.
pub const ASSETPACK_BIN: &str = env!("CARGO_BIN_EXE_assetpack");

/// Isolated project directory.
///
/// Each test gets its own working directory with an `assets` directory.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("assets")).unwrap();
    Self { temp }
  }

  pub fn wd(&self) -> &Path {
    self.temp.path()
  }

  /// Write a file relative to the project directory.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.temp.path().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  pub fn dist(&self) -> PathBuf {
    self.temp.path().join("assets").join("dist")
  }

  /// Forward manifest read back from the bundle.
  pub fn manifest(&self) -> BTreeMap<String, String> {
    let raw = std::fs::read(self.dist().join("manifest.json")).unwrap();
    let reverse: BTreeMap<String, String> = serde_json::from_slice(&raw).unwrap();
    reverse.into_iter().map(|(fp, name)| (name, fp)).collect()
  }

  /// Contents of the bundled file for a logical name.
  pub fn bundled(&self, name: &str) -> String {
    let manifest = self.manifest();
    let fp = manifest
      .get(name)
      .unwrap_or_else(|| panic!("{} not in manifest {:?}", name, manifest));
    std::fs::read_to_string(self.dist().join(fp)).unwrap()
  }

  /// `assetpack build` in this project.
  pub fn build_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("assetpack");
    cmd.arg("build").arg("-C").arg(self.wd()).arg("-j").arg("2");
    cmd.env_remove("ASSETPACK_SOCK");
    cmd
  }

  pub fn assetpack_cmd(&self) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("assetpack");
    cmd.current_dir(self.wd());
    cmd
  }
}
