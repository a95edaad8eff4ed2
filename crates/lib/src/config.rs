//! Build configuration.
//!
//! [`BuildConfig::new`] derives every path from the working directory;
//! callers override what they need and call [`BuildConfig::resolve`] to make
//! paths absolute and validate before any work starts.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::{
  DEFAULT_EMBED_IDENT, DEFAULT_MANIFEST_NAME, DEFAULT_PUBLIC_PREFIX, DEFAULT_TRANS_FUNC_NAME, EMBED_FILE_NAME,
  SCRIPT_NAME,
};
use crate::execute::cmd::ToolSpec;
use crate::execute::types::default_workers;
use crate::manifest::is_valid_identifier;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("workers must be at least 1, got {0}")]
  InvalidWorkers(usize),

  #[error("invalid embed identifier {0:?}")]
  InvalidIdentifier(String),

  #[error("cannot read from working directory {}", path.display())]
  WorkingDir { path: PathBuf },

  #[error("could not determine real path for {}: {source}", path.display())]
  Canonicalize {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("assets directory {} is outside the working directory {}", assets.display(), wd.display())]
  AssetsOutsideWd { assets: PathBuf, wd: PathBuf },

  #[error("invalid manifest name {0:?}")]
  InvalidManifestName(String),

  #[error("invalid trans func name {0:?}")]
  InvalidTransFuncName(String),

  #[error("dist directory {} would replace the {contains} at {}", dist.display(), path.display())]
  InvalidDist {
    dist: PathBuf,
    contains: &'static str,
    path: PathBuf,
  },
}

/// External tools invoked by the built-in steps.
///
/// Arguments may use `{in}` and `{out}` placeholders; the image optimizer also
/// gets `{out_dir}` and `{plugin}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
  pub image_optimizer: ToolSpec,
  pub sass: ToolSpec,
  /// Run in order over the compiled stylesheet.
  pub css_post: Vec<ToolSpec>,
  /// `None` packs concatenated scripts as-is.
  pub js_minifier: Option<ToolSpec>,
  pub html_minifier: ToolSpec,
}

impl Default for ToolsConfig {
  fn default() -> Self {
    Self {
      image_optimizer: ToolSpec::new("imagemin", ["{plugin}", "--out-dir={out_dir}", "{in}"]),
      sass: ToolSpec::new("sass", ["--no-source-map", "{in}", "{out}"]),
      css_post: Vec::new(),
      js_minifier: Some(ToolSpec::new("uglifyjs", ["--compress", "--output", "{out}", "{in}"])),
      html_minifier: ToolSpec::new(
        "html-minifier",
        [
          "--collapse-boolean-attributes",
          "--collapse-whitespace",
          "--remove-comments",
          "--remove-attribute-quotes",
          "--remove-script-type-attributes",
          "--remove-style-link-type-attributes",
          "--minify-css",
          "--minify-js",
          r"--ignore-custom-fragments=\{%[^%]+%\}",
          "--trim-custom-fragments",
          "--output",
          "{out}",
          "{in}",
        ],
      ),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
  pub wd: PathBuf,
  pub assets: PathBuf,
  pub build: PathBuf,
  pub cache: PathBuf,
  pub dist: PathBuf,
  pub script: PathBuf,
  pub node_modules: PathBuf,
  /// Prepended to each child's `PATH`.
  pub tool_dirs: Vec<PathBuf>,
  pub manifest_name: String,
  pub workers: usize,
  pub public_prefix: String,
  pub embed_file: PathBuf,
  pub embed_ident: String,
  /// Translate function whose template literals are kept on one line.
  pub trans_func_name: String,
  pub tools: ToolsConfig,
  pub verbose: bool,
}

impl BuildConfig {
  /// Defaults relative to `wd`.
  pub fn new(wd: impl Into<PathBuf>) -> Self {
    let wd = wd.into();
    let assets = wd.join("assets");
    let cache = wd.join(".cache");
    let node_modules = cache.join("node_modules");
    Self {
      build: wd.join("build"),
      dist: assets.join("dist"),
      script: assets.join(SCRIPT_NAME),
      embed_file: assets.join(EMBED_FILE_NAME),
      tool_dirs: vec![node_modules.join(".bin")],
      node_modules,
      cache,
      assets,
      wd,
      manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
      workers: default_workers(),
      public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
      embed_ident: DEFAULT_EMBED_IDENT.to_string(),
      trans_func_name: DEFAULT_TRANS_FUNC_NAME.to_string(),
      tools: ToolsConfig::default(),
      verbose: false,
    }
  }

  /// Make every path absolute against the canonical working directory and
  /// validate the result.
  pub fn resolve(mut self) -> Result<Self, ConfigError> {
    if self.workers < 1 {
      return Err(ConfigError::InvalidWorkers(self.workers));
    }
    if !is_valid_identifier(&self.embed_ident) {
      return Err(ConfigError::InvalidIdentifier(self.embed_ident));
    }
    if self.manifest_name.is_empty() || self.manifest_name.contains('/') {
      return Err(ConfigError::InvalidManifestName(self.manifest_name));
    }
    if !is_valid_identifier(&self.trans_func_name) {
      return Err(ConfigError::InvalidTransFuncName(self.trans_func_name));
    }

    if !self.wd.is_dir() {
      return Err(ConfigError::WorkingDir { path: self.wd });
    }
    let original_wd = self.wd.clone();
    let wd = dunce::canonicalize(&self.wd).map_err(|source| ConfigError::Canonicalize {
      path: self.wd.clone(),
      source,
    })?;

    let rebase = |p: &Path| -> PathBuf {
      let p = p.strip_prefix(&original_wd).unwrap_or(p);
      if p.is_absolute() { p.to_path_buf() } else { wd.join(p) }
    };
    self.assets = rebase(&self.assets);
    self.build = rebase(&self.build);
    self.cache = rebase(&self.cache);
    self.dist = rebase(&self.dist);
    self.script = rebase(&self.script);
    self.node_modules = rebase(&self.node_modules);
    self.embed_file = rebase(&self.embed_file);
    self.tool_dirs = self.tool_dirs.iter().map(|d| rebase(d)).collect();

    let assets = if self.assets.exists() {
      dunce::canonicalize(&self.assets).map_err(|source| ConfigError::Canonicalize {
        path: self.assets.clone(),
        source,
      })?
    } else {
      self.assets.clone()
    };
    if !assets.starts_with(&wd) {
      return Err(ConfigError::AssetsOutsideWd { assets, wd });
    }

    // the dist dir is removed wholesale before each export
    let dist = real_path(&self.dist);
    for (contains, path) in [
      ("working directory", &wd),
      ("assets directory", &assets),
      ("build directory", &self.build),
      ("cache directory", &self.cache),
      ("node modules directory", &self.node_modules),
      ("step script", &self.script),
    ] {
      let path = real_path(path);
      if path.starts_with(&dist) {
        return Err(ConfigError::InvalidDist { dist, contains, path });
      }
    }

    self.wd = wd;
    Ok(self)
  }

  /// `dir` under the assets directory.
  pub fn asset_dir(&self, dir: &str) -> PathBuf {
    self.assets.join(dir)
  }
}

/// `path` with symlinks resolved when it exists, otherwise with `.` and `..`
/// folded away.
fn real_path(path: &Path) -> PathBuf {
  if let Ok(real) = dunce::canonicalize(path) {
    return real;
  }
  let mut out = PathBuf::new();
  for component in path.components() {
    match component {
      Component::CurDir => {}
      Component::ParentDir => {
        out.pop();
      }
      other => out.push(other),
    }
  }
  out
}
