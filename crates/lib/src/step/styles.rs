use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::consts::CSS_DIR;
use crate::execute::cmd::{ToolSpec, resolve_in};
use crate::step::{BuildStep, StepContext, StepError, StepFuture};

/// Remove `/*! ... */` banner comments, one line at a time.
///
/// A banner spans from the first `/*!` on a line to the last `*/` on the
/// same line; comments crossing lines are left alone.
pub fn strip_banner_comments(css: &str) -> String {
  let mut out = String::with_capacity(css.len());
  for (i, line) in css.split('\n').enumerate() {
    if i > 0 {
      out.push('\n');
    }
    match (line.find("/*!"), line.rfind("*/")) {
      (Some(start), Some(end)) if end >= start + 4 => {
        out.push_str(&line[..start]);
        out.push_str(&line[end + 2..]);
      }
      _ => out.push_str(line),
    }
  }
  out
}

/// Compiles each top-level stylesheet under `assets/<dir>` and packs it as
/// `/css/<name>.css`.
///
/// Partials (leading `_`) and dotfiles are only reachable through imports.
#[derive(Debug, Clone)]
pub struct Styles {
  dir: String,
  include: Vec<PathBuf>,
  tool: Option<ToolSpec>,
  post: Option<Vec<ToolSpec>>,
  step_name: String,
}

impl Styles {
  pub fn new(dir: impl Into<String>) -> Self {
    let dir = dir.into();
    Self {
      step_name: format!("sass:{}", dir),
      dir,
      include: Vec::new(),
      tool: None,
      post: None,
    }
  }

  /// Extra load paths, relative to the working directory unless absolute.
  pub fn include(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
    self.include.extend(dirs);
    self
  }

  pub fn with_tool(mut self, tool: ToolSpec) -> Self {
    self.tool = Some(tool);
    self
  }

  /// Replace the configured post-processors.
  pub fn with_post(mut self, post: Vec<ToolSpec>) -> Self {
    self.post = Some(post);
    self
  }

  fn sources(&self, ctx: &StepContext) -> Result<Vec<(String, PathBuf)>, StepError> {
    let dir = ctx.config.asset_dir(&self.dir);
    if !dir.is_dir() {
      return Err(StepError::NotADirectory { path: dir });
    }

    let mut sources = Vec::new();
    for entry in fs::read_dir(&dir).map_err(|e| StepError::io(&dir, e))? {
      let entry = entry.map_err(|e| StepError::io(&dir, e))?;
      let name = entry.file_name().to_string_lossy().to_string();
      if name.starts_with('_') || name.starts_with('.') {
        continue;
      }
      let Some(stem) = name.strip_suffix(".scss") else {
        continue;
      };
      if entry.file_type().map_err(|e| StepError::io(entry.path(), e))?.is_dir() {
        continue;
      }
      sources.push((stem.to_string(), entry.path()));
    }
    sources.sort();
    Ok(sources)
  }

  async fn build(&self, ctx: StepContext) -> Result<(), StepError> {
    let build = &ctx.config.build;
    fs::create_dir_all(build).map_err(|e| StepError::io(build, e))?;
    let manifest = build.join("manifest.json");
    fs::write(&manifest, ctx.packer.manifest_bytes()?).map_err(|e| StepError::io(&manifest, e))?;

    let out_dir = build.join(CSS_DIR);
    fs::create_dir_all(&out_dir).map_err(|e| StepError::io(&out_dir, e))?;

    let sass = self.tool.as_ref().unwrap_or(&ctx.config.tools.sass);
    let post = self.post.as_ref().unwrap_or(&ctx.config.tools.css_post);
    let load_paths: Vec<String> = self
      .include
      .iter()
      .map(|dir| format!("--load-path={}", resolve_in(&ctx.config.wd, dir).display()))
      .collect();

    let sources = self.sources(&ctx)?;
    info!(dir = %self.dir, stylesheets = sources.len(), "compiling stylesheets");

    for (stem, source) in sources {
      ctx.check_cancelled()?;
      let mut current = out_dir.join(format!("{}.css", stem));
      let input = source.to_string_lossy().to_string();
      let output = current.to_string_lossy().to_string();
      ctx
        .tool_from(sass, &[("in", input.as_str()), ("out", output.as_str())])
        .args(load_paths.iter().cloned())
        .run()
        .await?;

      for (i, tool) in post.iter().enumerate() {
        ctx.check_cancelled()?;
        let next = out_dir.join(format!("{}.post{}.css", stem, i));
        let input = current.to_string_lossy().to_string();
        let output = next.to_string_lossy().to_string();
        ctx
          .tool_from(tool, &[("in", input.as_str()), ("out", output.as_str())])
          .run()
          .await?;
        current = next;
      }

      let css = fs::read_to_string(&current).map_err(|e| StepError::io(&current, e))?;
      let name = format!("/{}/{}.css", CSS_DIR, stem);
      debug!(name = %name, source = %source.display(), "packing stylesheet");
      ctx.packer.pack(&name, strip_banner_comments(&css).as_bytes())?;
    }
    Ok(())
  }
}

impl BuildStep for Styles {
  fn name(&self) -> &str {
    &self.step_name
  }

  fn run(&self, ctx: StepContext) -> StepFuture<'_> {
    Box::pin(self.build(ctx))
  }
}
