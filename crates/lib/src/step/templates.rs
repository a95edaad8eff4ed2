use std::fs;

use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::execute::cmd::ToolSpec;
use crate::step::{BuildStep, StepContext, StepError, StepFuture};
use crate::util::walk::find_files;

/// Collapses whitespace inside the backtick literal of `func(`...`)` calls,
/// so translation keys survive HTML minification as single-line strings.
#[derive(Debug, Clone)]
pub struct TranslateCalls {
  call: Regex,
  space: Regex,
}

impl TranslateCalls {
  pub fn new(func: &str) -> Result<Self, StepError> {
    let call = Regex::new(&format!(r"{}\(`[^`]+`", regex::escape(func)))
      .map_err(|e| StepError::Invalid(format!("invalid translate function {:?}: {}", func, e)))?;
    let space = Regex::new(r"\s+").map_err(|e| StepError::Invalid(e.to_string()))?;
    Ok(Self { call, space })
  }

  pub fn apply(&self, html: &str) -> String {
    self
      .call
      .replace_all(html, |caps: &Captures| self.space.replace_all(&caps[0], " ").into_owned())
      .into_owned()
  }
}

/// Minifies every `.html` file under `assets/<dir>` and packs it as
/// `/<dir>/<rel>`.
#[derive(Debug, Clone)]
pub struct Templates {
  dir: String,
  tool: Option<ToolSpec>,
  step_name: String,
}

impl Templates {
  pub fn new(dir: impl Into<String>) -> Self {
    let dir = dir.into();
    Self {
      step_name: format!("templates:{}", dir),
      dir,
      tool: None,
    }
  }

  /// Use `tool` instead of the configured HTML minifier.
  pub fn with_tool(mut self, tool: ToolSpec) -> Self {
    self.tool = Some(tool);
    self
  }

  async fn build(&self, ctx: StepContext) -> Result<(), StepError> {
    let src = ctx.config.asset_dir(&self.dir);
    if !src.is_dir() {
      return Err(StepError::NotADirectory { path: src });
    }

    let files = find_files(&src, |name| name.ends_with(".html"))?;
    let minifier = self.tool.as_ref().unwrap_or(&ctx.config.tools.html_minifier);
    let calls = TranslateCalls::new(&ctx.config.trans_func_name)?;
    let out_dir = ctx.config.build.join(&self.dir);
    info!(dir = %self.dir, templates = files.len(), "minifying templates");

    for file in files {
      ctx.check_cancelled()?;
      let output = out_dir.join(&file.rel);
      if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).map_err(|e| StepError::io(parent, e))?;
      }

      let input = file.path.to_string_lossy().to_string();
      let out = output.to_string_lossy().to_string();
      ctx
        .tool_from(minifier, &[("in", input.as_str()), ("out", out.as_str())])
        .run()
        .await?;

      let html = fs::read_to_string(&output).map_err(|e| StepError::io(&output, e))?;
      let html = calls.apply(&html);
      fs::write(&output, &html).map_err(|e| StepError::io(&output, e))?;

      let name = format!("/{}/{}", self.dir, file.rel);
      debug!(name = %name, source = %file.path.display(), "packing template");
      ctx.packer.pack(&name, html.as_bytes())?;
    }
    Ok(())
  }
}

impl BuildStep for Templates {
  fn name(&self) -> &str {
    &self.step_name
  }

  fn run(&self, ctx: StepContext) -> StepFuture<'_> {
    Box::pin(self.build(ctx))
  }
}
