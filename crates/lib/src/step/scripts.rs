use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::consts::JS_DIR;
use crate::execute::cmd::ToolSpec;
use crate::manifest::path_extension;
use crate::step::{BuildStep, StepContext, StepError, StepFuture};

/// Concatenates scripts from `assets/js` into `build/js/<out>`, minifies the
/// result and packs it as `/js/<out>`.
#[derive(Debug, Clone)]
pub struct Scripts {
  out: String,
  files: Vec<String>,
  minifier: Option<Option<ToolSpec>>,
  step_name: String,
}

impl Scripts {
  pub fn new<I, S>(out: impl Into<String>, files: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let out = out.into();
    Self {
      step_name: format!("js:{}", out),
      out,
      files: files.into_iter().map(Into::into).collect(),
      minifier: None,
    }
  }

  /// Override the configured minifier; `None` packs the concatenation as-is.
  pub fn with_minifier(mut self, minifier: Option<ToolSpec>) -> Self {
    self.minifier = Some(minifier);
    self
  }

  fn sources(&self, ctx: &StepContext) -> Result<Vec<PathBuf>, StepError> {
    if self.files.is_empty() {
      return Err(StepError::Invalid(format!("js({:?}) needs at least one file", self.out)));
    }
    let js_dir = ctx.config.asset_dir(JS_DIR);
    self
      .files
      .iter()
      .map(|file| {
        let path = js_dir.join(file);
        if !path.is_file() {
          return Err(StepError::Missing { path });
        }
        let real = dunce::canonicalize(&path).map_err(|e| StepError::io(&path, e))?;
        if !real.starts_with(&ctx.config.wd) {
          return Err(StepError::Invalid(format!("js {:?} is outside of the project", file)));
        }
        Ok(real)
      })
      .collect()
  }

  async fn build(&self, ctx: StepContext) -> Result<(), StepError> {
    if self.out.is_empty() || self.out.contains('/') {
      return Err(StepError::Invalid(format!("invalid js output name {:?}", self.out)));
    }
    let sources = self.sources(&ctx)?;

    let dir = ctx.config.build.join(JS_DIR);
    fs::create_dir_all(&dir).map_err(|e| StepError::io(&dir, e))?;
    let outfile = dir.join(&self.out);
    fs::write(&outfile, concat(&sources)?).map_err(|e| StepError::io(&outfile, e))?;
    info!(out = %self.out, files = sources.len(), "concatenated scripts");

    let minifier = match &self.minifier {
      Some(m) => m.as_ref(),
      None => ctx.config.tools.js_minifier.as_ref(),
    };
    let packed = match minifier {
      Some(tool) => {
        ctx.check_cancelled()?;
        let minfile = dir.join(minified_name(&self.out));
        let input = outfile.to_string_lossy().to_string();
        let output = minfile.to_string_lossy().to_string();
        ctx
          .tool_from(tool, &[("in", input.as_str()), ("out", output.as_str())])
          .run()
          .await?;
        minfile
      }
      None => outfile,
    };

    let name = format!("/{}/{}", JS_DIR, self.out);
    debug!(name = %name, file = %packed.display(), "packing script");
    ctx.packer.pack_file(&name, &packed)?;
    Ok(())
  }
}

/// Join files, each ending in exactly one newline.
fn concat(sources: &[PathBuf]) -> Result<String, StepError> {
  let mut buf = String::new();
  for source in sources {
    let text = fs::read_to_string(source).map_err(|e| StepError::io(source, e))?;
    buf.push_str(text.strip_suffix('\n').unwrap_or(&text));
    buf.push('\n');
  }
  Ok(buf)
}

/// `app.js` -> `app.min.js`
fn minified_name(out: &str) -> String {
  let ext = path_extension(out);
  let stem = &out[..out.len() - ext.len()];
  format!("{}.min{}", stem, ext)
}

impl BuildStep for Scripts {
  fn name(&self) -> &str {
    &self.step_name
  }

  fn run(&self, ctx: StepContext) -> StepFuture<'_> {
    Box::pin(self.build(ctx))
  }
}
