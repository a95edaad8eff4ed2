use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::info;

use crate::execute::cmd::resolve_in;
use crate::step::{BuildStep, StepContext, StepError, StepFuture};

/// Runs an arbitrary tool with the bridge socket in its environment, then
/// packs the files it produced under their declared logical names.
///
/// Output paths are relative to the working directory unless absolute. With
/// a verbose config the tool's output streams to the terminal.
#[derive(Debug, Clone)]
pub struct Exec {
  name: String,
  program: String,
  args: Vec<String>,
  outputs: BTreeMap<String, PathBuf>,
}

impl Exec {
  pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      program: program.into(),
      args: Vec::new(),
      outputs: BTreeMap::new(),
    }
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  /// Pack `path` as `logical` once the tool has finished.
  pub fn output(mut self, logical: impl Into<String>, path: impl Into<PathBuf>) -> Self {
    self.outputs.insert(logical.into(), path.into());
    self
  }

  async fn exec(&self, ctx: StepContext) -> Result<(), StepError> {
    ctx.check_cancelled()?;
    let tool = ctx.tool(&self.program).args(self.args.iter().cloned());
    if ctx.config.verbose {
      tool.run_inherit().await?;
    } else {
      tool.run().await?;
    }

    info!(step = %self.name, outputs = self.outputs.len(), "packing tool outputs");
    for (logical, path) in &self.outputs {
      let path = resolve_in(&ctx.config.wd, path);
      if !path.is_file() {
        return Err(StepError::Missing { path });
      }
      ctx.packer.pack_file(logical, &path)?;
    }
    Ok(())
  }
}

impl BuildStep for Exec {
  fn name(&self) -> &str {
    &self.name
  }

  fn run(&self, ctx: StepContext) -> StepFuture<'_> {
    Box::pin(self.exec(ctx))
  }
}
