use tracing::info;

use crate::step::{BuildStep, StepContext, StepError, StepFuture};
use crate::util::walk::find_all_files;

/// Packs every file under `assets/<name>` as `/<name>/<rel>`.
#[derive(Debug, Clone)]
pub struct StaticDir {
  name: String,
  step_name: String,
}

impl StaticDir {
  pub fn new(name: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      step_name: format!("static:{}", name),
      name,
    }
  }

  async fn pack(&self, ctx: StepContext) -> Result<(), StepError> {
    if self.name.is_empty() || !self.name.chars().all(|c| c.is_ascii_alphanumeric()) {
      return Err(StepError::Invalid(format!("invalid static dir name {:?}", self.name)));
    }

    let dir = ctx.config.asset_dir(&self.name);
    let meta = std::fs::metadata(&dir).map_err(|_| StepError::Missing { path: dir.clone() })?;
    if !meta.is_dir() {
      return Err(StepError::NotADirectory { path: dir });
    }

    let files = find_all_files(&dir)?;
    info!(dir = %self.name, files = files.len(), "packing static directory");
    for file in files {
      ctx.check_cancelled()?;
      ctx.packer.pack_file(&format!("/{}/{}", self.name, file.rel), &file.path)?;
    }
    Ok(())
  }
}

impl BuildStep for StaticDir {
  fn name(&self) -> &str {
    &self.step_name
  }

  fn run(&self, ctx: StepContext) -> StepFuture<'_> {
    Box::pin(self.pack(ctx))
  }
}
