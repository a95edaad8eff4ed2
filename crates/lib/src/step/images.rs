use std::sync::Arc;

use tracing::{debug, info};

use crate::execute::cache::{CacheEntry, IncrementalCache};
use crate::execute::cmd::ToolSpec;
use crate::execute::pool::run_pool;
use crate::step::{BuildStep, StepContext, StepError, StepFuture};
use crate::util::walk::find_files;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "gif", "png", "svg", "mp4", "webm", "json"];

/// Whether `name` has an extension the image step handles.
pub fn is_image(name: &str) -> bool {
  name
    .rsplit_once('.')
    .map(|(_, ext)| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
    .unwrap_or(false)
}

/// Optimizer plugin flag for `name`, empty when the default applies.
pub fn image_plugin(name: &str) -> &'static str {
  let ext = name.rsplit_once('.').map(|(_, e)| e.to_ascii_lowercase()).unwrap_or_default();
  match ext.as_str() {
    "jpg" | "jpeg" => "--plugin=guetzli",
    "svg" => "--plugin=svgo",
    "png" => "--plugin=pngquant",
    "gif" => "--plugin=gifsicle",
    _ => "",
  }
}

/// Optimizes every image under `assets/<dir>` into the cache and packs the
/// results as `/<dir>/<rel>`.
///
/// Only images whose source changed since the last successful run are sent
/// through the optimizer; all of them are packed.
#[derive(Debug, Clone)]
pub struct Images {
  dir: String,
  tool: Option<ToolSpec>,
  step_name: String,
}

impl Images {
  pub fn new(dir: impl Into<String>) -> Self {
    let dir = dir.into();
    Self {
      step_name: format!("images:{}", dir),
      dir,
      tool: None,
    }
  }

  /// Use `tool` instead of the configured optimizer.
  pub fn with_tool(mut self, tool: ToolSpec) -> Self {
    self.tool = Some(tool);
    self
  }

  async fn build(&self, ctx: StepContext) -> Result<(), StepError> {
    let src = ctx.config.asset_dir(&self.dir);
    if !src.is_dir() {
      return Err(StepError::NotADirectory { path: src });
    }

    let cache = IncrementalCache::new(ctx.config.cache.join(&self.dir));
    let entries = find_files(&src, is_image)?
      .iter()
      .map(|file| cache.check(file))
      .collect::<Result<Vec<_>, _>>()?;
    let changed: Vec<CacheEntry> = entries.iter().filter(|e| e.changed).cloned().collect();

    info!(
      dir = %self.dir,
      images = entries.len(),
      changed = changed.len(),
      "optimizing images"
    );

    let tool = Arc::new(self.tool.clone().unwrap_or_else(|| ctx.config.tools.image_optimizer.clone()));
    let workers = ctx.config.workers;
    let pool_ctx = ctx.clone();
    let pool_cache = cache.clone();

    run_pool(changed, workers, move |entry: CacheEntry| {
      let ctx = pool_ctx.clone();
      let cache = pool_cache.clone();
      let tool = Arc::clone(&tool);
      async move {
        ctx.check_cancelled()?;
        let input = entry.source.to_string_lossy().to_string();
        let output = entry.output.to_string_lossy().to_string();
        let out_dir = entry
          .output
          .parent()
          .map(|p| p.to_string_lossy().to_string())
          .unwrap_or_default();

        debug!(image = %entry.rel, "optimizing image");
        ctx
          .tool_from(
            &tool,
            &[
              ("in", input.as_str()),
              ("out", output.as_str()),
              ("out_dir", out_dir.as_str()),
              ("plugin", image_plugin(&entry.rel)),
            ],
          )
          .run()
          .await?;

        if !entry.output.is_file() {
          return Err(StepError::Missing { path: entry.output });
        }
        cache.mark_fresh(&entry)?;
        Ok::<_, StepError>(())
      }
    })
    .await?;

    for entry in &entries {
      ctx.check_cancelled()?;
      ctx.packer.pack_file(&format!("/{}/{}", self.dir, entry.rel), &entry.output)?;
    }
    Ok(())
  }
}

impl BuildStep for Images {
  fn name(&self) -> &str {
    &self.step_name
  }

  fn run(&self, ctx: StepContext) -> StepFuture<'_> {
    Box::pin(self.build(ctx))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pack::Packer;
  use crate::step::test_support::Project;
  use crate::util::testutil::{copy_tool, failing_tool, marking_tool, shell_cmd};

  #[test]
  fn recognizes_image_extensions() {
    assert!(is_image("a/b.PNG"));
    assert!(is_image("clip.webm"));
    assert!(is_image("anim.json"));
    assert!(!is_image("notes.txt"));
    assert!(!is_image("noext"));
  }

  #[test]
  fn plugin_by_extension() {
    assert_eq!(image_plugin("a.JPG"), "--plugin=guetzli");
    assert_eq!(image_plugin("a.svg"), "--plugin=svgo");
    assert_eq!(image_plugin("a.png"), "--plugin=pngquant");
    assert_eq!(image_plugin("a.gif"), "--plugin=gifsicle");
    assert_eq!(image_plugin("a.mp4"), "");
  }

  #[tokio::test]
  async fn optimizes_and_packs_all_images() {
    let project = Project::new(|_| {});
    project.write("assets/images/logo.svg", "<svg/>");
    project.write("assets/images/icons/a.png", "png");
    project.write("assets/images/readme.txt", "skip me");

    Images::new("images")
      .with_tool(marking_tool("optimized"))
      .run(project.ctx.clone())
      .await
      .unwrap();

    let packer = &project.ctx.packer;
    assert_eq!(packer.names(), vec!["/images/icons/a.png", "/images/logo.svg"]);
    assert_eq!(packer.read("/images/logo.svg").unwrap(), b"<svg/>optimized\n");
  }

  #[tokio::test]
  async fn unchanged_images_skip_the_tool() {
    let project = Project::new(|_| {});
    project.write("assets/images/logo.svg", "<svg/>");

    Images::new("images")
      .with_tool(copy_tool())
      .run(project.ctx.clone())
      .await
      .unwrap();

    // fresh cache: the failing tool is never invoked
    let rerun = StepContext::new(Arc::new(Packer::in_memory()), Arc::clone(&project.ctx.config));
    Images::new("images").with_tool(failing_tool()).run(rerun.clone()).await.unwrap();
    assert_eq!(rerun.packer.read("/images/logo.svg").unwrap(), b"<svg/>");

    project.write("assets/images/logo.svg", "<svg></svg>");
    let err = Images::new("images").with_tool(failing_tool()).run(rerun).await.unwrap_err();
    assert!(err.to_string().contains("tool exploded"));
  }

  #[tokio::test]
  async fn partial_output_of_failed_run_is_not_reused() {
    let project = Project::new(|_| {});
    project.write("assets/images/a.svg", "v1");
    Images::new("images").with_tool(copy_tool()).run(project.ctx.clone()).await.unwrap();

    project.write("assets/images/a.svg", "v2");
    let (program, mut args) = shell_cmd("echo partial-v2 > \"$2\"; exit 1");
    args.extend(["partial".to_string(), "{in}".to_string(), "{out}".to_string()]);
    let rerun = StepContext::new(Arc::new(Packer::in_memory()), Arc::clone(&project.ctx.config));
    assert!(
      Images::new("images")
        .with_tool(ToolSpec::new(program, args))
        .run(rerun)
        .await
        .is_err()
    );

    project.write("assets/images/a.svg", "v1");
    let last = StepContext::new(Arc::new(Packer::in_memory()), Arc::clone(&project.ctx.config));
    Images::new("images").with_tool(copy_tool()).run(last.clone()).await.unwrap();
    assert_eq!(last.packer.read("/images/a.svg").unwrap(), b"v1");
  }

  #[tokio::test]
  async fn failed_item_stays_stale() {
    let project = Project::new(|_| {});
    project.write("assets/images/a.png", "png");

    assert!(
      Images::new("images")
        .with_tool(failing_tool())
        .run(project.ctx.clone())
        .await
        .is_err()
    );
    let cache = IncrementalCache::new(project.ctx.config.cache.join("images"));
    let source = crate::util::walk::SourceFile {
      path: project.ctx.config.asset_dir("images").join("a.png"),
      rel: "a.png".to_string(),
    };
    assert!(cache.check(&source).unwrap().changed);
  }
}
