//! Build orchestration.
//!
//! A [`Pipeline`] runs its registered steps strictly in order against one
//! shared in-memory [`Packer`], with a single callback bridge alive for the
//! whole run:
//!
//! 1. Create the cache and build directories
//! 2. Start the callback bridge with the asset callbacks
//! 3. Run each step; the first failure stops the build
//! 4. Stop the bridge
//! 5. Replace the dist directory with the fingerprinted bundle and the
//!    reverse manifest
//! 6. Write the embeddable listing
//!
//! Output written by steps before a failure is not rolled back.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::{BuildConfig, ConfigError};
use crate::eval::{EvalError, evaluate_script};
use crate::ipc::{Callbacks, IpcError, IpcServer, asset_callbacks};
use crate::manifest::{EmbedListing, Manifest};
use crate::pack::{DirStore, PackError, Packer};
use crate::step::{BuildStep, StepContext, StepDecl, StepError};

#[derive(Debug, Error)]
pub enum BuildError {
  #[error("configuration error: {0}")]
  Config(#[from] ConfigError),

  #[error("step script error: {0}")]
  Eval(#[from] EvalError),

  #[error("callback bridge error: {0}")]
  Ipc(#[from] IpcError),

  #[error("pack error: {0}")]
  Pack(#[from] PackError),

  #[error("step {step} failed: {source}")]
  Step {
    step: String,
    #[source]
    source: StepError,
  },

  #[error("i/o error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("build cancelled")]
  Cancelled,
}

fn io_err(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> BuildError {
  let path = path.into();
  move |source| BuildError::Io { path, source }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildReport {
  /// Names of the steps run, in order.
  pub steps: Vec<String>,
  /// Number of packed entries.
  pub entries: usize,
  pub elapsed: Duration,
  /// Forward manifest of the bundle.
  pub manifest: Manifest,
  pub dist: PathBuf,
  pub embed_file: PathBuf,
}

/// An ordered list of build steps over one configuration.
pub struct Pipeline {
  config: Arc<BuildConfig>,
  steps: Vec<Box<dyn BuildStep>>,
  callbacks: Callbacks,
}

impl Pipeline {
  /// `config` must already be resolved.
  pub fn new(config: BuildConfig) -> Self {
    Self {
      config: Arc::new(config),
      steps: Vec::new(),
      callbacks: Callbacks::new(),
    }
  }

  /// A pipeline running `decls` in order.
  pub fn from_decls(config: BuildConfig, decls: Vec<StepDecl>) -> Self {
    let mut pipeline = Self::new(config);
    for decl in decls {
      pipeline.register_boxed(decl.into_step());
    }
    pipeline
  }

  /// Evaluate the configured step script into a pipeline.
  pub fn from_script(config: BuildConfig) -> Result<Self, BuildError> {
    let decls = evaluate_script(&config)?;
    Ok(Self::from_decls(config, decls))
  }

  pub fn register(&mut self, step: impl BuildStep + 'static) -> &mut Self {
    self.register_boxed(Box::new(step))
  }

  pub fn register_boxed(&mut self, step: Box<dyn BuildStep>) -> &mut Self {
    debug!(step = step.name(), "registered step");
    self.steps.push(step);
    self
  }

  /// Callbacks served alongside the asset callbacks.
  pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
    self.callbacks.extend(callbacks);
    self
  }

  pub fn config(&self) -> &BuildConfig {
    &self.config
  }

  pub fn step_names(&self) -> Vec<&str> {
    self.steps.iter().map(|s| s.name()).collect()
  }

  /// Run every step, then write the bundle and the embeddable listing.
  pub async fn run(self) -> Result<BuildReport, BuildError> {
    let start = Instant::now();
    let config = self.config;

    for dir in [&config.cache, &config.build] {
      std::fs::create_dir_all(dir).map_err(io_err(dir))?;
    }

    let packer = Arc::new(Packer::in_memory().with_manifest_name(&config.manifest_name));
    let mut callbacks = asset_callbacks(Arc::clone(&packer), &config.public_prefix);
    callbacks.extend(self.callbacks);
    let bridge = IpcServer::new(callbacks)?.start()?;

    let ctx = StepContext::new(Arc::clone(&packer), Arc::clone(&config))
      .with_socket(bridge.socket_path())
      .with_cancel(bridge.cancellation_token());

    info!(steps = self.steps.len(), workers = config.workers, "starting build");

    let mut ran = Vec::with_capacity(self.steps.len());
    for step in &self.steps {
      let name = step.name().to_string();
      if ctx.cancel.is_cancelled() {
        warn!(step = %name, "build cancelled before step");
        shutdown_bridge(bridge).await;
        return Err(BuildError::Cancelled);
      }

      info!(step = %name, "running step");
      let step_start = Instant::now();
      if let Err(source) = step.run(ctx.clone()).await {
        error!(step = %name, error = %source, "step failed");
        shutdown_bridge(bridge).await;
        return Err(BuildError::Step { step: name, source });
      }
      info!(step = %name, elapsed_ms = step_start.elapsed().as_millis() as u64, "step complete");
      ran.push(name);
    }

    bridge.shutdown().await?;

    let manifest = write_bundle(&config, &packer)?;
    write_embed_listing(&config, &manifest)?;

    let report = BuildReport {
      steps: ran,
      entries: manifest.len(),
      elapsed: start.elapsed(),
      manifest,
      dist: config.dist.clone(),
      embed_file: config.embed_file.clone(),
    };
    info!(
      entries = report.entries,
      elapsed_ms = report.elapsed.as_millis() as u64,
      "build complete"
    );
    Ok(report)
  }
}

/// Resolve `config`, evaluate its step script and run the result.
pub async fn build(config: BuildConfig) -> Result<BuildReport, BuildError> {
  let config = config.resolve()?;
  Pipeline::from_script(config)?.run().await
}

async fn shutdown_bridge(bridge: crate::ipc::IpcHandle) {
  if let Err(e) = bridge.shutdown().await {
    warn!(error = %e, "failed to shut down callback bridge");
  }
}

/// Replace the dist directory with the exported bundle.
fn write_bundle(config: &BuildConfig, packer: &Packer) -> Result<Manifest, BuildError> {
  match std::fs::remove_dir_all(&config.dist) {
    Ok(()) => debug!(dist = %config.dist.display(), "removed previous bundle"),
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
    Err(e) => return Err(io_err(&config.dist)(e)),
  }

  let mut store = DirStore::new(&config.dist).map_err(io_err(&config.dist))?;
  let manifest = packer.export(&mut store)?;
  info!(dist = %config.dist.display(), entries = manifest.len(), "wrote bundle");
  Ok(manifest)
}

fn write_embed_listing(config: &BuildConfig, manifest: &Manifest) -> Result<(), BuildError> {
  let bundle_dir = EmbedListing::relative_bundle_dir(&config.embed_file, &config.dist);
  let listing = EmbedListing::new(&config.embed_ident, bundle_dir, &config.manifest_name, manifest).render();

  if let Some(parent) = config.embed_file.parent() {
    std::fs::create_dir_all(parent).map_err(io_err(parent))?;
  }
  std::fs::write(&config.embed_file, listing).map_err(io_err(&config.embed_file))?;
  info!(file = %config.embed_file.display(), "wrote embeddable listing");
  Ok(())
}
