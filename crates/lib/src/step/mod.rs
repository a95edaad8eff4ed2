//! Build steps.
//!
//! A build is an ordered list of named steps. Each step gets a
//! [`StepContext`] holding the shared packer, the resolved configuration and
//! the callback bridge's socket path, and writes its outputs into the packer.
//!
//! Built-in steps:
//! - [`StaticDir`] packs a directory of files as-is
//! - [`Images`] optimizes images incrementally across a worker pool
//! - [`Styles`] compiles top-level stylesheets
//! - [`Scripts`] concatenates and minifies scripts
//! - [`Templates`] minifies HTML templates
//! - [`Exec`] runs an arbitrary tool and packs what it produced
//!
//! The step script declares steps as [`StepDecl`] values.

mod decl;
mod exec;
mod images;
mod scripts;
mod static_dir;
mod styles;
mod templates;

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::config::BuildConfig;
use crate::consts::SOCKET_ENV;
use crate::execute::cmd::{Tool, ToolSpec};
use crate::execute::types::{ExecuteError, PoolError};
use crate::pack::{PackError, Packer};
use crate::util::walk::WalkError;

pub use decl::StepDecl;
pub use exec::Exec;
pub use images::{Images, image_plugin, is_image};
pub use scripts::Scripts;
pub use static_dir::StaticDir;
pub use styles::{Styles, strip_banner_comments};
pub use templates::{Templates, TranslateCalls};

#[derive(Debug, Error)]
pub enum StepError {
  #[error(transparent)]
  Pack(#[from] PackError),

  #[error(transparent)]
  Execute(#[from] ExecuteError),

  #[error(transparent)]
  Pool(#[from] PoolError),

  #[error(transparent)]
  Walk(#[from] WalkError),

  #[error("i/o error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("could not find {}", path.display())]
  Missing { path: PathBuf },

  #[error("{} is not a directory", path.display())]
  NotADirectory { path: PathBuf },

  #[error("{0}")]
  Invalid(String),

  #[error("build cancelled")]
  Cancelled,
}

impl StepError {
  pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    StepError::Io {
      path: path.into(),
      source,
    }
  }
}

pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), StepError>> + Send + 'a>>;

/// One named unit of build work.
pub trait BuildStep: Send + Sync {
  fn name(&self) -> &str;

  fn run(&self, ctx: StepContext) -> StepFuture<'_>;
}

/// Everything a step needs while running.
#[derive(Debug, Clone)]
pub struct StepContext {
  pub packer: Arc<Packer>,
  pub config: Arc<BuildConfig>,
  /// Socket of the running callback bridge, if any.
  pub socket: Option<PathBuf>,
  pub cancel: CancellationToken,
}

impl StepContext {
  pub fn new(packer: Arc<Packer>, config: Arc<BuildConfig>) -> Self {
    Self {
      packer,
      config,
      socket: None,
      cancel: CancellationToken::new(),
    }
  }

  pub fn with_socket(mut self, socket: impl Into<PathBuf>) -> Self {
    self.socket = Some(socket.into());
    self
  }

  pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
    self.cancel = cancel;
    self
  }

  /// A tool running in the working directory with the build environment:
  /// tool dirs on `PATH`, `NODE_PATH`, and the bridge socket.
  pub fn tool(&self, program: impl Into<String>) -> Tool {
    let mut tool = Tool::new(program)
      .current_dir(&self.config.wd)
      .path_dirs(self.config.tool_dirs.iter().cloned())
      .env("NODE_PATH", self.config.node_modules.to_string_lossy());
    if let Some(socket) = &self.socket {
      tool = tool.env(SOCKET_ENV, socket.to_string_lossy());
    }
    tool
  }

  /// [`StepContext::tool`] for a configured tool with placeholders filled in.
  pub fn tool_from(&self, spec: &ToolSpec, vars: &[(&str, &str)]) -> Tool {
    self.tool(&spec.program).args(spec.render_args(vars))
  }

  pub fn check_cancelled(&self) -> Result<(), StepError> {
    if self.cancel.is_cancelled() {
      return Err(StepError::Cancelled);
    }
    Ok(())
  }
}

/// A step backed by a closure.
pub struct FnStep<F> {
  name: String,
  f: F,
}

impl<F, Fut> FnStep<F>
where
  F: Fn(StepContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
  pub fn new(name: impl Into<String>, f: F) -> Self {
    Self { name: name.into(), f }
  }
}

impl<F, Fut> BuildStep for FnStep<F>
where
  F: Fn(StepContext) -> Fut + Send + Sync,
  Fut: Future<Output = Result<(), StepError>> + Send + 'static,
{
  fn name(&self) -> &str {
    &self.name
  }

  fn run(&self, ctx: StepContext) -> StepFuture<'_> {
    Box::pin((self.f)(ctx))
  }
}
