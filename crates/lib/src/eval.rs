//! Step script evaluation.
//!
//! [`evaluate_script`] runs the step script and returns the declared steps
//! followed by the directory steps implied by the assets layout.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::consts::{FONTS_DIR, IMAGES_DIR, SASS_DIR, TEMPLATES_DIR};
use crate::lua::globals::Steps;
use crate::lua::runtime;
use crate::step::StepDecl;

/// Errors that can occur during step script evaluation.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
  /// Lua evaluation error.
  #[error("lua error: {0}")]
  Lua(#[from] LuaError),

  #[error("step script {} is not a file", path.display())]
  NotAFile { path: PathBuf },

  #[error("path {} must be a directory", path.display())]
  NotADirectory { path: PathBuf },

  #[error("could not stat {}: {source}", path.display())]
  Stat {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

/// Evaluate the configured step script and return every step to run, in order.
///
/// A missing script declares nothing. Afterwards a [`StepDecl`] is appended
/// for each of the `fonts`, `images`, `sass` and `templates` directories that
/// exists under the assets directory and was not already declared.
pub fn evaluate_script(config: &BuildConfig) -> Result<Vec<StepDecl>, EvalError> {
  let mut steps = match std::fs::metadata(&config.script) {
    Ok(meta) if meta.is_file() => load_steps(config, &config.script)?,
    Ok(_) => {
      return Err(EvalError::NotAFile {
        path: config.script.clone(),
      });
    }
    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
      debug!(script = %config.script.display(), "no step script");
      Vec::new()
    }
    Err(source) => {
      return Err(EvalError::Stat {
        path: config.script.clone(),
        source,
      });
    }
  };

  add_directory_steps(config, &mut steps)?;
  info!(steps = steps.len(), "evaluated step script");
  Ok(steps)
}

fn load_steps(config: &BuildConfig, script: &Path) -> Result<Vec<StepDecl>, EvalError> {
  let steps = Steps::default();

  // lua must be dropped before the step list can be unwrapped
  {
    let lua = runtime::create_runtime(config, steps.clone())?;
    runtime::load_file(&lua, script)?;
  }

  let steps = Rc::try_unwrap(steps).map_err(|_| LuaError::external("step list still referenced after evaluation"))?;
  Ok(steps.into_inner())
}

fn add_directory_steps(config: &BuildConfig, steps: &mut Vec<StepDecl>) -> Result<(), EvalError> {
  for dir in [FONTS_DIR, IMAGES_DIR, SASS_DIR, TEMPLATES_DIR] {
    let path = config.asset_dir(dir);
    match std::fs::metadata(&path) {
      Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
      Err(source) => return Err(EvalError::Stat { path, source }),
      Ok(meta) if !meta.is_dir() => return Err(EvalError::NotADirectory { path }),
      Ok(_) => {}
    }
    if steps.iter().any(|s| s.covers_dir(dir)) {
      continue;
    }

    debug!(dir, "adding directory step");
    steps.push(match dir {
      FONTS_DIR => StepDecl::StaticDir { name: dir.to_string() },
      IMAGES_DIR => StepDecl::Images {
        dir: dir.to_string(),
        tool: None,
      },
      SASS_DIR => StepDecl::Sass {
        dir: dir.to_string(),
        include: Vec::new(),
        tool: None,
        post: None,
      },
      _ => StepDecl::Templates {
        dir: dir.to_string(),
        tool: None,
      },
    });
  }
  Ok(())
}
