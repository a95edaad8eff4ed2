//! External tool invocation.
//!
//! Build steps treat compilers, minifiers and optimizers as opaque
//! subprocesses. A [`Tool`] runs one of them in a working directory with
//! extra environment, either capturing combined output or streaming to the
//! parent's stdio, and turns a non-zero exit into an error carrying the full
//! command line.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::execute::types::ExecuteError;

/// A configured tool: program plus an argument template.
///
/// Arguments may contain `{name}` placeholders filled in per invocation by
/// [`ToolSpec::tool`], e.g. `{in}` and `{out}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSpec {
  pub program: String,
  #[serde(default)]
  pub args: Vec<String>,
}

impl ToolSpec {
  pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      program: program.into(),
      args: args.into_iter().map(Into::into).collect(),
    }
  }

  /// Substitute `{key}` placeholders in every argument.
  ///
  /// An argument that was only placeholders and renders empty is dropped.
  pub fn render_args(&self, vars: &[(&str, &str)]) -> Vec<String> {
    self
      .args
      .iter()
      .filter_map(|arg| {
        let rendered = vars
          .iter()
          .fold(arg.clone(), |acc, (key, value)| acc.replace(&format!("{{{}}}", key), value));
        if rendered.is_empty() && !arg.is_empty() {
          None
        } else {
          Some(rendered)
        }
      })
      .collect()
  }

  /// Build a runnable [`Tool`] with placeholders substituted.
  pub fn tool(&self, vars: &[(&str, &str)]) -> Tool {
    Tool::new(&self.program).args(self.render_args(vars))
  }
}

/// A single subprocess invocation.
#[derive(Debug, Clone, Default)]
pub struct Tool {
  program: String,
  args: Vec<String>,
  cwd: Option<PathBuf>,
  env: BTreeMap<String, String>,
  path_dirs: Vec<PathBuf>,
}

impl Tool {
  pub fn new(program: impl Into<String>) -> Self {
    Self {
      program: program.into(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn args<I, S>(mut self, args: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.args.extend(args.into_iter().map(Into::into));
    self
  }

  pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
    self.cwd = Some(dir.into());
    self
  }

  pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.env.insert(key.into(), value.into());
    self
  }

  /// Directories prepended to the child's `PATH`.
  pub fn path_dirs(mut self, dirs: impl IntoIterator<Item = PathBuf>) -> Self {
    self.path_dirs.extend(dirs);
    self
  }

  pub fn program(&self) -> &str {
    &self.program
  }

  /// The command line, wrapped one argument per line when long.
  pub fn command_line(&self) -> String {
    format_command(&self.program, &self.args)
  }

  /// Run the tool and return its trimmed, combined stdout and stderr.
  pub async fn run(&self) -> Result<String, ExecuteError> {
    info!(cmd = %self.command_line(), "running tool");

    let mut command = self.command()?;
    command
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped());

    let child = command.spawn().map_err(|source| self.spawn_error(source))?;
    let output = child.wait_with_output().await.map_err(|source| self.spawn_error(source))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    let combined = combined.trim().to_string();

    if !output.status.success() {
      debug!(output = %combined, "tool output");
      return Err(ExecuteError::ToolFailed {
        cmd: self.command_line(),
        code: output.status.code(),
        output: combined,
      });
    }

    if !combined.is_empty() {
      debug!(output = %combined, "tool output");
    }

    Ok(combined)
  }

  /// Run the tool with stdout and stderr streamed to the parent's.
  pub async fn run_inherit(&self) -> Result<(), ExecuteError> {
    info!(cmd = %self.command_line(), "running tool");

    let mut command = self.command()?;
    command.stdin(Stdio::null()).stdout(Stdio::inherit()).stderr(Stdio::inherit());

    let status = command.status().await.map_err(|source| self.spawn_error(source))?;
    if !status.success() {
      return Err(ExecuteError::ToolFailed {
        cmd: self.command_line(),
        code: status.code(),
        output: String::new(),
      });
    }

    Ok(())
  }

  fn command(&self) -> Result<Command, ExecuteError> {
    let mut command = Command::new(&self.program);
    command.args(&self.args).kill_on_drop(false);

    if let Some(cwd) = &self.cwd {
      command.current_dir(cwd);
    }

    if !self.path_dirs.is_empty() {
      command.env("PATH", self.search_path()?);
    }

    for (key, value) in &self.env {
      command.env(key, value);
    }

    debug!(program = %self.program, cwd = ?self.cwd, "spawning process");
    Ok(command)
  }

  fn search_path(&self) -> Result<OsString, ExecuteError> {
    let mut dirs: Vec<PathBuf> = self.path_dirs.clone();
    if let Some(current) = std::env::var_os("PATH") {
      dirs.extend(std::env::split_paths(&current));
    }
    std::env::join_paths(dirs).map_err(|e| ExecuteError::Io {
      path: self.path_dirs.first().cloned().unwrap_or_default(),
      source: std::io::Error::new(std::io::ErrorKind::InvalidInput, e),
    })
  }

  fn spawn_error(&self, source: std::io::Error) -> ExecuteError {
    ExecuteError::Spawn {
      cmd: self.command_line(),
      source,
    }
  }
}

/// Format a command for display, breaking long argument lists over lines.
pub fn format_command(program: &str, args: &[String]) -> String {
  let joined = args.iter().map(|a| format!(" {}", a)).collect::<String>();
  if program.len() + joined.len() < 40 {
    return format!("{}{}", program, joined);
  }
  let wrapped = args.iter().map(|a| format!(" \\\n  {}", a)).collect::<String>();
  format!("{}{}", program, wrapped)
}

/// Resolve `path` against `base` unless it is already absolute.
pub fn resolve_in(base: &Path, path: impl AsRef<Path>) -> PathBuf {
  let path = path.as_ref();
  if path.is_absolute() { path.to_path_buf() } else { base.join(path) }
}
