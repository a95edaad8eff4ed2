//! Types for tool execution and the worker pool.
//!
//! This module defines the error types used when running external tools and
//! fanning per-file work out across workers.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from running an external tool.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// The tool could not be started (missing executable, permissions).
  #[error("could not run {cmd}: {source}")]
  Spawn {
    cmd: String,
    #[source]
    source: std::io::Error,
  },

  /// The tool ran and exited unsuccessfully.
  #[error("command failed with exit code {code:?}: {cmd}{}", format_output(output))]
  ToolFailed {
    cmd: String,
    code: Option<i32>,
    output: String,
  },

  /// I/O error preparing a tool invocation or handling its output.
  #[error("io error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },
}

fn format_output(output: &str) -> String {
  if output.is_empty() {
    String::new()
  } else {
    format!("\n{}", output)
  }
}

/// Errors raised by the worker pool itself, as opposed to by work items.
#[derive(Debug, Error)]
pub enum PoolError {
  /// Worker count must be at least one.
  #[error("workers must be at least 1, got {0}")]
  InvalidWorkerCount(usize),

  /// A worker task panicked or was aborted.
  #[error("worker task failed: {0}")]
  WorkerFailed(String),
}

/// Available parallelism plus one.
pub fn default_workers() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4) + 1
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_workers_exceeds_parallelism() {
    assert!(default_workers() >= 2);
  }

  #[test]
  fn tool_failed_display_includes_command_and_output() {
    let err = ExecuteError::ToolFailed {
      cmd: "imagemin --plugin=svgo logo.svg".to_string(),
      code: Some(2),
      output: "bad svg".to_string(),
    };
    let msg = err.to_string();
    assert!(msg.contains("exit code Some(2)"));
    assert!(msg.contains("imagemin --plugin=svgo logo.svg"));
    assert!(msg.ends_with("\nbad svg"));
  }

  #[test]
  fn tool_failed_display_without_output() {
    let err = ExecuteError::ToolFailed {
      cmd: "sass".to_string(),
      code: None,
      output: String::new(),
    };
    assert_eq!(err.to_string(), "command failed with exit code None: sass");
  }
}
