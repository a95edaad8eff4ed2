//! Test utilities for assetpack-lib.
//!
//! Shell-backed stand-ins for the external tools the build steps invoke.

use crate::execute::cmd::ToolSpec;

/// Returns the shell command and args to execute a shell script.
pub fn shell_cmd(script: &str) -> (&'static str, Vec<String>) {
  ("/bin/sh", vec!["-c".to_string(), script.to_string()])
}

/// A tool that copies `{in}` to `{out}`.
pub fn copy_tool() -> ToolSpec {
  ToolSpec::new("/bin/cp", ["{in}", "{out}"])
}

/// A tool that copies `{in}` to `{out}` and appends a marker line, so tests
/// can tell processed output from source.
pub fn marking_tool(marker: &str) -> ToolSpec {
  let (program, mut args) = shell_cmd(&format!("cat \"$1\" > \"$2\" && echo '{}' >> \"$2\"", marker));
  args.extend(["marking-tool".to_string(), "{in}".to_string(), "{out}".to_string()]);
  ToolSpec::new(program, args)
}

/// A tool that always fails.
pub fn failing_tool() -> ToolSpec {
  let (program, args) = shell_cmd("echo 'tool exploded' >&2; exit 3");
  ToolSpec::new(program, args)
}
