//! Implementation of the `assetpack call` command.
//!
//! Lets shell-driven tools started by a build reach the callback bridge.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};

use assetpack_lib::consts::SOCKET_ENV;
use assetpack_lib::ipc::{Value, client};

use crate::output::print_value;

/// Call `name` with `args` and print the result; strings print raw, anything
/// else as JSON.
pub fn cmd_call(name: Option<&str>, args: &[String], socket: Option<PathBuf>, list: bool) -> Result<()> {
  let socket = socket
    .or_else(client::socket_from_env)
    .ok_or_else(|| anyhow!("No bridge socket: pass --socket or run under a build that sets {}", SOCKET_ENV))?;

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;

  if list {
    let names = rt.block_on(client::list_functions(&socket)).context("list-functions failed")?;
    for name in names {
      println!("{}", name);
    }
    return Ok(());
  }

  let name = name.ok_or_else(|| anyhow!("Missing callback name"))?;
  let args: Vec<Value> = args.iter().map(|a| Value::from_arg(a)).collect();
  let value = rt
    .block_on(client::call(&socket, name, args))
    .with_context(|| format!("Callback {} failed", name))?;

  print_value(&value)
}
