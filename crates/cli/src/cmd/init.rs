//! Implementation of the `assetpack init` command.

use std::path::Path;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use assetpack_lib::init::{InitOptions, scaffold};

use crate::output::{print_scaffolded, symbols};

/// Scaffold `path` as an assets directory. Existing files are kept.
pub fn cmd_init(path: &Path) -> Result<()> {
  let options = InitOptions {
    assets_dir: path.to_path_buf(),
  };
  let result = scaffold(&options).context("Failed to initialize assets directory")?;

  println!(
    "{} {}",
    symbols::SUCCESS.green(),
    "Initialized assets directory!".green().bold()
  );
  println!();
  for file in &result.created {
    print_scaffolded(file, true);
  }
  for file in &result.skipped {
    print_scaffolded(file, false);
  }
  println!();
  println!("{}", "Next steps:".bold());
  println!(
    "  1. Add fonts, images, sass or templates directories, or declare steps in {}",
    path.join(assetpack_lib::consts::SCRIPT_NAME).display().to_string().cyan()
  );
  println!("  2. Run: {}", "assetpack build".cyan());

  Ok(())
}
