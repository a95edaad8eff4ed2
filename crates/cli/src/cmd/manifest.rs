//! Implementation of the `assetpack manifest` command.

use std::path::Path;

use anyhow::{Context, Result};

use assetpack_lib::manifest::ReverseManifest;

/// Print a built bundle's manifest as indented JSON.
///
/// The bundle stores the reverse manifest; it is inverted back to logical
/// name to fingerprinted name unless `reverse` is set.
pub fn cmd_manifest(dist: &Path, manifest_name: &str, reverse: bool) -> Result<()> {
  let path = dist.join(manifest_name);
  let data = std::fs::read(&path).with_context(|| format!("Failed to read {}", path.display()))?;
  let stored: ReverseManifest =
    serde_json::from_slice(&data).with_context(|| format!("Failed to parse {}", path.display()))?;

  let json = if reverse {
    stored.to_json_pretty()?
  } else {
    stored
      .invert()
      .with_context(|| format!("Invalid manifest {}", path.display()))?
      .to_json_pretty()?
  };
  println!("{}", json);
  Ok(())
}
