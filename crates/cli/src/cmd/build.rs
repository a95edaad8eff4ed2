//! Implementation of the `assetpack build` command.
//!
//! Evaluates the step script, runs every step against the callback bridge and
//! writes the fingerprinted bundle plus its embeddable listing.

use anyhow::{Context, Result};
use tracing::info;

use assetpack_lib::config::BuildConfig;
use assetpack_lib::pipeline::build;

use crate::BuildArgs;
use crate::output::{format_count, format_duration, print_json, print_manifest, print_stat, print_success};

pub fn cmd_build(args: BuildArgs, verbose: bool) -> Result<()> {
  let format = args.output;
  let config = build_config(args, verbose);
  info!(wd = %config.wd.display(), "building assets");

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(build(config))
    .map_err(|e| anyhow::anyhow!("{e}"))
    .context("Build failed")?;

  if format.is_json() {
    let json = serde_json::json!({
      "steps": report.steps,
      "entries": report.entries,
      "elapsed_ms": report.elapsed.as_millis() as u64,
      "dist": report.dist.display().to_string(),
      "embed_file": report.embed_file.display().to_string(),
      "manifest": report.manifest,
    });
    return print_json(&json);
  }

  print_success(&format!(
    "Packed {} in {}",
    format_count(report.entries, "asset"),
    format_duration(report.elapsed)
  ));
  print_stat("Steps", &report.steps.join(", "));
  print_stat("Bundle", &report.dist.display().to_string());
  print_stat("Listing", &report.embed_file.display().to_string());

  if verbose {
    println!();
    print_manifest(&report.manifest);
  }

  Ok(())
}

/// Overlay the command-line flags on the defaults derived from the working
/// directory. Paths derived from an overridden assets dir follow it.
fn build_config(args: BuildArgs, verbose: bool) -> BuildConfig {
  let mut config = BuildConfig::new(&args.wd);
  config.verbose = verbose;

  if let Some(assets) = args.assets {
    let assets = args.wd.join(assets);
    config.dist = assets.join("dist");
    config.script = assets.join(assetpack_lib::consts::SCRIPT_NAME);
    config.embed_file = assets.join(assetpack_lib::consts::EMBED_FILE_NAME);
    config.assets = assets;
  }
  if let Some(script) = args.script {
    config.script = args.wd.join(script);
  }
  if let Some(dist) = args.dist {
    config.dist = args.wd.join(dist);
  }
  if let Some(embed_file) = args.embed_file {
    config.embed_file = args.wd.join(embed_file);
  }
  if let Some(workers) = args.workers {
    config.workers = workers;
  }
  if let Some(name) = args.manifest_name {
    config.manifest_name = name;
  }
  if let Some(prefix) = args.prefix {
    config.public_prefix = prefix;
  }
  if let Some(ident) = args.embed_ident {
    config.embed_ident = ident;
  }
  if let Some(name) = args.trans_func_name {
    config.trans_func_name = name;
  }
  config
}
