//! Terminal output for assetpack commands.
//!
//! Build summaries, manifest entries, scaffolded files and callback results.
//! Colors are only used when the stream supports them.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};

use assetpack_lib::ipc::Value;
use assetpack_lib::manifest::Manifest;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

pub mod symbols {
  pub const SUCCESS: &str = "✓";
  pub const ERROR: &str = "✗";
  pub const EXISTS: &str = "•";
  pub const CREATED: &str = "+";
  pub const MAPS_TO: &str = "->";
}

pub fn format_duration(duration: Duration) -> String {
  let secs = duration.as_secs();
  let millis = duration.subsec_millis();

  if secs >= 60 {
    format!("{}m {}s", secs / 60, secs % 60)
  } else if secs > 0 {
    format!("{}.{:02}s", secs, millis / 10)
  } else {
    format!("{}ms", millis)
  }
}

/// `1 asset`, `3 assets`.
pub fn format_count(n: usize, noun: &str) -> String {
  if n == 1 { format!("1 {}", noun) } else { format!("{} {}s", n, noun) }
}

pub fn print_success(message: &str) {
  println!(
    "{} {}",
    symbols::SUCCESS.if_supports_color(Stream::Stdout, |s| s.green()),
    message
  );
}

pub fn print_error(message: &str) {
  eprintln!(
    "{} {}",
    symbols::ERROR.if_supports_color(Stream::Stderr, |s| s.red()),
    message.if_supports_color(Stream::Stderr, |s| s.red())
  );
}

pub fn print_stat(label: &str, value: &str) {
  println!(
    "  {}: {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}

/// One `logical name -> fingerprinted name` line per entry.
pub fn print_manifest(manifest: &Manifest) {
  for (name, fingerprint) in manifest {
    println!(
      "  {} {} {}",
      name,
      symbols::MAPS_TO.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      fingerprint.if_supports_color(Stream::Stdout, |s| s.cyan())
    );
  }
}

/// A file written by `init`, or one it left alone.
pub fn print_scaffolded(path: &Path, created: bool) {
  if created {
    println!(
      "  {} Created: {}",
      symbols::CREATED.if_supports_color(Stream::Stdout, |s| s.green()),
      path.display()
    );
  } else {
    println!(
      "  {} Exists:  {}",
      symbols::EXISTS.if_supports_color(Stream::Stdout, |s| s.cyan()),
      path.display()
    );
  }
}

/// Callback results: strings print raw so shell tools can splice them in,
/// anything else as compact JSON.
pub fn print_value(value: &Value) -> anyhow::Result<()> {
  match value {
    Value::String(s) => println!("{}", s),
    other => println!("{}", serde_json::to_string(other).context("Failed to serialize result")?),
  }
  Ok(())
}

pub fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}
