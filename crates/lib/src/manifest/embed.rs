//! Generated Rust source embedding a bundle into a host binary.

use std::path::Path;

use crate::manifest::Manifest;

/// A listing of every bundle file as an `include_bytes!` entry.
///
/// The manifest file comes first, followed by each fingerprinted name in
/// sorted order.
#[derive(Debug, Clone)]
pub struct EmbedListing<'a> {
  ident: &'a str,
  bundle_dir: String,
  manifest_name: &'a str,
  manifest: &'a Manifest,
}

impl<'a> EmbedListing<'a> {
  /// `bundle_dir` is the bundle directory as seen from the generated file.
  pub fn new(ident: &'a str, bundle_dir: impl Into<String>, manifest_name: &'a str, manifest: &'a Manifest) -> Self {
    Self {
      ident,
      bundle_dir: bundle_dir.into(),
      manifest_name,
      manifest,
    }
  }

  /// Bundle dir of `dist` relative to the directory of `listing_file`.
  pub fn relative_bundle_dir(listing_file: &Path, dist: &Path) -> String {
    let base = listing_file.parent().unwrap_or(Path::new(""));
    match dist.strip_prefix(base) {
      Ok(rel) => rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/"),
      Err(_) => dist.to_string_lossy().into_owned(),
    }
  }

  fn entry(&self, file: &str) -> String {
    let path = if self.bundle_dir.is_empty() {
      file.to_string()
    } else {
      format!("{}/{}", self.bundle_dir, file)
    };
    format!("  ({:?}, include_bytes!({:?})),", file, path)
  }

  /// Newline-joined entries, without the surrounding declaration.
  pub fn entries(&self) -> String {
    std::iter::once(self.manifest_name)
      .chain(self.manifest.fingerprints())
      .map(|file| self.entry(file))
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn render(&self) -> String {
    format!(
      "// Code generated by assetpack. DO NOT EDIT.\n\n\
       /// Bundle files by name. The first entry is the reverse manifest.\n\
       pub static {}: &[(&str, &[u8])] = &[\n{}\n];\n",
      self.ident,
      self.entries()
    )
  }
}

/// Whether `s` is usable as the generated static's identifier.
pub fn is_valid_identifier(s: &str) -> bool {
  let mut chars = s.chars();
  match chars.next() {
    Some(c) if c.is_alphabetic() || c == '_' => {}
    _ => return false,
  }
  if s == "_" {
    return false;
  }
  chars.all(|c| c.is_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Manifest {
    let mut manifest = Manifest::new();
    manifest.insert_checked("/js/app.js", "bbbbbb.222222.js").unwrap();
    manifest.insert_checked("/css/app.css", "aaaaaa.111111.css").unwrap();
    manifest
  }

  #[test]
  fn manifest_first_then_sorted_fingerprints() {
    let manifest = sample();
    let listing = EmbedListing::new("ASSETS", "dist", "manifest.json", &manifest);
    assert_eq!(
      listing.entries(),
      [
        r#"  ("manifest.json", include_bytes!("dist/manifest.json")),"#,
        r#"  ("aaaaaa.111111.css", include_bytes!("dist/aaaaaa.111111.css")),"#,
        r#"  ("bbbbbb.222222.js", include_bytes!("dist/bbbbbb.222222.js")),"#,
      ]
      .join("\n")
    );
  }

  #[test]
  fn render_declares_static() {
    let manifest = sample();
    let out = EmbedListing::new("BUNDLE", "dist", "manifest.json", &manifest).render();
    assert!(out.starts_with("// Code generated by assetpack. DO NOT EDIT."));
    assert!(out.contains("pub static BUNDLE: &[(&str, &[u8])] = &[\n"));
    assert!(out.ends_with("];\n"));
  }

  #[test]
  fn relative_bundle_dir_from_listing_location() {
    assert_eq!(
      EmbedListing::relative_bundle_dir(Path::new("/p/assets/assets.rs"), Path::new("/p/assets/dist")),
      "dist"
    );
    assert_eq!(
      EmbedListing::relative_bundle_dir(Path::new("/p/src/assets.rs"), Path::new("/out/dist")),
      "/out/dist"
    );
  }

  #[test]
  fn identifiers() {
    assert!(is_valid_identifier("ASSETS"));
    assert!(is_valid_identifier("_bundle2"));
    assert!(!is_valid_identifier(""));
    assert!(!is_valid_identifier("_"));
    assert!(!is_valid_identifier("2fast"));
    assert!(!is_valid_identifier("has-dash"));
  }
}
