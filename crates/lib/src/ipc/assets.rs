//! Asset lookup callbacks backed by a live packer.
//!
//! Stylesheet compilers call these while a build is still running, so a name
//! may not be packed yet. `asset` answers with a tagged placeholder in that
//! case; `asset_path` answers with an error.

use std::sync::Arc;

use tracing::warn;

use crate::ipc::callbacks::{CallbackError, Callbacks};
use crate::ipc::protocol::Value;
use crate::manifest::Manifest;
use crate::pack::Packer;

pub const ASSET: &str = "asset";
pub const ASSET_PATH: &str = "asset_path";

/// Split a trailing `?query` or, failing that, `#fragment` off `url`.
fn split_suffix(url: &str) -> (&str, &str) {
  if let Some(idx) = url.rfind('?') {
    return (&url[..idx], &url[idx..]);
  }
  if let Some(idx) = url.rfind('#') {
    return (&url[..idx], &url[idx..]);
  }
  (url, "")
}

/// Resolve a stylesheet `url(...)` reference to its public fingerprinted path.
pub fn resolve_url(manifest: &Manifest, prefix: &str, url: &str) -> String {
  let url = url.strip_prefix("..").filter(|u| u.starts_with("/webfonts/")).unwrap_or(url);
  let (path, suffix) = split_suffix(url);
  let name = format!("/{}", path.trim_start_matches('/'));

  match manifest.get(&name) {
    Some(fp) => format!("url('{}{}{}')", prefix, fp, suffix),
    None => {
      warn!(name = %name, "asset not in manifest");
      format!("url('{}__INV:{}{}__')", prefix, path, suffix)
    }
  }
}

fn single_string<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, CallbackError> {
  match args {
    [v] => v
      .as_str()
      .ok_or_else(|| CallbackError::invalid_args(format!("{} expects a string argument", name))),
    _ => Err(CallbackError::invalid_args(format!(
      "{} expects 1 argument, got {}",
      name,
      args.len()
    ))),
  }
}

/// `asset` and `asset_path` callbacks reading `packer`'s current manifest.
pub fn asset_callbacks(packer: Arc<Packer>, prefix: impl Into<String>) -> Callbacks {
  let prefix: Arc<str> = Arc::from(prefix.into());
  let mut callbacks = Callbacks::new();

  let (p, pre) = (Arc::clone(&packer), Arc::clone(&prefix));
  callbacks.register(ASSET, move |args| {
    let url = single_string(ASSET, args)?;
    let manifest = p.manifest().map_err(CallbackError::failed)?;
    Ok(Value::String(resolve_url(&manifest, &pre, url)))
  });

  callbacks.register(ASSET_PATH, move |args| {
    let name = single_string(ASSET_PATH, args)?;
    let key = format!("/{}", name.trim_start_matches('/'));
    let manifest = packer.manifest().map_err(CallbackError::failed)?;
    manifest
      .get(&key)
      .map(|fp| Value::String(format!("{}{}", prefix, fp)))
      .ok_or_else(|| CallbackError::failed(format!("asset not yet packed: {}", name)))
  });

  callbacks
}

#[cfg(test)]
mod tests {
  use super::*;
  use tracing_test::traced_test;

  fn packer() -> Arc<Packer> {
    let packer = Packer::in_memory();
    packer.pack("/images/logo.png", b"png").unwrap();
    packer.pack("/webfonts/fa.woff2", b"font").unwrap();
    Arc::new(packer)
  }

  #[test]
  fn resolves_known_asset() {
    let packer = packer();
    let fp = packer.manifest().unwrap().get("/images/logo.png").unwrap().to_string();
    let callbacks = asset_callbacks(packer, "/_/");

    let out = callbacks.call(ASSET, &[Value::from("/images/logo.png")]).unwrap();
    assert_eq!(out, Value::String(format!("url('/_/{}')", fp)));

    let out = callbacks.call(ASSET, &[Value::from("images/logo.png?v=2")]).unwrap();
    assert_eq!(out, Value::String(format!("url('/_/{}?v=2')", fp)));
  }

  #[test]
  fn rewrites_relative_webfonts() {
    let packer = packer();
    let fp = packer.manifest().unwrap().get("/webfonts/fa.woff2").unwrap().to_string();
    let callbacks = asset_callbacks(packer, "/_/");

    let out = callbacks.call(ASSET, &[Value::from("../webfonts/fa.woff2#iefix")]).unwrap();
    assert_eq!(out, Value::String(format!("url('/_/{}#iefix')", fp)));
  }

  #[test]
  #[traced_test]
  fn unknown_asset_is_placeholder() {
    let callbacks = asset_callbacks(packer(), "/_/");
    let out = callbacks.call(ASSET, &[Value::from("/missing.png?x")]).unwrap();
    assert_eq!(out, Value::from("url('/_/__INV:/missing.png?x__')"));
    assert!(logs_contain("asset not in manifest"));
  }

  #[test]
  fn asset_path_requires_packed_name() {
    let packer = packer();
    let fp = packer.manifest().unwrap().get("/images/logo.png").unwrap().to_string();
    let callbacks = asset_callbacks(packer, "/static/");

    assert_eq!(
      callbacks.call(ASSET_PATH, &[Value::from("images/logo.png")]).unwrap(),
      Value::String(format!("/static/{}", fp))
    );
    let err = callbacks.call(ASSET_PATH, &[Value::from("/nope.css")]).unwrap_err();
    assert_eq!(err.to_string(), "asset not yet packed: /nope.css");
  }

  #[test]
  fn wrong_arity_is_an_error() {
    let callbacks = asset_callbacks(packer(), "/_/");
    assert!(callbacks.call(ASSET, &[]).is_err());
    assert!(callbacks.call(ASSET, &[Value::Int(1)]).is_err());
  }
}
