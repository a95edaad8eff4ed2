use std::path::Path;

use mlua::prelude::*;

use crate::config::BuildConfig;
use crate::lua::globals::{self, Steps};

/// Create a Lua runtime with the `assets` global registered.
///
/// `require` also searches `<assets>/lua/`.
pub fn create_runtime(config: &BuildConfig, steps: Steps) -> LuaResult<Lua> {
  let lua = Lua::new();
  let package: LuaTable = lua.globals().get("package")?;
  let package_path: String = package.get("path")?;
  let lua_dir = config.assets.join("lua");
  package.set(
    "path",
    format!(
      "{dir}/?.lua;{dir}/?/init.lua;{}",
      package_path,
      dir = lua_dir.to_string_lossy()
    ),
  )?;

  globals::register_globals(&lua, config, steps)?;

  Ok(lua)
}

/// Load and execute a Lua file at the given path.
pub fn load_file(lua: &Lua, path: &Path) -> LuaResult<LuaValue> {
  let canonical_path = dunce::canonicalize(path)
    .map_err(|e| LuaError::external(format!("cannot canonicalize '{}': {}", path.display(), e)))?;
  let content = std::fs::read_to_string(&canonical_path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", canonical_path.display(), e)))?;

  lua
    .load(&content)
    .set_name(format!("@{}", canonical_path.display()))
    .eval::<LuaValue>()
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn require_searches_assets_lua_dir() -> LuaResult<()> {
    let temp = TempDir::new().map_err(LuaError::external)?;
    let config = BuildConfig::new(temp.path());
    std::fs::create_dir_all(config.assets.join("lua")).map_err(LuaError::external)?;
    std::fs::write(config.assets.join("lua/shared.lua"), "return { out = 'shared.js' }").map_err(LuaError::external)?;

    let lua = create_runtime(&config, Steps::default())?;
    let out: String = lua.load("return require('shared').out").eval()?;
    assert_eq!(out, "shared.js");
    Ok(())
  }

  #[test]
  fn load_file_names_chunk_after_path() -> LuaResult<()> {
    let temp = TempDir::new().map_err(LuaError::external)?;
    let script = temp.path().join("assets.lua");
    std::fs::write(&script, "error('boom')").map_err(LuaError::external)?;

    let lua = create_runtime(&BuildConfig::new(temp.path()), Steps::default())?;
    let err = load_file(&lua, &script).unwrap_err().to_string();
    assert!(err.contains("assets.lua:1"), "error should point at the script: {}", err);
    Ok(())
  }
}
