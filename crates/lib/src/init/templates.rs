//! Template content for `assetpack init`.

/// Starter step script.
pub const ASSETS_LUA_TEMPLATE: &str = r#"-- assetpack step script.
--
-- Directories named fonts, images, sass and templates under the assets
-- directory get a step automatically; declare them here to change their
-- options.

-- assets.js("app.js", { "vendor.js", "main.js" })

-- assets.sass{ include = { ".cache/node_modules" } }

-- assets.exec{
--   name = "sitemap",
--   cmd = "gen-sitemap",
--   args = { "-out", "build/sitemap.xml" },
--   outputs = { ["/sitemap.xml"] = "build/sitemap.xml" },
-- }
"#;

/// Ignore rules for the generated bundle inside the assets directory.
pub const GITIGNORE_TEMPLATE: &str = "/dist/\n";

/// Template for .luarc.json (LuaLS configuration)
pub const LUARC_JSON_TEMPLATE: &str = r#"{
  "$schema": "https://raw.githubusercontent.com/LuaLS/vscode-lua/master/setting/schema.json",
  "runtime": {
    "version": "Lua 5.4"
  },
  "diagnostics": {
    "globals": ["assets"]
  }
}
"#;
