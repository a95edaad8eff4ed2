//! Call command integration tests: child tools reaching the bridge through
//! the binary while a build runs.

use predicates::prelude::*;

use super::common::{ASSETPACK_BIN, TestEnv};

#[test]
fn stylesheet_tool_resolves_packed_font() {
  let env = TestEnv::new();
  env.write_file("assets/fonts/a.woff2", "font");
  env.write_file("assets/sass/app.scss", "ignored");
  let script = r#"
assets.static_dir("fonts")
assets.sass{
  tool = { "/bin/sh", "-c", [[printf 'a{src:url(%s)}' "$(@BIN@ call asset_path fonts/a.woff2)" > "$0"]], "{out}" },
}
"#
  .replace("@BIN@", ASSETPACK_BIN);
  env.write_file("assets/assets.lua", &script);

  env.build_cmd().assert().success();

  let manifest = env.manifest();
  let css = env.bundled("/css/app.css");
  assert_eq!(css, format!("a{{src:url(/_/{})}}", manifest["/fonts/a.woff2"]));
}

#[test]
fn asset_call_rewrites_url() {
  let env = TestEnv::new();
  env.write_file("assets/fonts/a.woff2", "font");
  let script = r#"
assets.static_dir("fonts")
assets.exec{
  name = "rewrite",
  cmd = "/bin/sh",
  args = { "-c", [[@BIN@ call asset "/fonts/a.woff2?v=1" > build/url.txt]] },
  outputs = { ["/url.txt"] = "build/url.txt" },
}
"#
  .replace("@BIN@", ASSETPACK_BIN);
  env.write_file("assets/assets.lua", &script);

  env.build_cmd().assert().success();

  let manifest = env.manifest();
  assert_eq!(
    env.bundled("/url.txt"),
    format!("url('/_/{}?v=1')\n", manifest["/fonts/a.woff2"])
  );
}

#[test]
fn list_shows_registered_callbacks() {
  let env = TestEnv::new();
  let script = r#"
assets.exec{
  name = "list",
  cmd = "/bin/sh",
  args = { "-c", [[@BIN@ call --list > build/list.txt]] },
  outputs = { ["/list.txt"] = "build/list.txt" },
}
"#
  .replace("@BIN@", ASSETPACK_BIN);
  env.write_file("assets/assets.lua", &script);

  env.build_cmd().assert().success();

  let list = env.bundled("/list.txt");
  assert!(list.lines().any(|l| l == "asset"));
  assert!(list.lines().any(|l| l == "asset_path"));
}

#[test]
fn remote_error_fails_the_tool() {
  let env = TestEnv::new();
  let script = r#"
assets.exec{
  name = "missing",
  cmd = "/bin/sh",
  args = { "-c", [[@BIN@ call asset_path nope.css]] },
}
"#
  .replace("@BIN@", ASSETPACK_BIN);
  env.write_file("assets/assets.lua", &script);

  env
    .build_cmd()
    .assert()
    .failure()
    .stderr(predicate::str::contains("asset not yet packed: nope.css"));
}
