//! Build command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

/// Step script using `cp` in place of the real image and sass toolchain.
const COPY_TOOLS_SCRIPT: &str = r#"
assets.images{ tool = { "/bin/cp", "{in}", "{out}" } }
assets.sass{ tool = { "/bin/cp", "{in}", "{out}" } }
assets.js("app.js", { "a.js", "b.js" }, { minify = false })
"#;

fn full_env() -> TestEnv {
  let env = TestEnv::new();
  env.write_file("assets/assets.lua", COPY_TOOLS_SCRIPT);
  env.write_file("assets/fonts/a.woff2", "font");
  env.write_file("assets/images/logo.svg", "<svg/>");
  env.write_file("assets/sass/app.scss", "/*! v1 */\nbody{}\n");
  env.write_file("assets/js/a.js", "var a;\n");
  env.write_file("assets/js/b.js", "var b;\n");
  env
}

#[test]
fn build_packs_all_steps() {
  let env = full_env();

  env
    .build_cmd()
    .assert()
    .success()
    .stdout(predicate::str::contains("Packed 4 assets"))
    .stdout(predicate::str::contains("images:images, sass:sass, js:app.js, static:fonts"));

  assert_eq!(env.bundled("/css/app.css"), "body{}\n");
  assert_eq!(env.bundled("/js/app.js"), "var a;\nvar b;\n");
  assert_eq!(env.bundled("/fonts/a.woff2"), "font");
  assert_eq!(env.bundled("/images/logo.svg"), "<svg/>");

  let listing = std::fs::read_to_string(env.wd().join("assets/assets.rs")).unwrap();
  assert!(listing.contains("pub static ASSETS"));
}

#[test]
fn build_json_output_has_manifest() {
  let env = full_env();

  let output = env.build_cmd().arg("--output").arg("json").output().unwrap();
  assert!(output.status.success());

  let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(json["entries"], 4);
  let manifest = env.manifest();
  assert_eq!(json["manifest"]["/js/app.js"], manifest["/js/app.js"].as_str());
}

#[test]
fn manifest_command_prints_forward_manifest() {
  let env = full_env();
  env.build_cmd().assert().success();
  let manifest = env.manifest();

  let output = env.assetpack_cmd().arg("manifest").output().unwrap();
  assert!(output.status.success());
  let printed: std::collections::BTreeMap<String, String> = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(printed, manifest);

  env
    .assetpack_cmd()
    .arg("manifest")
    .arg("--reverse")
    .assert()
    .success()
    .stdout(predicate::str::contains(format!(
      "\"{}\": \"/fonts/a.woff2\"",
      manifest["/fonts/a.woff2"]
    )));
}

#[test]
fn rebuild_keeps_fingerprints() {
  let env = full_env();
  env.build_cmd().assert().success();
  let first = env.manifest();

  env.build_cmd().assert().success();
  assert_eq!(env.manifest(), first);

  env.write_file("assets/js/b.js", "var b = 2;\n");
  env.build_cmd().assert().success();
  let second = env.manifest();
  assert_ne!(second["/js/app.js"], first["/js/app.js"]);
  assert_eq!(second["/js/app.js"][..6], first["/js/app.js"][..6]);
  assert_eq!(second["/css/app.css"], first["/css/app.css"]);
}

#[test]
fn failing_tool_fails_the_build() {
  let env = TestEnv::new();
  env.write_file("assets/sass/app.scss", "body{}");
  env.write_file(
    "assets/assets.lua",
    r#"assets.sass{ tool = { "/bin/sh", "-c", "echo 'bad scss' >&2; exit 1" } }"#,
  );

  env
    .build_cmd()
    .assert()
    .failure()
    .stderr(predicate::str::contains("step sass:sass failed"))
    .stderr(predicate::str::contains("bad scss"));
  assert!(!env.dist().exists());
}

#[test]
fn custom_manifest_name_and_ident() {
  let env = TestEnv::new();
  env.write_file("assets/fonts/a.woff2", "font");

  env
    .build_cmd()
    .arg("--manifest-name")
    .arg("files.json")
    .arg("--embed-ident")
    .arg("STATIC_FILES")
    .assert()
    .success();

  assert!(env.dist().join("files.json").exists());
  let listing = std::fs::read_to_string(env.wd().join("assets/assets.rs")).unwrap();
  assert!(listing.contains("STATIC_FILES"));

  env
    .assetpack_cmd()
    .arg("manifest")
    .arg("--manifest-name")
    .arg("files.json")
    .assert()
    .success()
    .stdout(predicate::str::contains("/fonts/a.woff2"));
}
