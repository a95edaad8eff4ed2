//! End-to-end builds through the pipeline.

use std::fs;

use assetpack_lib::config::ConfigError;
use assetpack_lib::manifest::ReverseManifest;
use assetpack_lib::pipeline::{BuildError, Pipeline, build};

use super::common::{Project, failing_tool};

fn full_project() -> Project {
  let project = Project::new();
  project.write("assets/fonts/a.woff2", "font");
  project.write("assets/images/logo.svg", "<svg/>");
  project.write("assets/sass/app.scss", "/*! generated */\nbody{}\n");
  project.write("assets/sass/_partial.scss", "a{}");
  project.write("assets/js/a.js", "var a;\n");
  project.write("assets/js/b.js", "var b;\n");
  project.write("assets/templates/index.html", "<p>{%= T(`Hello\n  there`) %}</p>");
  project.write("assets/assets.lua", r#"assets.js("app.js", { "a.js", "b.js" }, { minify = false })"#);
  project
}

#[tokio::test]
async fn full_build_packs_every_directory() {
  let project = full_project();
  let report = build(project.config()).await.unwrap();

  assert_eq!(
    report.steps,
    vec!["js:app.js", "static:fonts", "images:images", "sass:sass", "templates:templates"]
  );
  let names: Vec<&str> = report.manifest.iter().map(|(name, _)| name.as_str()).collect();
  assert_eq!(
    names,
    vec!["/css/app.css", "/fonts/a.woff2", "/images/logo.svg", "/js/app.js", "/templates/index.html"]
  );

  let dist = project.dist();
  let css = report.manifest.get("/css/app.css").unwrap();
  assert_eq!(fs::read_to_string(dist.join(css)).unwrap(), "body{}\n");
  let js = report.manifest.get("/js/app.js").unwrap();
  assert_eq!(fs::read_to_string(dist.join(js)).unwrap(), "var a;\nvar b;\n");
  let html = report.manifest.get("/templates/index.html").unwrap();
  assert_eq!(fs::read_to_string(dist.join(html)).unwrap(), "<p>{%= T(`Hello there`) %}</p>");

  let reverse: ReverseManifest = serde_json::from_slice(&fs::read(dist.join("manifest.json")).unwrap()).unwrap();
  assert_eq!(reverse.invert().unwrap(), report.manifest);
}

#[tokio::test]
async fn rebuild_without_changes_is_stable() {
  let project = full_project();
  let first = build(project.config()).await.unwrap();

  // Cached image outputs mean the optimizer never runs again.
  let mut config = project.config();
  config.tools.image_optimizer = failing_tool();
  let second = build(config).await.unwrap();

  assert_eq!(first.manifest, second.manifest);
  let mut files: Vec<String> = fs::read_dir(project.dist())
    .unwrap()
    .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
    .collect();
  files.sort();
  assert_eq!(files.len(), second.manifest.len() + 1);
}

#[tokio::test]
async fn content_change_only_moves_content_segment() {
  let project = full_project();
  let before = build(project.config()).await.unwrap();

  project.write("assets/images/logo.svg", "<svg><rect/></svg>");
  let after = build(project.config()).await.unwrap();

  let old = before.manifest.get("/images/logo.svg").unwrap();
  let new = after.manifest.get("/images/logo.svg").unwrap();
  assert_ne!(old, new);
  assert_eq!(old[..7], new[..7]);
  assert!(new.ends_with(".svg"));
  assert!(!project.dist().join(old).exists());
  assert_eq!(before.manifest.get("/fonts/a.woff2"), after.manifest.get("/fonts/a.woff2"));
}

#[tokio::test]
async fn failing_step_is_named_in_error() {
  let project = full_project();
  let mut config = project.config();
  config.tools.sass = failing_tool();

  let err = build(config).await.unwrap_err();
  match &err {
    BuildError::Step { step, .. } => assert_eq!(step, "sass:sass"),
    other => panic!("unexpected error: {other}"),
  }
  assert!(err.to_string().contains("tool exploded"));
}

#[tokio::test]
async fn dist_over_assets_is_rejected_and_sources_survive() {
  let project = full_project();
  let mut config = project.config();
  config.dist = project.wd().join("assets");

  let err = build(config).await.unwrap_err();
  assert!(matches!(err, BuildError::Config(ConfigError::InvalidDist { .. })));
  assert!(project.wd().join("assets/fonts/a.woff2").is_file());
  assert!(project.wd().join("assets/assets.lua").is_file());
}

#[tokio::test]
async fn invalid_config_is_rejected_before_running() {
  let project = full_project();
  let mut config = project.config();
  config.workers = 0;
  assert!(matches!(build(config).await, Err(BuildError::Config(_))));
  assert!(!project.dist().exists());
}

#[tokio::test]
async fn exec_step_talks_to_the_bridge() {
  let project = Project::new();
  project.write("assets/fonts/a.woff2", "font");
  project.write(
    "assets/assets.lua",
    r#"
      assets.exec{
        name = "socket",
        cmd = "/bin/sh",
        args = { "-c", "printf '%s' \"$ASSETPACK_SOCK\" > build/sock.txt" },
        outputs = { ["/sock.txt"] = "build/sock.txt" },
      }
    "#,
  );

  let config = project.config().resolve().unwrap();
  let pipeline = Pipeline::from_script(config).unwrap();
  assert_eq!(pipeline.step_names(), vec!["socket", "static:fonts"]);

  let report = pipeline.run().await.unwrap();
  let fp = report.manifest.get("/sock.txt").unwrap();
  let sock = fs::read_to_string(project.dist().join(fp)).unwrap();
  assert!(sock.ends_with("control.sock"));
}
