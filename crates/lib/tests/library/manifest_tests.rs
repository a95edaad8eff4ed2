//! Manifest behavior across the packer, an exported bundle and back.

use assetpack_lib::manifest::{Manifest, ReverseManifest, fingerprint};
use assetpack_lib::pack::{DirStore, Packer};
use assetpack_lib::util::hash::hash_bytes;
use tempfile::TempDir;

fn is_hex(s: &str) -> bool {
  s.len() == 6 && s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
}

#[test]
fn two_files_produce_two_fingerprints() {
  let packer = Packer::in_memory();
  packer.pack("/a.css", b"a{}").unwrap();
  packer.pack("/img/b.png", b"\x89PNG").unwrap();

  let manifest = packer.manifest().unwrap();
  assert_eq!(manifest.len(), 2);

  let a = manifest.get("/a.css").unwrap();
  assert_eq!(a, fingerprint("/a.css", &hash_bytes(b"a{}")));
  let (path_seg, rest) = a.split_once('.').unwrap();
  let (content_seg, ext) = rest.split_once('.').unwrap();
  assert!(is_hex(path_seg));
  assert!(is_hex(content_seg));
  assert_eq!(ext, "css");

  let b = manifest.get("/img/b.png").unwrap();
  assert!(b.ends_with(".png"));
  assert_ne!(a, b);
}

#[test]
fn same_content_under_two_names_gets_two_fingerprints() {
  let packer = Packer::in_memory();
  packer.pack("/one.txt", b"same").unwrap();
  packer.pack("/two.txt", b"same").unwrap();

  let manifest = packer.manifest().unwrap();
  let one = manifest.get("/one.txt").unwrap();
  let two = manifest.get("/two.txt").unwrap();
  assert_ne!(one[..6], two[..6]);
  assert_eq!(one[7..], two[7..]);
}

#[test]
fn exported_bundle_inverts_to_forward_manifest() {
  let temp = TempDir::new().unwrap();
  let packer = Packer::in_memory();
  packer.pack("/css/app.css", b"body{}").unwrap();
  packer.pack("/js/app.js", b"var a;").unwrap();

  let mut store = DirStore::new(temp.path()).unwrap();
  let manifest = packer.export(&mut store).unwrap();

  for (_, fp) in &manifest {
    assert!(temp.path().join(fp).is_file());
  }
  let raw = std::fs::read(temp.path().join("manifest.json")).unwrap();
  let reverse: ReverseManifest = serde_json::from_slice(&raw).unwrap();
  assert_eq!(reverse.len(), 2);
  assert_eq!(reverse.invert().unwrap(), manifest);

  let forward = Manifest::from_json(manifest.to_json_pretty().unwrap().as_bytes()).unwrap();
  assert_eq!(forward, manifest);
}
