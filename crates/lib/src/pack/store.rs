//! Backing stores for packed content.
//!
//! Names passed to a [`Store`] are already normalized by the packer: absolute,
//! forward-slash separated, no `.` or `..` segments.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Kind and size of a store entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryStat {
  File { len: u64 },
  Dir,
}

/// A hierarchical byte store.
pub trait Store: Debug + Send + Sync {
  fn create_dir_all(&mut self, dir: &str) -> io::Result<()>;

  /// Create or replace a file. Its parent directory must exist.
  fn write(&mut self, name: &str, data: &[u8]) -> io::Result<()>;

  fn read(&self, name: &str) -> io::Result<Vec<u8>>;

  /// Every file in the store, sorted.
  fn walk(&self) -> io::Result<Vec<String>>;

  /// Fails with [`io::ErrorKind::NotFound`] when nothing is at `name`.
  fn stat(&self, name: &str) -> io::Result<EntryStat>;
}

fn not_found(name: &str) -> io::Error {
  io::Error::new(io::ErrorKind::NotFound, format!("{}: no such file or directory", name))
}

fn parent_of(name: &str) -> &str {
  match name.rfind('/') {
    Some(0) | None => "/",
    Some(idx) => &name[..idx],
  }
}

/// In-memory store, used for bundles that are embedded rather than written.
#[derive(Debug, Clone)]
pub struct MemStore {
  files: BTreeMap<String, Vec<u8>>,
  dirs: BTreeSet<String>,
}

impl Default for MemStore {
  fn default() -> Self {
    Self {
      files: BTreeMap::new(),
      dirs: BTreeSet::from(["/".to_string()]),
    }
  }
}

impl MemStore {
  pub fn new() -> Self {
    Self::default()
  }
}

impl Store for MemStore {
  fn create_dir_all(&mut self, dir: &str) -> io::Result<()> {
    let mut current = String::new();
    for segment in dir.split('/').filter(|s| !s.is_empty()) {
      current.push('/');
      current.push_str(segment);
      if self.files.contains_key(&current) {
        return Err(io::Error::new(
          io::ErrorKind::AlreadyExists,
          format!("{}: is a file", current),
        ));
      }
      self.dirs.insert(current.clone());
    }
    Ok(())
  }

  fn write(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
    if !self.dirs.contains(parent_of(name)) {
      return Err(not_found(parent_of(name)));
    }
    if self.dirs.contains(name) {
      return Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("{}: is a directory", name)));
    }
    self.files.insert(name.to_string(), data.to_vec());
    Ok(())
  }

  fn read(&self, name: &str) -> io::Result<Vec<u8>> {
    self.files.get(name).cloned().ok_or_else(|| not_found(name))
  }

  fn walk(&self) -> io::Result<Vec<String>> {
    Ok(self.files.keys().cloned().collect())
  }

  fn stat(&self, name: &str) -> io::Result<EntryStat> {
    if let Some(data) = self.files.get(name) {
      return Ok(EntryStat::File { len: data.len() as u64 });
    }
    if self.dirs.contains(name) {
      return Ok(EntryStat::Dir);
    }
    Err(not_found(name))
  }
}

/// A real directory tree rooted at `root`.
#[derive(Debug, Clone)]
pub struct DirStore {
  root: PathBuf,
}

impl DirStore {
  /// Creates `root` if it does not exist.
  pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
    let root = root.into();
    fs::create_dir_all(&root)?;
    Ok(Self { root })
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  fn path(&self, name: &str) -> PathBuf {
    self.root.join(name.trim_start_matches('/'))
  }
}

impl Store for DirStore {
  fn create_dir_all(&mut self, dir: &str) -> io::Result<()> {
    fs::create_dir_all(self.path(dir))
  }

  fn write(&mut self, name: &str, data: &[u8]) -> io::Result<()> {
    fs::write(self.path(name), data)
  }

  fn read(&self, name: &str) -> io::Result<Vec<u8>> {
    fs::read(self.path(name))
  }

  fn walk(&self) -> io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in WalkDir::new(&self.root).sort_by_file_name() {
      let entry = entry.map_err(io::Error::other)?;
      if !entry.file_type().is_file() {
        continue;
      }
      let rel = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
      let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
      names.push(format!("/{}", joined));
    }
    names.sort();
    Ok(names)
  }

  fn stat(&self, name: &str) -> io::Result<EntryStat> {
    let meta = fs::metadata(self.path(name))?;
    if meta.is_dir() {
      Ok(EntryStat::Dir)
    } else {
      Ok(EntryStat::File { len: meta.len() })
    }
  }
}
