//! Content packer.
//!
//! The [`Packer`] accumulates named byte payloads in a backing [`Store`] and
//! records a content hash for each. Names are logical, absolute and
//! forward-slash separated (`/css/app.css`). Hashes are always computed here
//! from the stored bytes.
//!
//! One `RwLock` guards the store and the hash table together: packing takes
//! the write lock, reading and manifest generation take the read lock.

mod store;

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;
use tracing::debug;

use crate::consts::DEFAULT_MANIFEST_NAME;
use crate::manifest::{Manifest, ManifestError, fingerprint};
use crate::util::hash::{ContentHash, hash_bytes};

pub use store::{DirStore, EntryStat, MemStore, Store};

#[derive(Debug, Error)]
pub enum PackError {
  #[error("invalid asset name {name:?}: {reason}")]
  InvalidName { name: String, reason: &'static str },

  #[error("i/o error on {name}: {source}")]
  Io {
    name: String,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Manifest(#[from] ManifestError),

  #[error("packer lock poisoned")]
  Poisoned,
}

#[derive(Debug)]
struct PackerState {
  store: Box<dyn Store>,
  hashes: BTreeMap<String, ContentHash>,
}

/// Write-once content packer for a single build.
#[derive(Debug)]
pub struct Packer {
  state: RwLock<PackerState>,
  manifest_name: String,
}

impl Default for Packer {
  fn default() -> Self {
    Self::new(MemStore::new())
  }
}

impl Packer {
  pub fn new(store: impl Store + 'static) -> Self {
    Self {
      state: RwLock::new(PackerState {
        store: Box::new(store),
        hashes: BTreeMap::new(),
      }),
      manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
    }
  }

  pub fn in_memory() -> Self {
    Self::default()
  }

  /// Use `name` as the manifest file inside the store.
  pub fn with_manifest_name(mut self, name: impl Into<String>) -> Self {
    self.manifest_name = name.into();
    self
  }

  pub fn manifest_name(&self) -> &str {
    &self.manifest_name
  }

  fn manifest_path(&self) -> String {
    format!("/{}", self.manifest_name.trim_start_matches('/'))
  }

  fn read_state(&self) -> Result<RwLockReadGuard<'_, PackerState>, PackError> {
    self.state.read().map_err(|_| PackError::Poisoned)
  }

  fn write_state(&self) -> Result<RwLockWriteGuard<'_, PackerState>, PackError> {
    self.state.write().map_err(|_| PackError::Poisoned)
  }

  /// Store `data` under `name`, replacing any earlier payload.
  pub fn pack(&self, name: &str, data: &[u8]) -> Result<(), PackError> {
    let name = normalize_name(name)?;
    if name == self.manifest_path() {
      return Err(PackError::InvalidName {
        name,
        reason: "reserved for the manifest",
      });
    }
    let hash = hash_bytes(data);

    let mut state = self.write_state()?;
    let io_err = |source| PackError::Io {
      name: name.clone(),
      source,
    };
    state.store.create_dir_all(parent_dir(&name)).map_err(io_err)?;
    state.store.write(&name, data).map_err(io_err)?;
    debug!(name = %name, bytes = data.len(), hash = %hash, "packed entry");
    state.hashes.insert(name, hash);
    Ok(())
  }

  pub fn pack_reader(&self, name: &str, mut reader: impl Read) -> Result<(), PackError> {
    let mut data = Vec::new();
    reader.read_to_end(&mut data).map_err(|source| PackError::Io {
      name: name.to_string(),
      source,
    })?;
    self.pack(name, &data)
  }

  pub fn pack_file(&self, name: &str, path: &Path) -> Result<(), PackError> {
    let data = std::fs::read(path).map_err(|source| PackError::Io {
      name: format!("{} ({})", name, path.display()),
      source,
    })?;
    self.pack(name, &data)
  }

  pub fn read(&self, name: &str) -> Result<Vec<u8>, PackError> {
    let name = normalize_name(name)?;
    let state = self.read_state()?;
    state.store.read(&name).map_err(|source| PackError::Io { name, source })
  }

  pub fn contains(&self, name: &str) -> bool {
    let Ok(name) = normalize_name(name) else {
      return false;
    };
    self.read_state().map(|s| s.hashes.contains_key(&name)).unwrap_or(false)
  }

  pub fn hash(&self, name: &str) -> Option<ContentHash> {
    let name = normalize_name(name).ok()?;
    self.read_state().ok()?.hashes.get(&name).cloned()
  }

  /// Number of packed entries.
  pub fn len(&self) -> usize {
    self.read_state().map(|s| s.hashes.len()).unwrap_or(0)
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Packed names in sorted order.
  pub fn names(&self) -> Vec<String> {
    self.read_state().map(|s| s.hashes.keys().cloned().collect()).unwrap_or_default()
  }

  /// Forward manifest of everything currently in the store.
  ///
  /// Files present in the store without a recorded hash are hashed from
  /// their bytes. The manifest's own file is skipped.
  pub fn manifest(&self) -> Result<Manifest, PackError> {
    let state = self.read_state()?;
    let manifest_path = self.manifest_path();
    let names = state.store.walk().map_err(|source| PackError::Io {
      name: "/".to_string(),
      source,
    })?;

    let mut manifest = Manifest::new();
    for name in names {
      if name == manifest_path {
        continue;
      }
      let hash = match state.hashes.get(&name) {
        Some(hash) => hash.clone(),
        None => {
          let data = state.store.read(&name).map_err(|source| PackError::Io {
            name: name.clone(),
            source,
          })?;
          hash_bytes(&data)
        }
      };
      let fp = fingerprint(&name, &hash);
      manifest.insert_checked(name, fp)?;
    }
    Ok(manifest)
  }

  /// Indented JSON of the forward manifest.
  pub fn manifest_bytes(&self) -> Result<Vec<u8>, PackError> {
    Ok(self.manifest()?.to_json_pretty()?.into_bytes())
  }

  /// Write the forward manifest into the store.
  pub fn write_manifest(&self) -> Result<(), PackError> {
    let json = self.manifest()?.to_json_pretty()?;
    self.write_raw(&self.manifest_path(), json.as_bytes())
  }

  /// Write the reverse manifest into the store.
  pub fn write_manifest_inverted(&self) -> Result<(), PackError> {
    let json = self.manifest()?.invert()?.to_json_pretty()?;
    self.write_raw(&self.manifest_path(), json.as_bytes())
  }

  fn write_raw(&self, name: &str, data: &[u8]) -> Result<(), PackError> {
    let mut state = self.write_state()?;
    state.store.write(name, data).map_err(|source| PackError::Io {
      name: name.to_string(),
      source,
    })
  }

  /// Copy every entry into `target` under its fingerprinted name, followed by
  /// the reverse manifest.
  pub fn export(&self, target: &mut dyn Store) -> Result<Manifest, PackError> {
    let manifest = self.manifest()?;
    let reverse = manifest.invert()?;
    {
      let state = self.read_state()?;
      for (name, fp) in &manifest {
        let data = state.store.read(name).map_err(|source| PackError::Io {
          name: name.clone(),
          source,
        })?;
        let target_name = format!("/{}", fp);
        target.write(&target_name, &data).map_err(|source| PackError::Io {
          name: target_name,
          source,
        })?;
      }
    }
    let manifest_path = self.manifest_path();
    target
      .write(&manifest_path, reverse.to_json_pretty()?.as_bytes())
      .map_err(|source| PackError::Io {
        name: manifest_path,
        source,
      })?;
    Ok(manifest)
  }
}

fn parent_dir(name: &str) -> &str {
  match name.rfind('/') {
    Some(0) | None => "/",
    Some(idx) => &name[..idx],
  }
}

/// Normalize a logical name to a single leading slash.
pub fn normalize_name(name: &str) -> Result<String, PackError> {
  let invalid = |reason| PackError::InvalidName {
    name: name.to_string(),
    reason,
  };

  let trimmed = name.trim_start_matches('/');
  if trimmed.is_empty() {
    return Err(invalid("empty name"));
  }
  if trimmed.ends_with('/') {
    return Err(invalid("trailing slash"));
  }
  for segment in trimmed.split('/') {
    match segment {
      "" => return Err(invalid("empty path segment")),
      "." | ".." => return Err(invalid("relative path segment")),
      _ => {}
    }
  }
  Ok(format!("/{}", trimmed))
}
