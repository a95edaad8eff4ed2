//! Hashing utilities for content addressing.
//!
//! This module provides:
//! - `ContentHash`: a 128-bit hex digest of a byte payload
//! - `hash_bytes()`: hash an in-memory payload
//! - `hash_file()`: hash a file's contents without loading it whole
//!
//! Digests are SHA-256 truncated to their first 16 bytes.

use std::fs;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::consts::CONTENT_HASH_BYTES;

/// A 128-bit content hash.
///
/// # Format
///
/// A lowercase hexadecimal string of 32 characters, e.g.
/// `"9f86d081884c7d659a2feaa0c55ad015"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentHash(pub String);

impl ContentHash {
  /// Returns the first `len` hex characters of the hash.
  ///
  /// Clamps to the full hash when `len` exceeds it.
  pub fn prefix(&self, len: usize) -> &str {
    &self.0[..len.min(self.0.len())]
  }

  fn from_hasher(hasher: Sha256) -> Self {
    let digest = hasher.finalize();
    ContentHash(hex::encode(&digest[..CONTENT_HASH_BYTES]))
  }
}

impl std::fmt::Display for ContentHash {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// Error while hashing a file.
#[derive(Debug, thiserror::Error)]
#[error("failed to read file {}: {source}", path.display())]
pub struct HashFileError {
  pub path: std::path::PathBuf,
  #[source]
  pub source: std::io::Error,
}

/// Hash arbitrary bytes.
pub fn hash_bytes(data: &[u8]) -> ContentHash {
  let mut hasher = Sha256::new();
  hasher.update(data);
  ContentHash::from_hasher(hasher)
}

/// Hash a file's contents.
pub fn hash_file(path: &Path) -> Result<ContentHash, HashFileError> {
  let err = |source| HashFileError {
    path: path.to_path_buf(),
    source,
  };

  let mut file = fs::File::open(path).map_err(err)?;
  let mut hasher = Sha256::new();
  let mut buffer = [0u8; 8192];

  loop {
    let bytes_read = file.read(&mut buffer).map_err(err)?;
    if bytes_read == 0 {
      break;
    }
    hasher.update(&buffer[..bytes_read]);
  }

  Ok(ContentHash::from_hasher(hasher))
}
