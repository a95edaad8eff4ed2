//! Logical name to fingerprinted name mapping.
//!
//! A fingerprinted name is built from the logical name and the content hash:
//!
//! ```text
//! hex(hash(path))[0..6] + "." + hex(hash(content))[0..6] + ext(path)
//! ```
//!
//! where `path` is the logical name without its leading slash. The same name
//! with unchanged content always gets the same fingerprint; changing content
//! only changes the second segment.
//!
//! The forward map must be injective for the reverse map to exist, so a
//! fingerprint reused by a different logical name is a hard error.

mod embed;

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::FINGERPRINT_SEGMENT_LEN;
use crate::util::hash::{ContentHash, hash_bytes};

pub use embed::{EmbedListing, is_valid_identifier};

#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("fingerprint {fingerprint} of {name} collides with {existing}")]
  Collision {
    fingerprint: String,
    name: String,
    existing: String,
  },

  #[error("logical name {name} appears for both {first} and {second}")]
  DuplicateName {
    name: String,
    first: String,
    second: String,
  },

  #[error("invalid manifest json: {0}")]
  Json(#[from] serde_json::Error),
}

/// Compute the fingerprinted name for a logical name and its content hash.
pub fn fingerprint(name: &str, content: &ContentHash) -> String {
  let path_hash = hash_bytes(name.trim_start_matches('/').as_bytes());
  format!(
    "{}.{}{}",
    path_hash.prefix(FINGERPRINT_SEGMENT_LEN),
    content.prefix(FINGERPRINT_SEGMENT_LEN),
    path_extension(name)
  )
}

/// Extension of the final path segment, including the dot.
///
/// Everything from the last `.` of the final segment, so `/.gitignore` is all
/// extension and `/a.b/c` has none.
pub fn path_extension(name: &str) -> &str {
  let segment = name.rsplit('/').next().unwrap_or(name);
  match segment.rfind('.') {
    Some(idx) => &segment[idx..],
    None => "",
  }
}

/// Forward manifest: logical name to fingerprinted name, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
  entries: BTreeMap<String, String>,
  fingerprints: BTreeMap<String, String>,
}

impl Manifest {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, name: &str) -> Option<&str> {
    self.entries.get(name).map(String::as_str)
  }

  /// Logical name owning a fingerprinted name.
  pub fn name_of(&self, fingerprint: &str) -> Option<&str> {
    self.fingerprints.get(fingerprint).map(String::as_str)
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Fingerprinted names in sorted order.
  pub fn fingerprints(&self) -> impl Iterator<Item = &str> {
    self.fingerprints.keys().map(String::as_str)
  }

  /// Insert a mapping, rejecting a fingerprint owned by another name.
  ///
  /// Re-inserting a name replaces its previous fingerprint.
  pub fn insert_checked(&mut self, name: impl Into<String>, fingerprint: impl Into<String>) -> Result<(), ManifestError> {
    let name = name.into();
    let fingerprint = fingerprint.into();

    if let Some(existing) = self.fingerprints.get(&fingerprint)
      && existing != &name
    {
      return Err(ManifestError::Collision {
        fingerprint,
        name,
        existing: existing.clone(),
      });
    }

    if let Some(previous) = self.entries.insert(name.clone(), fingerprint.clone()) {
      self.fingerprints.remove(&previous);
    }
    self.fingerprints.insert(fingerprint, name);
    Ok(())
  }

  /// Fingerprinted name to logical name.
  pub fn invert(&self) -> Result<ReverseManifest, ManifestError> {
    let mut entries = BTreeMap::new();
    for (name, fingerprint) in &self.entries {
      if let Some(existing) = entries.insert(fingerprint.clone(), name.clone()) {
        return Err(ManifestError::Collision {
          fingerprint: fingerprint.clone(),
          name: name.clone(),
          existing,
        });
      }
    }
    Ok(ReverseManifest { entries })
  }

  pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
    Ok(serde_json::to_string_pretty(&self.entries)?)
  }

  pub fn from_json(data: &[u8]) -> Result<Self, ManifestError> {
    let raw: BTreeMap<String, String> = serde_json::from_slice(data)?;
    let mut manifest = Manifest::new();
    for (name, fingerprint) in raw {
      manifest.insert_checked(name, fingerprint)?;
    }
    Ok(manifest)
  }
}

impl<'a> IntoIterator for &'a Manifest {
  type Item = (&'a String, &'a String);
  type IntoIter = btree_map::Iter<'a, String, String>;

  fn into_iter(self) -> Self::IntoIter {
    self.entries.iter()
  }
}

impl Serialize for Manifest {
  fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    self.entries.serialize(serializer)
  }
}

/// Reverse manifest: fingerprinted name to logical name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReverseManifest {
  entries: BTreeMap<String, String>,
}

impl ReverseManifest {
  pub fn get(&self, fingerprint: &str) -> Option<&str> {
    self.entries.get(fingerprint).map(String::as_str)
  }

  pub fn iter(&self) -> btree_map::Iter<'_, String, String> {
    self.entries.iter()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  /// Back to the forward manifest.
  pub fn invert(&self) -> Result<Manifest, ManifestError> {
    let mut manifest = Manifest::new();
    for (fingerprint, name) in &self.entries {
      if let Some(first) = manifest.get(name) {
        return Err(ManifestError::DuplicateName {
          name: name.clone(),
          first: first.to_string(),
          second: fingerprint.clone(),
        });
      }
      manifest.insert_checked(name.clone(), fingerprint.clone())?;
    }
    Ok(manifest)
  }

  pub fn to_json_pretty(&self) -> Result<String, ManifestError> {
    Ok(serde_json::to_string_pretty(&self.entries)?)
  }
}
