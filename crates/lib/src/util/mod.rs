//! Shared utilities.
//!
//! Hashing, source discovery and test helpers.

pub mod hash;
pub mod walk;

#[cfg(test)]
pub mod testutil;
