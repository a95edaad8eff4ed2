//! Lua step script.
//!
//! The step script (`assets/assets.lua` by default) declares the build's
//! steps through the `assets` global. Evaluation only records declarations;
//! see [`crate::eval`] for turning a script into steps.
//!
//! # Submodules
//!
//! - [`globals`] - The `assets` global table
//! - [`runtime`] - Lua VM setup and file loading

pub mod globals;
pub mod runtime;
