//! assetpack-lib: content-addressed static asset builds
//!
//! This crate provides the pieces of an asset build:
//! - `Packer`: write-once store of logical names to bytes
//! - `Manifest`: logical name to fingerprinted name mapping
//! - `run_pool`: bounded worker pool with fail-fast cancellation
//! - `IpcServer`: local socket bridge letting child tools query the build
//! - `Pipeline`: ordered build steps declared by a Lua step script

pub mod config;
pub mod consts;
pub mod eval;
pub mod execute;
pub mod init;
pub mod ipc;
pub mod lua;
pub mod manifest;
pub mod pack;
pub mod pipeline;
pub mod step;
pub mod util;
