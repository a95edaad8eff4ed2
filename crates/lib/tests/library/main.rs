//! Library integration tests for assetpack-lib.

mod build_tests;
mod common;
mod manifest_tests;
