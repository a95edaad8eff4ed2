//! CLI integration tests driving full builds through the binary.

mod build_tests;
mod call_tests;
mod common;
