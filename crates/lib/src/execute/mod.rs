//! Tool execution and per-file parallelism.
//!
//! This module provides the pieces build steps use to do their work:
//! - [`Tool`] runs an external program as an opaque subprocess
//! - [`run_pool`] fans items out across a bounded set of workers, fail-fast
//! - [`IncrementalCache`] skips items whose source has not changed

pub mod cache;
pub mod cmd;
pub mod pool;
pub mod types;

pub use cache::{CacheEntry, IncrementalCache};
pub use cmd::{Tool, ToolSpec, format_command};
pub use pool::run_pool;
pub use types::{ExecuteError, PoolError, default_workers};
