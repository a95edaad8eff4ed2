//! Named callback registry and request dispatch.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::ipc::protocol::{CALL, LIST_FUNCTIONS, Request, Response, Value};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
  #[error("missing name in call")]
  MissingName,

  #[error("missing args in call")]
  MissingArgs,

  #[error("invalid func name: {0}")]
  UnknownFunction(String),

  #[error("{0}")]
  InvalidArgs(String),

  #[error("{0}")]
  Failed(String),
}

impl CallbackError {
  pub fn invalid_args(msg: impl Into<String>) -> Self {
    CallbackError::InvalidArgs(msg.into())
  }

  pub fn failed(msg: impl fmt::Display) -> Self {
    CallbackError::Failed(msg.to_string())
  }
}

pub type Callback = Arc<dyn Fn(&[Value]) -> Result<Value, CallbackError> + Send + Sync>;

/// Callbacks reachable from child processes, by name.
#[derive(Clone, Default)]
pub struct Callbacks {
  entries: BTreeMap<String, Callback>,
}

impl fmt::Debug for Callbacks {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_set().entries(self.entries.keys()).finish()
  }
}

impl Callbacks {
  pub fn new() -> Self {
    Self::default()
  }

  /// Register `f` under `name`, replacing any earlier registration.
  pub fn register<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
  where
    F: Fn(&[Value]) -> Result<Value, CallbackError> + Send + Sync + 'static,
  {
    self.entries.insert(name.into(), Arc::new(f));
    self
  }

  /// Merge another registry into this one.
  pub fn extend(&mut self, other: Callbacks) -> &mut Self {
    self.entries.extend(other.entries);
    self
  }

  /// Registered names, sorted.
  pub fn names(&self) -> Vec<String> {
    self.entries.keys().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, CallbackError> {
    let f = self
      .entries
      .get(name)
      .ok_or_else(|| CallbackError::UnknownFunction(name.to_string()))?;
    f(args)
  }

  /// Answer one request.
  pub fn handle(&self, request: &Request) -> Response {
    debug!(kind = %request.kind, "handling ipc request");
    match request.kind.as_str() {
      LIST_FUNCTIONS => Response::Result(Value::from(self.names())),
      CALL => match self.dispatch_call(&request.params) {
        Ok(v) => Response::Result(v),
        Err(e) => Response::Error(e.to_string()),
      },
      _ => Response::Error("unknown request type".to_string()),
    }
  }

  fn dispatch_call(&self, params: &BTreeMap<String, Value>) -> Result<Value, CallbackError> {
    let name = params.get("name").and_then(Value::as_str).ok_or(CallbackError::MissingName)?;
    let args = params.get("args").and_then(Value::as_list).ok_or(CallbackError::MissingArgs)?;
    debug!(name, args = args.len(), "dispatching callback");
    self.call(name, args)
  }
}
