//! Wire types for the callback bridge.
//!
//! One request per connection, one JSON object per line:
//!
//! ```text
//! {"type":"list-functions"}                                   -> {"result":["asset", ...]}
//! {"type":"call","params":{"name":"asset","args":["/a.css"]}} -> {"result":"url('/_/...')"}
//! ```
//!
//! Failures are answered with `{"error":"..."}`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const LIST_FUNCTIONS: &str = "list-functions";
pub const CALL: &str = "call";

/// A loosely typed value crossing the bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  String(String),
  List(Vec<Value>),
  Map(BTreeMap<String, Value>),
}

impl Value {
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn as_bool(&self) -> Option<bool> {
    match self {
      Value::Bool(b) => Some(*b),
      _ => None,
    }
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Int(i) => Some(*i),
      Value::Float(f) if f.fract() == 0.0 && f.is_finite() => Some(*f as i64),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Int(i) => Some(*i as f64),
      Value::Float(f) => Some(*f),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::String(s) => Some(s),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(items) => Some(items),
      _ => None,
    }
  }

  pub fn as_map(&self) -> Option<&BTreeMap<String, Value>> {
    match self {
      Value::Map(map) => Some(map),
      _ => None,
    }
  }

  /// Parse a command-line argument: JSON when it parses, else a plain string.
  pub fn from_arg(arg: &str) -> Value {
    serde_json::from_str(arg).unwrap_or_else(|_| Value::String(arg.to_string()))
  }
}

impl From<bool> for Value {
  fn from(b: bool) -> Self {
    Value::Bool(b)
  }
}

impl From<i64> for Value {
  fn from(i: i64) -> Self {
    Value::Int(i)
  }
}

impl From<i32> for Value {
  fn from(i: i32) -> Self {
    Value::Int(i64::from(i))
  }
}

impl From<f64> for Value {
  fn from(f: f64) -> Self {
    Value::Float(f)
  }
}

impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::String(s.to_string())
  }
}

impl From<String> for Value {
  fn from(s: String) -> Self {
    Value::String(s)
  }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
  fn from(items: Vec<T>) -> Self {
    Value::List(items.into_iter().map(Into::into).collect())
  }
}

impl From<BTreeMap<String, Value>> for Value {
  fn from(map: BTreeMap<String, Value>) -> Self {
    Value::Map(map)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self {
    v.map_or(Value::Null, Into::into)
  }
}

/// Request envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
  #[serde(rename = "type")]
  pub kind: String,
  #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
  pub params: BTreeMap<String, Value>,
}

impl Request {
  pub fn list_functions() -> Self {
    Self {
      kind: LIST_FUNCTIONS.to_string(),
      params: BTreeMap::new(),
    }
  }

  pub fn call(name: impl Into<String>, args: Vec<Value>) -> Self {
    let mut params = BTreeMap::new();
    params.insert("name".to_string(), Value::String(name.into()));
    params.insert("args".to_string(), Value::List(args));
    Self {
      kind: CALL.to_string(),
      params,
    }
  }
}

/// Response envelope: `{"result": ...}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
  Result(Value),
  Error(String),
}

impl Response {
  pub fn into_result(self) -> Result<Value, String> {
    match self {
      Response::Result(v) => Ok(v),
      Response::Error(e) => Err(e),
    }
  }
}
