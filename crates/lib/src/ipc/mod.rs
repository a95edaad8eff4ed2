//! Callback bridge between the build and the tools it spawns.
//!
//! A build step starts an [`IpcServer`] and hands the socket path to child
//! processes through the `ASSETPACK_SOCK` environment variable. Children send
//! line-delimited JSON requests to list or invoke named [`Callbacks`], most
//! usefully to resolve asset references against the in-progress manifest.

pub mod assets;
pub mod callbacks;
pub mod client;
pub mod protocol;
pub mod server;

use std::path::PathBuf;

use thiserror::Error;

pub use assets::asset_callbacks;
pub use callbacks::{Callback, CallbackError, Callbacks};
pub use protocol::{Request, Response, Value};
pub use server::{IpcHandle, IpcServer, ServerState};

#[derive(Debug, Error)]
pub enum IpcError {
  #[error("failed to create socket directory: {0}")]
  TempDir(#[source] std::io::Error),

  #[error("failed to bind {}: {source}", path.display())]
  Bind {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to connect to {}: {source}", path.display())]
  Connect {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("ipc i/o error: {0}")]
  Io(#[from] std::io::Error),

  #[error("ipc json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("{0}")]
  Remote(String),

  #[error("unexpected response: {0}")]
  UnexpectedResponse(String),

  #[error("no request received within {0:?}")]
  ReadTimeout(std::time::Duration),
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::pack::Packer;
  use std::sync::Arc;

  fn double_callbacks() -> Callbacks {
    let mut callbacks = Callbacks::new();
    callbacks.register("double", |args| {
      let x = args
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| CallbackError::invalid_args("double expects an integer"))?;
      Ok(Value::Int(x * 2))
    });
    callbacks
  }

  #[tokio::test]
  async fn lifecycle_and_cleanup() {
    let server = IpcServer::new(double_callbacks()).unwrap();
    assert_eq!(server.state(), ServerState::Created);
    let dir = server.socket_path().parent().unwrap().to_path_buf();
    assert!(
      dir
        .file_name()
        .unwrap()
        .to_string_lossy()
        .starts_with("assetpack-ipc-callback")
    );
    assert!(server.socket_path().ends_with("control.sock"));

    let handle = server.start().unwrap();
    assert_eq!(handle.state(), ServerState::Running);
    assert!(handle.socket_path().exists());

    handle.shutdown().await.unwrap();
    assert!(!dir.exists());
  }

  #[tokio::test]
  async fn double_round_trip() {
    let handle = IpcServer::new(double_callbacks()).unwrap().start().unwrap();
    let line = client::request_line(
      handle.socket_path(),
      r#"{"type":"call","params":{"name":"double","args":[21]}}"#,
    )
    .await
    .unwrap();
    assert_eq!(line, r#"{"result":42}"#);
    handle.shutdown().await.unwrap();
  }

  #[tokio::test]
  async fn list_functions_returns_registered_names() {
    let packer = Arc::new(Packer::in_memory());
    let mut callbacks = asset_callbacks(packer, "/_/");
    callbacks.extend(double_callbacks());

    let handle = IpcServer::new(callbacks).unwrap().start().unwrap();
    let names = client::list_functions(handle.socket_path()).await.unwrap();
    assert_eq!(names, vec!["asset", "asset_path", "double"]);
    handle.shutdown().await.unwrap();
  }

  #[tokio::test]
  async fn asset_call_returns_fingerprint() {
    let packer = Arc::new(Packer::in_memory());
    packer.pack("/foo.css", b"a{}").unwrap();
    let fp = packer.manifest().unwrap().get("/foo.css").unwrap().to_string();

    let handle = IpcServer::new(asset_callbacks(Arc::clone(&packer), "/_/"))
      .unwrap()
      .start()
      .unwrap();
    let out = client::call(handle.socket_path(), "asset", vec![Value::from("/foo.css")])
      .await
      .unwrap();
    assert!(out.as_str().unwrap().contains(&fp));

    // entries packed while the bridge runs are visible to later requests
    packer.pack("/late.css", b"b{}").unwrap();
    let out = client::call(handle.socket_path(), "asset_path", vec![Value::from("/late.css")])
      .await
      .unwrap();
    assert!(out.as_str().unwrap().starts_with("/_/"));

    handle.shutdown().await.unwrap();
  }

  #[tokio::test]
  async fn errors_are_responses_not_dropped_connections() {
    let handle = IpcServer::new(double_callbacks()).unwrap().start().unwrap();
    let socket = handle.socket_path().to_path_buf();

    let err = client::call(&socket, "missing", vec![]).await.unwrap_err();
    assert!(matches!(err, IpcError::Remote(ref msg) if msg.contains("missing")));

    let line = client::request_line(&socket, "{not json").await.unwrap();
    assert!(line.starts_with(r#"{"error":"invalid request: "#));

    let line = client::request_line(&socket, r#"{"type":"reboot"}"#).await.unwrap();
    assert_eq!(line, r#"{"error":"unknown request type"}"#);

    // still serving after bad requests
    let out = client::call(&socket, "double", vec![Value::Int(5)]).await.unwrap();
    assert_eq!(out, Value::Int(10));

    handle.shutdown().await.unwrap();
  }

  #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
  async fn serves_concurrent_clients() {
    let handle = IpcServer::new(double_callbacks()).unwrap().start().unwrap();
    let socket = handle.socket_path().to_path_buf();

    let mut set = tokio::task::JoinSet::new();
    for i in 0..32i64 {
      let socket = socket.clone();
      set.spawn(async move { client::call(&socket, "double", vec![Value::Int(i)]).await });
    }
    let mut total = 0;
    while let Some(res) = set.join_next().await {
      total += res.unwrap().unwrap().as_i64().unwrap();
    }
    assert_eq!(total, (0..32).sum::<i64>() * 2);

    handle.shutdown().await.unwrap();
  }

  #[tokio::test]
  async fn accepted_request_is_answered_during_shutdown() {
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
    use tokio::net::UnixStream;

    let handle = IpcServer::new(double_callbacks()).unwrap().start().unwrap();
    let stream = UnixStream::connect(handle.socket_path()).await.unwrap();
    let (read, mut write) = stream.into_split();
    write.write_all(br#"{"type":"call","#).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let shutdown = tokio::spawn(handle.shutdown());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!shutdown.is_finished());

    write
      .write_all(b"\"params\":{\"name\":\"double\",\"args\":[21]}}\n")
      .await
      .unwrap();
    let mut line = String::new();
    BufReader::new(read).read_line(&mut line).await.unwrap();
    assert_eq!(line.trim_end(), r#"{"result":42}"#);

    shutdown.await.unwrap().unwrap();
  }

  #[tokio::test]
  async fn connect_after_shutdown_fails() {
    let handle = IpcServer::new(double_callbacks()).unwrap().start().unwrap();
    let socket = handle.socket_path().to_path_buf();
    handle.shutdown().await.unwrap();

    let err = client::list_functions(&socket).await.unwrap_err();
    assert!(matches!(err, IpcError::Connect { .. }));
  }
}
