//! Client side of the callback bridge.

use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

use crate::consts::SOCKET_ENV;
use crate::ipc::IpcError;
use crate::ipc::protocol::{Request, Response, Value};

/// Socket path handed down by a running build, if any.
pub fn socket_from_env() -> Option<PathBuf> {
  std::env::var_os(SOCKET_ENV).filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Send one raw line and return the raw response line.
pub async fn request_line(socket: &Path, line: &str) -> Result<String, IpcError> {
  let stream = UnixStream::connect(socket).await.map_err(|source| IpcError::Connect {
    path: socket.to_path_buf(),
    source,
  })?;
  let (read, mut write) = stream.into_split();

  write.write_all(line.trim_end().as_bytes()).await?;
  write.write_all(b"\n").await?;
  write.flush().await?;

  let mut reader = BufReader::new(read);
  let mut response = String::new();
  if reader.read_line(&mut response).await? == 0 {
    return Err(IpcError::UnexpectedResponse("connection closed without a response".to_string()));
  }
  Ok(response.trim_end().to_string())
}

pub async fn request(socket: &Path, request: &Request) -> Result<Response, IpcError> {
  let line = serde_json::to_string(request)?;
  let response = request_line(socket, &line).await?;
  Ok(serde_json::from_str(&response)?)
}

/// Invoke a callback; an `{"error": ...}` answer becomes [`IpcError::Remote`].
pub async fn call(socket: &Path, name: &str, args: Vec<Value>) -> Result<Value, IpcError> {
  request(socket, &Request::call(name, args))
    .await?
    .into_result()
    .map_err(IpcError::Remote)
}

pub async fn list_functions(socket: &Path) -> Result<Vec<String>, IpcError> {
  let value = request(socket, &Request::list_functions())
    .await?
    .into_result()
    .map_err(IpcError::Remote)?;

  let items = value
    .as_list()
    .ok_or_else(|| IpcError::UnexpectedResponse(format!("expected a list, got {:?}", value)))?;
  items
    .iter()
    .map(|v| {
      v.as_str()
        .map(str::to_string)
        .ok_or_else(|| IpcError::UnexpectedResponse(format!("expected a name, got {:?}", v)))
    })
    .collect()
}
