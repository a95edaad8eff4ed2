//! Unix socket listener for the callback bridge.
//!
//! The socket lives in a fresh temporary directory, removed on shutdown.
//! Each connection is served on its own task. The accept loop stops on
//! [`IpcHandle::shutdown`] or when the process receives SIGINT or SIGTERM.
//! A connection accepted before that is still read and answered; a client
//! that sends nothing is dropped after [`REQUEST_READ_TIMEOUT`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::consts::{REQUEST_READ_TIMEOUT, SOCKET_DIR_PREFIX, SOCKET_FILE_NAME};
use crate::ipc::IpcError;
use crate::ipc::callbacks::Callbacks;
use crate::ipc::protocol::{Request, Response};

/// Lifecycle of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
  Created,
  Running,
  ShuttingDown,
  Stopped,
}

/// A bridge that has a socket path but is not yet listening.
#[derive(Debug)]
pub struct IpcServer {
  dir: TempDir,
  socket: PathBuf,
  callbacks: Arc<Callbacks>,
}

impl IpcServer {
  pub fn new(callbacks: Callbacks) -> Result<Self, IpcError> {
    let dir = tempfile::Builder::new()
      .prefix(SOCKET_DIR_PREFIX)
      .tempdir()
      .map_err(IpcError::TempDir)?;
    let socket = dir.path().join(SOCKET_FILE_NAME);
    debug!(socket = %socket.display(), "created ipc socket directory");
    Ok(Self {
      dir,
      socket,
      callbacks: Arc::new(callbacks),
    })
  }

  pub fn socket_path(&self) -> &Path {
    &self.socket
  }

  pub fn state(&self) -> ServerState {
    ServerState::Created
  }

  /// Bind the socket and spawn the accept loop.
  ///
  /// Must be called from within a tokio runtime.
  pub fn start(self) -> Result<IpcHandle, IpcError> {
    let listener = UnixListener::bind(&self.socket).map_err(|source| IpcError::Bind {
      path: self.socket.clone(),
      source,
    })?;
    info!(socket = %self.socket.display(), "ipc bridge listening");

    let token = CancellationToken::new();
    let (state_tx, state_rx) = watch::channel(ServerState::Running);
    let state_tx = Arc::new(state_tx);

    let task = tokio::spawn(accept_loop(
      listener,
      Arc::clone(&self.callbacks),
      token.clone(),
      Arc::clone(&state_tx),
    ));

    Ok(IpcHandle {
      dir: Some(self.dir),
      socket: self.socket,
      token,
      state_tx,
      state_rx,
      task: Some(task),
    })
  }
}

/// A running bridge.
#[derive(Debug)]
pub struct IpcHandle {
  dir: Option<TempDir>,
  socket: PathBuf,
  token: CancellationToken,
  state_tx: Arc<watch::Sender<ServerState>>,
  state_rx: watch::Receiver<ServerState>,
  task: Option<JoinHandle<()>>,
}

impl IpcHandle {
  pub fn socket_path(&self) -> &Path {
    &self.socket
  }

  pub fn state(&self) -> ServerState {
    *self.state_rx.borrow()
  }

  /// Fires when the bridge stops accepting, whether from shutdown or a signal.
  pub fn cancellation_token(&self) -> CancellationToken {
    self.token.clone()
  }

  pub fn is_cancelled(&self) -> bool {
    self.token.is_cancelled()
  }

  /// Stop accepting, wait for in-flight requests, remove the socket directory.
  pub async fn shutdown(mut self) -> Result<(), IpcError> {
    self.state_tx.send_replace(ServerState::ShuttingDown);
    self.token.cancel();

    if let Some(task) = self.task.take()
      && let Err(e) = task.await
    {
      warn!(error = %e, "ipc accept loop failed");
    }

    if let Some(dir) = self.dir.take() {
      dir.close().map_err(IpcError::TempDir)?;
    }
    self.state_tx.send_replace(ServerState::Stopped);
    info!("ipc bridge stopped");
    Ok(())
  }
}

impl Drop for IpcHandle {
  fn drop(&mut self) {
    self.token.cancel();
  }
}

fn listen(kind: SignalKind, name: &'static str) -> Option<Signal> {
  match signal(kind) {
    Ok(sig) => Some(sig),
    Err(e) => {
      warn!(signal = name, error = %e, "could not listen for signal");
      None
    }
  }
}

async fn next_signal(sig: &mut Option<Signal>) {
  match sig {
    Some(sig) => {
      sig.recv().await;
    }
    None => std::future::pending().await,
  }
}

async fn accept_loop(
  listener: UnixListener,
  callbacks: Arc<Callbacks>,
  token: CancellationToken,
  state: Arc<watch::Sender<ServerState>>,
) {
  let mut connections = JoinSet::new();
  let mut sigint = listen(SignalKind::interrupt(), "interrupt");
  let mut sigterm = listen(SignalKind::terminate(), "terminate");

  loop {
    tokio::select! {
      _ = token.cancelled() => break,
      _ = next_signal(&mut sigint) => {
        info!(signal = "interrupt", "caught signal");
        token.cancel();
        break;
      }
      _ = next_signal(&mut sigterm) => {
        info!(signal = "terminate", "caught signal");
        token.cancel();
        break;
      }
      accepted = listener.accept() => match accepted {
        Ok((stream, _)) => {
          connections.spawn(serve_connection(stream, Arc::clone(&callbacks)));
        }
        Err(e) => {
          error!(error = %e, "ipc accept failed");
          token.cancel();
          break;
        }
      },
      Some(done) = connections.join_next(), if !connections.is_empty() => {
        if let Err(e) = done {
          warn!(error = %e, "ipc connection task failed");
        }
      }
    }
  }

  state.send_replace(ServerState::ShuttingDown);
  drop(listener);

  while let Some(done) = connections.join_next().await {
    if let Err(e) = done {
      warn!(error = %e, "ipc connection task failed");
    }
  }
}

async fn serve_connection(stream: UnixStream, callbacks: Arc<Callbacks>) {
  if let Err(e) = respond(stream, &callbacks).await {
    warn!(error = %e, "ipc connection error");
  }
}

async fn respond(stream: UnixStream, callbacks: &Callbacks) -> Result<(), IpcError> {
  let (read, mut write) = stream.into_split();
  let mut reader = BufReader::new(read);
  let mut line = String::new();

  let n = tokio::time::timeout(REQUEST_READ_TIMEOUT, reader.read_line(&mut line))
    .await
    .map_err(|_| IpcError::ReadTimeout(REQUEST_READ_TIMEOUT))??;
  if n == 0 {
    debug!("ipc client closed without a request");
    return Ok(());
  }

  let response = match serde_json::from_str::<Request>(line.trim()) {
    Ok(request) => callbacks.handle(&request),
    Err(e) => {
      warn!(error = %e, "could not decode ipc request");
      Response::Error(format!("invalid request: {}", e))
    }
  };

  let mut out = serde_json::to_vec(&response)?;
  out.push(b'\n');
  write.write_all(&out).await?;
  write.shutdown().await?;
  Ok(())
}
