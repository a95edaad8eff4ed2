//! Bounded worker pool with fail-fast cancellation.
//!
//! Items are queued on a bounded channel that is filled and closed up front.
//! A fixed set of worker tasks pull from it until the queue drains or the
//! shared token is cancelled. The first error cancels the token and is what
//! the caller gets back; work already in flight runs to completion, nothing
//! new is started.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::execute::types::PoolError;

/// Run `f` over every item with at most `workers` items in flight.
///
/// Results are returned in completion order. On failure the first error is
/// returned and the remaining queued items are never started.
pub async fn run_pool<T, R, E, F, Fut>(items: Vec<T>, workers: usize, f: F) -> Result<Vec<R>, E>
where
  T: Send + 'static,
  R: Send + 'static,
  E: From<PoolError> + Send + 'static,
  F: Fn(T) -> Fut + Send + Sync + 'static,
  Fut: Future<Output = Result<R, E>> + Send + 'static,
{
  if workers < 1 {
    return Err(PoolError::InvalidWorkerCount(workers).into());
  }
  if items.is_empty() {
    return Ok(Vec::new());
  }

  let count = workers.min(items.len());
  debug!(items = items.len(), workers = count, "starting worker pool");

  let (tx, rx) = mpsc::channel(items.len());
  for item in items {
    // capacity equals item count and the receiver is alive, so this cannot fail
    if tx.try_send(item).is_err() {
      return Err(PoolError::WorkerFailed("work queue rejected an item".to_string()).into());
    }
  }
  drop(tx);

  let rx = Arc::new(Mutex::new(rx));
  let token = CancellationToken::new();
  let first_error: Arc<std::sync::Mutex<Option<E>>> = Arc::new(std::sync::Mutex::new(None));
  let f = Arc::new(f);

  let mut set = JoinSet::new();
  for worker in 0..count {
    let rx = Arc::clone(&rx);
    let token = token.clone();
    let first_error = Arc::clone(&first_error);
    let f = Arc::clone(&f);

    set.spawn(async move {
      let mut results = Vec::new();
      loop {
        let next = {
          let mut rx = rx.lock().await;
          tokio::select! {
            biased;
            _ = token.cancelled() => None,
            item = rx.recv() => item,
          }
        };
        let Some(item) = next else { break };
        if token.is_cancelled() {
          break;
        }

        match f(item).await {
          Ok(result) => results.push(result),
          Err(e) => {
            debug!(worker, "work item failed, cancelling pool");
            if let Ok(mut slot) = first_error.lock()
              && slot.is_none()
            {
              *slot = Some(e);
            }
            token.cancel();
            break;
          }
        }
      }
      results
    });
  }

  let mut results = Vec::new();
  let mut join_failure = None;
  while let Some(joined) = set.join_next().await {
    match joined {
      Ok(mut batch) => results.append(&mut batch),
      Err(e) => {
        warn!(error = %e, "worker task failed");
        token.cancel();
        join_failure.get_or_insert(e.to_string());
      }
    }
  }

  let first = first_error.lock().ok().and_then(|mut slot| slot.take());
  if let Some(e) = first {
    return Err(e);
  }
  if let Some(message) = join_failure {
    return Err(PoolError::WorkerFailed(message).into());
  }

  Ok(results)
}
