//! Continuation transport.
//!
//! A background process never loops on its own; each execution ends by
//! scheduling a continuation through a [`Dispatcher`]. The in-process
//! transport is a bounded channel drained by the [`ContinuationRunner`],
//! which re-enters the target process in a fresh task. Dropped continuations
//! are not retried here; the health-check schedule picks them up.

use crate::background::models::Continuation;
use crate::background::registry::ProcessRegistry;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("continuation queue is full")]
    QueueFull,
    #[error("continuation channel is closed")]
    ChannelClosed,
}

/// Port through which a process schedules its own continuation. Must not
/// block on the receiving side.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, continuation: Continuation) -> Result<(), DispatchError>;
}

#[derive(Clone)]
pub struct ChannelDispatcher {
    tx: mpsc::Sender<Continuation>,
}

impl ChannelDispatcher {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Continuation>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ChannelDispatcher { tx }, rx)
    }
}

#[async_trait]
impl Dispatcher for ChannelDispatcher {
    async fn dispatch(&self, continuation: Continuation) -> Result<(), DispatchError> {
        self.tx.try_send(continuation).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => DispatchError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DispatchError::ChannelClosed,
        })
    }
}

/// Drains the continuation channel and re-enters the target processes.
///
/// Every continuation runs in its own task so one long drain does not delay
/// triggers for other processes; per-process exclusivity comes from the
/// drain lock, not from the runner.
pub struct ContinuationRunner {
    rx: mpsc::Receiver<Continuation>,
    registry: Arc<ProcessRegistry>,
}

impl ContinuationRunner {
    pub fn new(rx: mpsc::Receiver<Continuation>, registry: Arc<ProcessRegistry>) -> Self {
        ContinuationRunner { rx, registry }
    }

    pub async fn run(mut self, shutdown: CancellationToken) {
        info!("Continuation runner started");
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Continuation runner shutting down");
                    break;
                }
                received = self.rx.recv() => {
                    let Some(continuation) = received else {
                        info!("Continuation channel closed, runner stopping");
                        break;
                    };
                    let registry = self.registry.clone();
                    tokio::spawn(async move {
                        Self::handle(&registry, continuation).await;
                    });
                }
            }
        }
    }

    async fn handle(registry: &ProcessRegistry, continuation: Continuation) {
        let process_id = continuation.process_id.clone();
        let Some(process) = registry.get(&process_id) else {
            warn!("Dropping continuation for unknown process {process_id}");
            return;
        };
        match process
            .maybe_handle(&continuation.token, Some(continuation.chain_id))
            .await
        {
            Ok(outcome) => debug!("Process {process_id} trigger resolved as {outcome:?}"),
            Err(err) => error!("Process {process_id} drain failed: {err:?}"),
        }
    }
}
