//! Message passing between the foreground and the command executor.
//!
//! Each message travels with its own `oneshot` reply sender, and the
//! dispatcher runs every message as an independent task. Replies are
//! correlated by channel, never by completion order.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{JoinHandle, JoinSet};
use vidcache_core::Error;

use super::{Command, CommandExecutor, Reply};

/// A message and the channel its single reply goes to.
#[derive(Debug)]
pub struct Envelope {
    pub message: Value,
    pub reply: oneshot::Sender<Reply>,
}

/// Sending half of the command channel.
#[derive(Clone, Debug)]
pub struct CommandChannel {
    sender: mpsc::Sender<Envelope>,
}

/// Handle to the running dispatcher.
#[derive(Debug)]
pub struct Dispatcher {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Dispatcher {
    /// Stop accepting messages, then wait until every accepted message has
    /// been replied to.
    pub async fn stop(self) {
        if self.stop.send(()).is_err() {
            tracing::debug!("command dispatcher already finished");
        }
        if let Err(e) = self.handle.await {
            tracing::warn!(error = %e, "command dispatcher failed");
        }
    }
}

async fn run(executor: Arc<CommandExecutor>, envelope: Envelope) {
    let outcome = executor.handle(envelope.message).await;
    if envelope.reply.send(outcome).is_err() {
        tracing::debug!("requester went away before the reply");
    }
}

impl CommandChannel {
    /// Start a dispatcher for `executor`.
    ///
    /// The dispatcher runs until it is stopped or every `CommandChannel`
    /// clone is dropped. Dropping the `Dispatcher` stops it without waiting.
    pub fn spawn(executor: Arc<CommandExecutor>, buffer: usize) -> (Self, Dispatcher) {
        let (sender, mut receiver) = mpsc::channel::<Envelope>(buffer.max(1));
        let (stop, mut stopped) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let mut in_flight = JoinSet::new();
            loop {
                tokio::select! {
                    envelope = receiver.recv() => match envelope {
                        Some(envelope) => {
                            while in_flight.try_join_next().is_some() {}
                            in_flight.spawn(run(executor.clone(), envelope));
                        }
                        None => break,
                    },
                    _ = &mut stopped => {
                        receiver.close();
                        while let Some(envelope) = receiver.recv().await {
                            in_flight.spawn(run(executor.clone(), envelope));
                        }
                        break;
                    }
                }
            }
            tracing::debug!(in_flight = in_flight.len(), "command channel closed, draining");
            while let Some(joined) = in_flight.join_next().await {
                if let Err(e) = joined {
                    tracing::warn!(error = %e, "command task failed");
                }
            }
        });

        (Self { sender }, Dispatcher { stop, handle })
    }

    /// Post a raw wire message and wait for its reply.
    pub async fn post(&self, message: Value) -> Result<Reply, Error> {
        let (reply, receiver) = oneshot::channel();
        self.sender
            .send(Envelope { message, reply })
            .await
            .map_err(|_| Error::ChannelClosed)?;
        receiver.await.map_err(|_| Error::ChannelClosed)
    }

    /// Post a typed command.
    pub async fn send(&self, command: Command) -> Result<Reply, Error> {
        let message = serde_json::to_value(&command)?;
        self.post(message).await
    }
}
