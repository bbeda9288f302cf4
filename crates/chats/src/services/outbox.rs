//! Outbound event queue drained by a single publisher task.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::channel::EventChannel;
use crate::entities::RoomId;
use crate::types::RoomEvent;

enum Command {
    Publish(RoomEvent),
    Flush(oneshot::Sender<()>),
}

/// Cloneable handle for queueing events onto a room channel.
///
/// Events are published one at a time in queue order, so outbound order
/// within a kind equals call order. Queueing never blocks.
#[derive(Clone)]
pub struct Outbox {
    tx: mpsc::UnboundedSender<Command>,
}

impl Outbox {
    /// Spawn the publisher task for `room`.
    ///
    /// `on_error` receives the text of every failed publish.
    pub fn spawn<F>(
        channel: Arc<dyn EventChannel>,
        room: RoomId,
        on_error: F,
    ) -> (Self, JoinHandle<()>)
    where
        F: Fn(String) + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Publish(event) => {
                        let kind = event.kind();
                        if let Err(error) = channel.publish(&room, event).await {
                            warn!(room = %room, %kind, %error, "failed to publish event");
                            on_error(error.to_string());
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                        break;
                    }
                }
            }
            debug!(room = %room, "publisher stopped");
        });

        (Self { tx }, handle)
    }

    /// Queue an event, returning `false` once the publisher has stopped
    pub fn publish(&self, event: RoomEvent) -> bool {
        self.tx.send(Command::Publish(event)).is_ok()
    }

    /// Publish everything queued so far, then stop the publisher
    pub async fn flush_and_stop(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Command::Flush(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
    }
}
