//! Per-leg sender task.
//!
//! Each socket sink is owned by exactly one task fed through an mpsc channel,
//! so frames sent by one handler reach the wire in the order they were queued.

use std::fmt::Display;

use futures::{Sink, SinkExt};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, trace, warn};
use uuid::Uuid;

use super::wire::{Leg, WireMessage};

/// Spawn the task that serializes queued messages onto `sink`.
///
/// The task ends when every sender has been dropped or a send fails. It then
/// closes the sink, which sends a close frame to the peer.
pub fn spawn_writer<T, M, S>(
    leg: Leg,
    call_id: Uuid,
    mut sink: S,
    mut rx: mpsc::Receiver<T>,
) -> JoinHandle<()>
where
    T: Serialize + Send + 'static,
    M: WireMessage,
    S: Sink<M> + Unpin + Send + 'static,
    S::Error: Display + Send,
{
    tokio::spawn(async move {
        let mut sent: u64 = 0;

        while let Some(message) = rx.recv().await {
            let json = match serde_json::to_string(&message) {
                Ok(json) => json,
                Err(e) => {
                    error!(%call_id, %leg, "Failed to serialize outgoing message: {}", e);
                    continue;
                }
            };
            trace!(%call_id, %leg, bytes = json.len(), "Sending frame");

            if let Err(e) = sink.send(M::text(json)).await {
                warn!(%call_id, %leg, "Failed to send WebSocket message: {}", e);
                break;
            }
            sent += 1;
        }

        // Senders still holding a handle observe the closed channel from here on.
        drop(rx);

        if let Err(e) = sink.close().await {
            debug!(%call_id, %leg, "Error closing socket: {}", e);
        }
        debug!(%call_id, %leg, sent, "Writer finished");
    })
}
