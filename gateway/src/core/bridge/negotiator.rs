//! One-shot session configuration for the voice-service leg.

use std::fmt::Display;

use futures::{Sink, SinkExt};
use tracing::debug;

use super::wire::WireMessage;
use crate::core::realtime::{ClientEvent, RealtimeError, RealtimeResult, SessionConfig};

/// Send exactly one `session.update` before any audio is relayed.
///
/// The service acknowledges with `session.updated` at some later point; that
/// acknowledgement is advisory and is not awaited here.
pub async fn negotiate<M, S>(sink: &mut S, config: &SessionConfig) -> RealtimeResult<()>
where
    M: WireMessage,
    S: Sink<M> + Unpin,
    S::Error: Display,
{
    let event = ClientEvent::SessionUpdate {
        session: config.clone(),
    };
    let json = serde_json::to_string(&event)?;
    debug!(event = event.kind(), bytes = json.len(), "Negotiating realtime session");

    sink.send(M::text(json))
        .await
        .map_err(|e| RealtimeError::NegotiationFailed(e.to_string()))
}
