//! Caller to voice-service relay.

use std::fmt::{self, Display};
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::session::CallSession;
use super::wire::{Incoming, WireMessage};
use crate::core::realtime::ClientEvent;
use crate::core::telephony::TelephonyInbound;

/// Why the inbound relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundExit {
    /// The provider sent `stop`.
    Stopped,
    /// The telephony socket closed or failed.
    CallerDisconnected,
    /// The voice-service writer is gone.
    ServiceClosed,
    /// The outbound relay ended the call.
    Shutdown,
}

impl fmt::Display for InboundExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InboundExit::Stopped => "stopped",
            InboundExit::CallerDisconnected => "caller_disconnected",
            InboundExit::ServiceClosed => "service_closed",
            InboundExit::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundReport {
    pub exit: InboundExit,
    pub frames_forwarded: u64,
}

/// Read telephony frames and forward caller audio to the voice service.
///
/// `media` payloads are forwarded verbatim even before `start` has been seen.
/// Unrecognised or malformed frames are logged and skipped. Every exit path
/// signals session shutdown so the outbound relay ends too.
pub async fn run_inbound<R, M, E>(
    mut frames: R,
    service_tx: mpsc::Sender<ClientEvent>,
    session: Arc<CallSession>,
) -> InboundReport
where
    R: Stream<Item = Result<M, E>> + Unpin,
    M: WireMessage,
    E: Display,
{
    let call_id = session.call_id();
    let mut frames_forwarded: u64 = 0;

    let exit = loop {
        let frame = tokio::select! {
            biased;
            _ = session.closed() => break InboundExit::Shutdown,
            frame = frames.next() => frame,
        };

        let text = match frame {
            Some(Ok(message)) => match message.into_incoming() {
                Incoming::Text(text) => text,
                Incoming::Close => {
                    info!(%call_id, "Telephony socket closed by provider");
                    break InboundExit::CallerDisconnected;
                }
                Incoming::Other => continue,
            },
            Some(Err(e)) => {
                warn!(%call_id, "Telephony WebSocket error: {}", e);
                break InboundExit::CallerDisconnected;
            }
            None => {
                info!(%call_id, "Telephony socket ended");
                break InboundExit::CallerDisconnected;
            }
        };

        let event = match TelephonyInbound::parse(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!(%call_id, "Failed to parse telephony frame: {}", e);
                continue;
            }
        };

        match event {
            TelephonyInbound::Media { media } => {
                if service_tx.is_closed() {
                    debug!(%call_id, "Voice service gone, dropping caller audio");
                    break InboundExit::ServiceClosed;
                }
                let sent = tokio::select! {
                    biased;
                    _ = session.closed() => break InboundExit::Shutdown,
                    sent = service_tx.send(ClientEvent::audio_append(media.payload)) => sent,
                };
                if sent.is_err() {
                    debug!(%call_id, "Voice service gone, dropping caller audio");
                    break InboundExit::ServiceClosed;
                }
                frames_forwarded += 1;
            }
            TelephonyInbound::Start { start } => {
                if let Some(call_sid) = start.call_sid {
                    session.set_call_sid(call_sid);
                }
                session.set_stream_id(start.stream_sid);
            }
            TelephonyInbound::Stop => {
                info!(%call_id, "Telephony stream stopped");
                break InboundExit::Stopped;
            }
            TelephonyInbound::Connected { protocol } => {
                debug!(%call_id, ?protocol, "Telephony stream connected");
            }
            TelephonyInbound::Mark { mark } => {
                debug!(%call_id, mark = ?mark.map(|m| m.name), "Playback mark");
            }
            TelephonyInbound::Dtmf { dtmf } => {
                debug!(%call_id, digit = ?dtmf.map(|d| d.digit), "DTMF received");
            }
            TelephonyInbound::Unknown => {
                debug!(%call_id, "Ignoring unrecognised telephony event");
            }
        }
    };

    session.begin_closing();
    debug!(%call_id, %exit, frames_forwarded, "Inbound relay finished");

    InboundReport {
        exit,
        frames_forwarded,
    }
}
