//! Voice-service to caller relay, including barge-in handling.

use std::fmt::{self, Display};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use super::session::CallSession;
use super::wire::{Incoming, WireMessage};
use crate::core::realtime::{ClientEvent, ServerEvent};
use crate::core::telephony::TelephonyOutbound;

/// Why the outbound relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboundExit {
    /// The voice-service socket closed or failed.
    ServiceClosed,
    /// The telephony writer is gone.
    TelephonyClosed,
    /// The inbound relay ended the call.
    Shutdown,
}

impl fmt::Display for OutboundExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutboundExit::ServiceClosed => "service_closed",
            OutboundExit::TelephonyClosed => "telephony_closed",
            OutboundExit::Shutdown => "shutdown",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundReport {
    pub exit: OutboundExit,
    /// Audio chunks sent to the caller.
    pub frames_forwarded: u64,
    /// Decoded size of the forwarded audio.
    pub audio_bytes: u64,
    /// Audio chunks dropped because no stream identifier was known yet.
    pub frames_dropped: u64,
    pub interruptions: u64,
    /// Interruptions that landed while a response was still playing.
    pub responses_interrupted: u64,
}

/// Read voice-service events, play synthesized speech to the caller and
/// handle barge-in.
///
/// On `speech_started` a `clear` is queued for the telephony leg before the
/// `response.cancel` is queued for the service. Each leg has one FIFO writer,
/// so that order holds on the wire. Only closure of the service socket or
/// session shutdown ends the loop; a bad event is logged and skipped.
pub async fn run_outbound<R, M, E>(
    mut frames: R,
    telephony_tx: mpsc::Sender<TelephonyOutbound>,
    service_tx: mpsc::Sender<ClientEvent>,
    session: Arc<CallSession>,
) -> OutboundReport
where
    R: Stream<Item = Result<M, E>> + Unpin,
    M: WireMessage,
    E: Display,
{
    let call_id = session.call_id();
    let mut report = OutboundReport {
        exit: OutboundExit::ServiceClosed,
        frames_forwarded: 0,
        audio_bytes: 0,
        frames_dropped: 0,
        interruptions: 0,
        responses_interrupted: 0,
    };

    report.exit = loop {
        let frame = tokio::select! {
            biased;
            _ = session.closed() => break OutboundExit::Shutdown,
            frame = frames.next() => frame,
        };

        let text = match frame {
            Some(Ok(message)) => match message.into_incoming() {
                Incoming::Text(text) => text,
                Incoming::Close => {
                    info!(%call_id, "Voice service closed the connection");
                    break OutboundExit::ServiceClosed;
                }
                Incoming::Other => continue,
            },
            Some(Err(e)) => {
                warn!(%call_id, "Voice service WebSocket error: {}", e);
                break OutboundExit::ServiceClosed;
            }
            None => {
                info!(%call_id, "Voice service stream ended");
                break OutboundExit::ServiceClosed;
            }
        };

        let event = match ServerEvent::parse(&text) {
            Ok(event) => event,
            Err(e) => {
                warn!(%call_id, "Failed to parse voice service event: {}", e);
                continue;
            }
        };

        match event {
            ServerEvent::SpeechStarted { audio_start_ms, .. } => {
                let response_playing = session.response_playing();
                report.interruptions += 1;
                if response_playing {
                    report.responses_interrupted += 1;
                }
                info!(
                    %call_id,
                    audio_start_ms,
                    response_playing,
                    "Caller started speaking, interrupting playback"
                );
                if !interrupt(&session, &telephony_tx, &service_tx).await {
                    break OutboundExit::Shutdown;
                }
            }
            ServerEvent::AudioDelta { delta, .. } => {
                if delta.is_empty() {
                    continue;
                }
                let Some(stream_sid) = session.stream_id() else {
                    debug!(%call_id, "No stream identifier yet, dropping audio delta");
                    report.frames_dropped += 1;
                    continue;
                };
                let decoded_len = match BASE64.decode(delta.as_bytes()) {
                    Ok(bytes) => bytes.len(),
                    Err(e) => {
                        warn!(%call_id, "Dropping audio delta with invalid base64: {}", e);
                        continue;
                    }
                };
                // A stalled caller socket fills the writer queue; shutdown must still win.
                let sent = tokio::select! {
                    biased;
                    _ = session.closed() => break OutboundExit::Shutdown,
                    sent = telephony_tx.send(TelephonyOutbound::media(stream_sid, delta)) => sent,
                };
                if sent.is_err() {
                    debug!(%call_id, "Telephony leg gone, dropping audio");
                    break OutboundExit::TelephonyClosed;
                }
                report.frames_forwarded += 1;
                report.audio_bytes += decoded_len as u64;
            }
            ServerEvent::ResponseCreated { response } => {
                debug!(%call_id, response_id = %response.id, "Response started");
                session.set_response_playing(true);
            }
            ServerEvent::ResponseDone { response } => {
                debug!(
                    %call_id,
                    response_id = %response.id,
                    status = ?response.status,
                    "Response finished"
                );
                session.set_response_playing(false);
            }
            ServerEvent::SessionCreated { session: info } => {
                info!(%call_id, session_id = %info.id, model = ?info.model, "Voice service session created");
            }
            ServerEvent::SessionUpdated { .. } => {
                debug!(%call_id, "Voice service acknowledged session.update");
            }
            ServerEvent::Error { error } => {
                warn!(
                    %call_id,
                    error_type = %error.error_type,
                    code = ?error.code,
                    "Voice service error: {}",
                    error.message
                );
            }
            ServerEvent::AudioTranscriptDone { transcript } => {
                debug!(%call_id, %transcript, "Assistant transcript");
            }
            other => {
                trace!(%call_id, event = other.kind(), "Voice service event");
            }
        }
    };

    session.begin_closing();
    debug!(
        %call_id,
        exit = %report.exit,
        frames_forwarded = report.frames_forwarded,
        interruptions = report.interruptions,
        "Outbound relay finished"
    );

    report
}

/// Barge-in: clear the caller's playback buffer, then cancel the response.
///
/// Both sends are best-effort; a failure is logged and the call continues.
/// Returns false if shutdown was signalled while a send was waiting for
/// queue capacity.
async fn interrupt(
    session: &CallSession,
    telephony_tx: &mpsc::Sender<TelephonyOutbound>,
    service_tx: &mpsc::Sender<ClientEvent>,
) -> bool {
    let call_id = session.call_id();
    let entered = session.begin_interrupt();

    let completed = 'sends: {
        match session.stream_id() {
            Some(stream_sid) => {
                let sent = tokio::select! {
                    biased;
                    _ = session.closed() => break 'sends false,
                    sent = telephony_tx.send(TelephonyOutbound::clear(stream_sid)) => sent,
                };
                if let Err(e) = sent {
                    warn!(%call_id, "Failed to send clear to telephony leg: {}", e);
                }
            }
            None => debug!(%call_id, "No stream identifier yet, skipping clear"),
        }

        let sent = tokio::select! {
            biased;
            _ = session.closed() => break 'sends false,
            sent = service_tx.send(ClientEvent::ResponseCancel) => sent,
        };
        if let Err(e) = sent {
            warn!(%call_id, "Failed to send response.cancel: {}", e);
        }
        true
    };

    session.set_response_playing(false);
    if entered {
        session.end_interrupt();
    }
    completed
}
