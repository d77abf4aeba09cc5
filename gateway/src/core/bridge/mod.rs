//! Call bridge: relays one telephony media stream to the realtime voice
//! service and back.
//!
//! # Lifecycle
//!
//! 1. [`negotiate`] sends the `session.update` for this call. Failure closes
//!    both sockets and ends the call.
//! 2. A writer task is spawned per leg and the session becomes `Active`.
//! 3. [`run_inbound`] and [`run_outbound`] run concurrently until either one
//!    ends, which signals shutdown to the other.
//! 4. Once both relays return, the command channels are dropped, the writers
//!    send close frames and the call is marked `Closed`.
//!
//! ```text
//! telephony ws ──► run_inbound ──► service writer ──► voice service ws
//! telephony ws ◄── telephony writer ◄── run_outbound ◄── voice service ws
//! ```

mod inbound;
mod negotiator;
mod outbound;
mod session;
mod wire;
mod writer;

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::{Sink, SinkExt, Stream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::realtime::{ClientEvent, RealtimeResult, SessionConfig};
use crate::core::telephony::TelephonyOutbound;

pub use inbound::{InboundExit, InboundReport, run_inbound};
pub use negotiator::negotiate;
pub use outbound::{OutboundExit, OutboundReport, run_outbound};
pub use session::{CallSession, CallStatus};
pub use wire::{Incoming, Leg, WireMessage};
pub use writer::spawn_writer;

/// Queue depth of each writer channel.
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// How long writers get to flush and close their sockets after the relays end.
const WRITER_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Outcome of a finished call, logged by the media-stream handler.
#[derive(Debug, Clone)]
pub struct CallSummary {
    pub call_id: Uuid,
    pub stream_sid: Option<String>,
    pub call_sid: Option<String>,
    pub inbound: InboundReport,
    pub outbound: OutboundReport,
    pub duration: Duration,
}

/// Runs one call from negotiation to teardown.
pub struct CallBridge {
    session: Arc<CallSession>,
    session_config: SessionConfig,
}

impl CallBridge {
    pub fn new(session_config: SessionConfig) -> Self {
        Self {
            session: Arc::new(CallSession::new()),
            session_config,
        }
    }

    pub fn session(&self) -> Arc<CallSession> {
        self.session.clone()
    }

    /// Relay the call until either leg ends.
    ///
    /// Returns only after both relays have stopped and both sockets have been
    /// closed (or their writers timed out).
    pub async fn run<TR, TS, TM, TE, SR, SS, SM, SE>(
        self,
        telephony_stream: TR,
        mut telephony_sink: TS,
        service_stream: SR,
        mut service_sink: SS,
    ) -> RealtimeResult<CallSummary>
    where
        TR: Stream<Item = Result<TM, TE>> + Unpin,
        TS: Sink<TM> + Unpin + Send + 'static,
        TS::Error: Display + Send,
        TM: WireMessage,
        TE: Display,
        SR: Stream<Item = Result<SM, SE>> + Unpin,
        SS: Sink<SM> + Unpin + Send + 'static,
        SS::Error: Display + Send,
        SM: WireMessage,
        SE: Display,
    {
        let started = Instant::now();
        let session = self.session;
        let call_id = session.call_id();

        if let Err(e) = negotiate(&mut service_sink, &self.session_config).await {
            warn!(%call_id, "Realtime session negotiation failed: {}", e);
            let _ = service_sink.close().await;
            let _ = telephony_sink.close().await;
            session.mark_closed();
            return Err(e);
        }

        let (telephony_tx, telephony_rx) = mpsc::channel::<TelephonyOutbound>(CHANNEL_BUFFER_SIZE);
        let (service_tx, service_rx) = mpsc::channel::<ClientEvent>(CHANNEL_BUFFER_SIZE);

        let telephony_writer = spawn_writer(Leg::Telephony, call_id, telephony_sink, telephony_rx);
        let service_writer = spawn_writer(Leg::Service, call_id, service_sink, service_rx);

        session.activate();
        info!(%call_id, "Call bridge active");

        // Both relays own their senders; when the join completes every sender
        // is gone and the writers drain and close their sockets.
        let (inbound, outbound) = tokio::join!(
            run_inbound(telephony_stream, service_tx.clone(), session.clone()),
            run_outbound(service_stream, telephony_tx, service_tx, session.clone()),
        );

        await_writer(call_id, Leg::Telephony, telephony_writer).await;
        await_writer(call_id, Leg::Service, service_writer).await;

        session.mark_closed();

        Ok(CallSummary {
            call_id,
            stream_sid: session.stream_id(),
            call_sid: session.call_sid(),
            inbound,
            outbound,
            duration: started.elapsed(),
        })
    }
}

async fn await_writer(call_id: Uuid, leg: Leg, mut handle: JoinHandle<()>) {
    match tokio::time::timeout(WRITER_SHUTDOWN_TIMEOUT, &mut handle).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(%call_id, %leg, "Writer task failed: {}", e),
        Err(_) => {
            warn!(%call_id, %leg, "Writer did not finish in time, aborting");
            handle.abort();
        }
    }
}
