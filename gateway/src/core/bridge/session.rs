//! Per-call shared state.
//!
//! One [`CallSession`] exists per telephony connection. Both relays hold it
//! through an `Arc`; the inbound relay writes the stream identifier, either
//! relay may start shutdown, and the bridge marks the call closed once both
//! relays and writers have finished.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Lifecycle of one call.
///
/// `Negotiating -> Active -> (Interrupting <-> Active) -> Closing -> Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallStatus {
    Negotiating,
    Active,
    Interrupting,
    Closing,
    Closed,
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallStatus::Negotiating => "negotiating",
            CallStatus::Active => "active",
            CallStatus::Interrupting => "interrupting",
            CallStatus::Closing => "closing",
            CallStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// State shared by the two relays of a single call.
#[derive(Debug)]
pub struct CallSession {
    call_id: Uuid,
    stream_sid: RwLock<Option<String>>,
    call_sid: RwLock<Option<String>>,
    status: Mutex<CallStatus>,
    response_playing: AtomicBool,
    shutdown: CancellationToken,
}

impl Default for CallSession {
    fn default() -> Self {
        Self::new()
    }
}

impl CallSession {
    pub fn new() -> Self {
        Self {
            call_id: Uuid::new_v4(),
            stream_sid: RwLock::new(None),
            call_sid: RwLock::new(None),
            status: Mutex::new(CallStatus::Negotiating),
            response_playing: AtomicBool::new(false),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn call_id(&self) -> Uuid {
        self.call_id
    }

    /// Record the telephony stream identifier.
    ///
    /// The first identifier observed is kept for the rest of the call. A later
    /// `start` carrying a different identifier is logged and ignored.
    pub fn set_stream_id(&self, id: impl Into<String>) {
        let id = id.into();
        let mut guard = self.stream_sid.write();
        match guard.as_deref() {
            None => {
                info!(call_id = %self.call_id, stream_sid = %id, "Media stream started");
                *guard = Some(id);
            }
            Some(existing) if existing == id => {}
            Some(existing) => {
                warn!(
                    call_id = %self.call_id,
                    stream_sid = %existing,
                    ignored = %id,
                    "Ignoring second stream identifier for call"
                );
            }
        }
    }

    pub fn stream_id(&self) -> Option<String> {
        self.stream_sid.read().clone()
    }

    pub fn set_call_sid(&self, sid: impl Into<String>) {
        *self.call_sid.write() = Some(sid.into());
    }

    pub fn call_sid(&self) -> Option<String> {
        self.call_sid.read().clone()
    }

    pub fn status(&self) -> CallStatus {
        *self.status.lock()
    }

    /// Negotiation finished; steady-state traffic may flow.
    pub fn activate(&self) {
        let mut status = self.status.lock();
        if *status == CallStatus::Negotiating {
            *status = CallStatus::Active;
        }
    }

    /// Enter `Interrupting`. Returns false if the call is not active.
    pub fn begin_interrupt(&self) -> bool {
        let mut status = self.status.lock();
        if *status == CallStatus::Active {
            *status = CallStatus::Interrupting;
            true
        } else {
            false
        }
    }

    pub fn end_interrupt(&self) {
        let mut status = self.status.lock();
        if *status == CallStatus::Interrupting {
            *status = CallStatus::Active;
        }
    }

    pub fn set_response_playing(&self, playing: bool) {
        self.response_playing.store(playing, Ordering::Release);
    }

    pub fn response_playing(&self) -> bool {
        self.response_playing.load(Ordering::Acquire)
    }

    /// Signal that one leg has ended. Wakes the sibling relay.
    pub fn begin_closing(&self) {
        {
            let mut status = self.status.lock();
            if *status != CallStatus::Closed && *status != CallStatus::Closing {
                debug!(call_id = %self.call_id, from = %*status, "Call closing");
                *status = CallStatus::Closing;
            }
        }
        self.shutdown.cancel();
    }

    /// Mark the call fully closed. Idempotent.
    pub fn mark_closed(&self) {
        *self.status.lock() = CallStatus::Closed;
        self.shutdown.cancel();
    }

    pub fn is_closing(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Resolves once shutdown has been signalled by either relay.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await
    }
}
