pub mod bridge;
pub mod realtime;
pub mod telephony;

// Re-export commonly used types for convenience
pub use bridge::{CallBridge, CallSession, CallStatus, CallSummary};

pub use realtime::{
    OpenAIRealtime, RealtimeConfig, RealtimeError, RealtimeResult, RealtimeSocket, SessionConfig,
};

pub use telephony::{TelephonyInbound, TelephonyOutbound};
