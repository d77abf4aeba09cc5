use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::config::ServerConfig;
use crate::core::realtime::{OpenAIRealtime, RealtimeResult};

/// Application state shared by all handlers.
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    /// Voice-service connector, built once from `config`
    pub realtime: OpenAIRealtime,
    active_calls: AtomicUsize,
}

impl AppState {
    pub fn new(config: ServerConfig) -> RealtimeResult<Arc<Self>> {
        let realtime = OpenAIRealtime::new(config.realtime_config())?;
        Ok(Arc::new(Self {
            config,
            realtime,
            active_calls: AtomicUsize::new(0),
        }))
    }

    /// Count a call as active until the returned guard is dropped.
    pub fn track_call(self: &Arc<Self>) -> CallGuard {
        self.active_calls.fetch_add(1, Ordering::Relaxed);
        CallGuard {
            state: Arc::clone(self),
        }
    }

    pub fn active_calls(&self) -> usize {
        self.active_calls.load(Ordering::Relaxed)
    }
}

/// Decrements the active call count on drop.
#[derive(Debug)]
pub struct CallGuard {
    state: Arc<AppState>,
}

impl Drop for CallGuard {
    fn drop(&mut self) {
        self.state.active_calls.fetch_sub(1, Ordering::Relaxed);
    }
}
