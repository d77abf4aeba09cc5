//! Media-stream WebSocket route configuration

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use crate::handlers::media_stream::media_stream_handler;
use crate::handlers::twiml::MEDIA_STREAM_PATH;
use crate::state::AppState;
use std::sync::Arc;

/// Create the media-stream WebSocket router
///
/// # Endpoint
///
/// `GET /media-stream` - WebSocket upgrade for one call's media stream
///
/// # Protocol
///
/// The provider sends JSON text frames tagged by `event`:
/// `connected`, `start` (carries `streamSid`), `media` (base64 audio),
/// `mark`, `dtmf`, `stop`.
///
/// The gateway sends back:
/// - `{"event":"media","streamSid":"...","media":{"payload":"..."}}`
/// - `{"event":"clear","streamSid":"..."}` when the caller interrupts
pub fn create_media_stream_router() -> Router<Arc<AppState>> {
    Router::new()
        .route(MEDIA_STREAM_PATH, get(media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
