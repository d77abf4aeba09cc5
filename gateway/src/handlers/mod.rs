pub mod api;
pub mod media_stream;
pub mod twiml;
