//! WebSocket mock of the realtime voice service.
//!
//! Accepts connections, records every client event and the handshake
//! headers, acknowledges `session.update`, and replays a scripted list of
//! server events when the first audio append arrives.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};

/// What the mock does once the first `input_audio_buffer.append` arrives.
#[derive(Debug, Clone)]
pub enum OnFirstAppend {
    /// Send these events, then keep the connection open.
    Reply(Vec<Value>),
    /// Close the connection.
    Close,
}

#[derive(Debug)]
pub struct MockRealtimeState {
    on_first_append: OnFirstAppend,
    received: Mutex<Vec<Value>>,
    authorization: Mutex<Vec<String>>,
    beta_headers: Mutex<Vec<String>>,
    pub connections: AtomicUsize,
    pub closed_connections: AtomicUsize,
}

impl MockRealtimeState {
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().clone()
    }

    /// `type` of every client event received, in order.
    pub fn received_types(&self) -> Vec<String> {
        self.received
            .lock()
            .iter()
            .filter_map(|v| v["type"].as_str().map(str::to_string))
            .collect()
    }

    pub fn authorization(&self) -> Vec<String> {
        self.authorization.lock().clone()
    }

    pub fn beta_headers(&self) -> Vec<String> {
        self.beta_headers.lock().clone()
    }

    /// Poll until `predicate` holds for the received events or `timeout` passes.
    pub async fn wait_for<F>(&self, timeout: Duration, predicate: F) -> bool
    where
        F: Fn(&[Value]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if predicate(&self.received.lock()) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn wait_for_closed(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.closed_connections.load(Ordering::SeqCst) < count {
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }
}

pub struct MockRealtimeServer {
    /// Base URL to configure as the realtime endpoint
    pub url: String,
    pub state: Arc<MockRealtimeState>,
    handle: JoinHandle<()>,
}

impl MockRealtimeServer {
    pub async fn start(on_first_append: OnFirstAppend) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock realtime server");
        let addr = listener.local_addr().unwrap();

        let state = Arc::new(MockRealtimeState {
            on_first_append,
            received: Mutex::new(Vec::new()),
            authorization: Mutex::new(Vec::new()),
            beta_headers: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            closed_connections: AtomicUsize::new(0),
        });

        let accept_state = state.clone();
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let state = accept_state.clone();
                tokio::spawn(async move {
                    handle_connection(stream, state.clone()).await;
                    state.closed_connections.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        Self {
            url: format!("ws://{addr}/v1/realtime"),
            state,
            handle,
        }
    }
}

impl Drop for MockRealtimeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn handle_connection(stream: TcpStream, state: Arc<MockRealtimeState>) {
    let header_state = state.clone();
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let header = |name: &str| {
            req.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };
        header_state.authorization.lock().push(header("authorization"));
        header_state.beta_headers.lock().push(header("openai-beta"));
        Ok(resp)
    };

    let Ok(ws) = accept_hdr_async(stream, callback).await else {
        return;
    };
    state.connections.fetch_add(1, Ordering::SeqCst);
    let (mut write, mut read) = ws.split();

    let created = json!({
        "type": "session.created",
        "session": {"id": "sess_mock", "model": "gpt-4o-realtime-preview-2024-10-01"}
    });
    if write.send(Message::Text(created.to_string().into())).await.is_err() {
        return;
    }

    let mut appended = false;
    while let Some(Ok(message)) = read.next().await {
        let text = match message {
            Message::Text(text) => text.as_str().to_owned(),
            Message::Close(_) => break,
            _ => continue,
        };
        let Ok(event) = serde_json::from_str::<Value>(&text) else {
            continue;
        };
        let kind = event["type"].as_str().unwrap_or_default().to_string();
        state.received.lock().push(event);

        match kind.as_str() {
            "session.update" => {
                let updated = json!({"type": "session.updated", "session": {"id": "sess_mock"}});
                if write.send(Message::Text(updated.to_string().into())).await.is_err() {
                    return;
                }
            }
            "input_audio_buffer.append" if !appended => {
                appended = true;
                match &state.on_first_append {
                    OnFirstAppend::Reply(events) => {
                        for event in events {
                            if write
                                .send(Message::Text(event.to_string().into()))
                                .await
                                .is_err()
                            {
                                return;
                            }
                        }
                    }
                    OnFirstAppend::Close => {
                        let _ = write.send(Message::Close(None)).await;
                        return;
                    }
                }
            }
            _ => {}
        }
    }
}
