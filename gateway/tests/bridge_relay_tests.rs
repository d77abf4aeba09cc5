//! Call bridge tests over in-memory channels.
//!
//! Both legs are driven through `futures` unbounded channels carrying the
//! same message types the real sockets produce, so the bridge runs exactly as
//! it does in the media-stream handler.

use std::time::Duration;

use axum::extract::ws::Message as TelephonyMessage;
use futures::channel::mpsc::{UnboundedReceiver, UnboundedSender, unbounded};
use futures::{StreamExt, future, sink};
use serde_json::{Value, json};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message as ServiceMessage;

use callbridge_gateway::core::bridge::{InboundExit, OutboundExit};
use callbridge_gateway::{CallBridge, CallStatus, CallSummary, RealtimeResult, SessionConfig};

const WAIT: Duration = Duration::from_secs(5);

type TelephonyIn = UnboundedSender<Result<TelephonyMessage, axum::Error>>;
type ServiceIn = UnboundedSender<Result<ServiceMessage, tokio_tungstenite::tungstenite::Error>>;

/// Test side of both legs plus the running bridge.
struct Call {
    /// Frames the "caller" sends to the bridge
    telephony_in: TelephonyIn,
    /// Frames the bridge writes back to the caller
    telephony_out: UnboundedReceiver<TelephonyMessage>,
    /// Events the "voice service" sends to the bridge
    service_in: ServiceIn,
    /// Events the bridge writes to the voice service
    service_out: UnboundedReceiver<ServiceMessage>,
    handle: JoinHandle<RealtimeResult<CallSummary>>,
}

fn start_call() -> Call {
    let (telephony_in, telephony_stream) = unbounded();
    let (telephony_sink, telephony_out) = unbounded::<TelephonyMessage>();
    let (service_in, service_stream) = unbounded();
    let (service_sink, service_out) = unbounded::<ServiceMessage>();

    let bridge = CallBridge::new(SessionConfig::default());
    let handle = tokio::spawn(bridge.run(
        telephony_stream,
        telephony_sink,
        service_stream,
        service_sink,
    ));

    Call {
        telephony_in,
        telephony_out,
        service_in,
        service_out,
        handle,
    }
}

fn send_telephony(call: &Call, event: Value) {
    call.telephony_in
        .unbounded_send(Ok(TelephonyMessage::Text(event.to_string().into())))
        .unwrap();
}

fn send_service(call: &Call, event: Value) {
    call.service_in
        .unbounded_send(Ok(ServiceMessage::Text(event.to_string().into())))
        .unwrap();
}

fn start_event(stream_sid: &str) -> Value {
    json!({
        "event": "start",
        "sequenceNumber": "1",
        "start": {
            "streamSid": stream_sid,
            "callSid": "CA123",
            "accountSid": "AC456",
            "tracks": ["inbound"],
            "mediaFormat": {"encoding": "audio/x-mulaw", "sampleRate": 8000, "channels": 1}
        },
        "streamSid": stream_sid
    })
}

fn media_event(payload: &str) -> Value {
    json!({
        "event": "media",
        "media": {"track": "inbound", "chunk": "1", "timestamp": "5", "payload": payload}
    })
}

async fn next_service_event(call: &mut Call) -> Option<Value> {
    loop {
        match timeout(WAIT, call.service_out.next()).await.ok()?? {
            ServiceMessage::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            _ => continue,
        }
    }
}

async fn next_telephony_event(call: &mut Call) -> Option<Value> {
    loop {
        match timeout(WAIT, call.telephony_out.next()).await.ok()?? {
            TelephonyMessage::Text(text) => return serde_json::from_str(text.as_str()).ok(),
            _ => continue,
        }
    }
}

/// Collect remaining text frames until the writer closes the channel.
async fn drain_telephony(call: &mut Call) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(Some(message)) = timeout(WAIT, call.telephony_out.next()).await {
        if let TelephonyMessage::Text(text) = message {
            frames.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    frames
}

async fn drain_service(call: &mut Call) -> Vec<Value> {
    let mut frames = Vec::new();
    while let Ok(Some(message)) = timeout(WAIT, call.service_out.next()).await {
        if let ServiceMessage::Text(text) = message {
            frames.push(serde_json::from_str(text.as_str()).unwrap());
        }
    }
    frames
}

async fn finish(call: Call) -> CallSummary {
    timeout(WAIT, call.handle)
        .await
        .expect("bridge did not finish")
        .expect("bridge task panicked")
        .expect("bridge returned an error")
}

#[tokio::test]
async fn test_barge_in_clears_caller_and_cancels_response() {
    let mut call = start_call();

    let update = next_service_event(&mut call).await.unwrap();
    assert_eq!(update["type"], "session.update");

    send_telephony(&call, start_event("SID1"));
    send_telephony(&call, media_event("AAAA"));

    let append = next_service_event(&mut call).await.unwrap();
    assert_eq!(append["type"], "input_audio_buffer.append");
    assert_eq!(append["audio"], "AAAA");

    send_service(&call, json!({"type": "input_audio_buffer.speech_started", "audio_start_ms": 120}));
    send_service(
        &call,
        json!({"type": "response.audio.delta", "response_id": "r1", "delta": "BBBB"}),
    );

    let clear = next_telephony_event(&mut call).await.unwrap();
    assert_eq!(clear, json!({"event": "clear", "streamSid": "SID1"}));

    let media = next_telephony_event(&mut call).await.unwrap();
    assert_eq!(
        media,
        json!({"event": "media", "streamSid": "SID1", "media": {"payload": "BBBB"}})
    );

    let cancel = next_service_event(&mut call).await.unwrap();
    assert_eq!(cancel, json!({"type": "response.cancel"}));

    send_telephony(&call, json!({"event": "stop", "streamSid": "SID1"}));

    assert!(drain_telephony(&mut call).await.is_empty());
    assert!(drain_service(&mut call).await.is_empty());

    let summary = finish(call).await;
    assert_eq!(summary.stream_sid.as_deref(), Some("SID1"));
    assert_eq!(summary.call_sid.as_deref(), Some("CA123"));
    assert_eq!(summary.inbound.exit, InboundExit::Stopped);
    assert_eq!(summary.inbound.frames_forwarded, 1);
    assert_eq!(summary.outbound.frames_forwarded, 1);
    assert_eq!(summary.outbound.audio_bytes, 3);
    assert_eq!(summary.outbound.interruptions, 1);
}

#[tokio::test]
async fn test_caller_disconnect_closes_both_legs() {
    let mut call = start_call();
    let update = next_service_event(&mut call).await.unwrap();
    assert!(update["session"].is_object());

    send_telephony(&call, start_event("SID2"));
    call.telephony_in.close_channel();

    // Both writers close their sinks, which ends the receivers
    drain_telephony(&mut call).await;
    drain_service(&mut call).await;
    assert!(call.telephony_out.next().await.is_none());
    assert!(call.service_out.next().await.is_none());

    let summary = finish(call).await;
    assert_eq!(summary.inbound.exit, InboundExit::CallerDisconnected);
    assert_eq!(summary.outbound.exit, OutboundExit::Shutdown);
}

#[tokio::test]
async fn test_service_disconnect_ends_call() {
    let mut call = start_call();
    next_service_event(&mut call).await.unwrap();

    send_telephony(&call, start_event("SID3"));
    send_service(&call, json!({"type": "session.updated", "session": {"id": "sess_1"}}));
    call.service_in
        .unbounded_send(Ok(ServiceMessage::Close(None)))
        .unwrap();

    drain_telephony(&mut call).await;
    assert!(call.telephony_out.next().await.is_none());

    let summary = finish(call).await;
    assert_eq!(summary.outbound.exit, OutboundExit::ServiceClosed);
    assert_eq!(summary.inbound.exit, InboundExit::Shutdown);
}

#[tokio::test]
async fn test_negotiation_failure_closes_telephony_leg() {
    let (_telephony_in, telephony_stream) =
        unbounded::<Result<TelephonyMessage, axum::Error>>();
    let (telephony_sink, mut telephony_out) = unbounded::<TelephonyMessage>();
    let (_service_in, service_stream) =
        unbounded::<Result<ServiceMessage, tokio_tungstenite::tungstenite::Error>>();
    let (service_sink, service_out) = unbounded::<ServiceMessage>();
    drop(service_out);

    let bridge = CallBridge::new(SessionConfig::default());
    let session = bridge.session();
    let result = timeout(
        WAIT,
        bridge.run(telephony_stream, telephony_sink, service_stream, service_sink),
    )
    .await
    .expect("bridge did not finish");

    assert!(result.is_err());
    assert_eq!(session.status(), CallStatus::Closed);
    assert!(telephony_out.next().await.is_none());
}

#[tokio::test]
async fn test_caller_audio_payloads_forwarded_verbatim_in_order() {
    let mut call = start_call();
    next_service_event(&mut call).await.unwrap();

    let payloads = ["f/9+fX1+", "AAAA", "/////w==", "gICAgA=="];
    send_telephony(&call, start_event("SID4"));
    for payload in payloads {
        send_telephony(&call, media_event(payload));
    }

    for payload in payloads {
        let append = next_service_event(&mut call).await.unwrap();
        assert_eq!(append, json!({"type": "input_audio_buffer.append", "audio": payload}));
    }

    send_telephony(&call, json!({"event": "stop"}));
    let summary = finish(call).await;
    assert_eq!(summary.inbound.frames_forwarded, payloads.len() as u64);
}

#[tokio::test]
async fn test_audio_before_stream_start_is_dropped() {
    let mut call = start_call();
    next_service_event(&mut call).await.unwrap();

    send_service(
        &call,
        json!({"type": "response.audio.delta", "response_id": "r1", "delta": "BBBB"}),
    );
    send_service(&call, json!({"type": "response.audio.delta", "response_id": "r1", "delta": "CCCC"}));
    call.service_in
        .unbounded_send(Ok(ServiceMessage::Close(None)))
        .unwrap();

    assert!(drain_telephony(&mut call).await.is_empty());

    let summary = finish(call).await;
    assert_eq!(summary.outbound.frames_forwarded, 0);
    assert_eq!(summary.outbound.frames_dropped, 2);
}

#[tokio::test]
async fn test_malformed_service_frames_do_not_stop_relay() {
    let mut call = start_call();
    next_service_event(&mut call).await.unwrap();

    send_telephony(&call, start_event("SID5"));
    send_telephony(&call, media_event("AAAA"));
    // Once the append is seen the stream id is known
    next_service_event(&mut call).await.unwrap();

    call.service_in
        .unbounded_send(Ok(ServiceMessage::Text("not json".into())))
        .unwrap();
    call.service_in
        .unbounded_send(Ok(ServiceMessage::Binary(vec![1, 2, 3].into())))
        .unwrap();
    send_service(&call, json!({"type": "rate_limits.updated", "rate_limits": []}));
    send_service(
        &call,
        json!({"type": "response.audio.delta", "response_id": "r1", "delta": "BBBB"}),
    );

    let media = next_telephony_event(&mut call).await.unwrap();
    assert_eq!(media["media"]["payload"], "BBBB");
    assert_eq!(media["streamSid"], "SID5");

    send_telephony(&call, json!({"event": "stop"}));
    let summary = finish(call).await;
    assert_eq!(summary.outbound.frames_forwarded, 1);
    assert_eq!(summary.outbound.interruptions, 0);
}

#[tokio::test]
async fn test_stop_ends_call_when_caller_socket_stalls() {
    let (telephony_in, telephony_stream) = unbounded::<Result<TelephonyMessage, axum::Error>>();
    // A caller socket that accepts no frames: every send stays pending
    let telephony_sink = sink::unfold((), |(), _frame: TelephonyMessage| {
        future::pending::<Result<(), axum::Error>>()
    });
    let (service_in, service_stream) =
        unbounded::<Result<ServiceMessage, tokio_tungstenite::tungstenite::Error>>();
    let (service_sink, mut service_out) = unbounded::<ServiceMessage>();

    let bridge = CallBridge::new(SessionConfig::default());
    let session = bridge.session();
    let handle = tokio::spawn(bridge.run(
        telephony_stream,
        Box::pin(telephony_sink),
        service_stream,
        service_sink,
    ));

    let send_caller = |event: Value| {
        telephony_in
            .unbounded_send(Ok(TelephonyMessage::Text(event.to_string().into())))
            .unwrap()
    };

    send_caller(start_event("SID1"));
    let deadline = tokio::time::Instant::now() + WAIT;
    while session.stream_id().is_none() {
        assert!(tokio::time::Instant::now() < deadline, "start was never processed");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    // More audio than the telephony writer queue can hold
    let delta = json!({"type": "response.audio.delta", "response_id": "r1", "delta": "BBBB"});
    for _ in 0..1100 {
        service_in
            .unbounded_send(Ok(ServiceMessage::Text(delta.to_string().into())))
            .unwrap();
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    send_caller(json!({"event": "stop", "streamSid": "SID1"}));

    // The stalled writer is aborted after its shutdown timeout
    let summary = timeout(Duration::from_secs(10), handle)
        .await
        .expect("bridge did not finish after stop")
        .expect("bridge task panicked")
        .expect("bridge returned an error");

    assert_eq!(summary.inbound.exit, InboundExit::Stopped);
    assert_eq!(summary.outbound.exit, OutboundExit::Shutdown);
    assert!(summary.outbound.frames_forwarded < 1100);
    assert_eq!(session.status(), CallStatus::Closed);

    // The voice-service leg was closed even though the caller leg never drained
    let mut service_frames = 0;
    while let Ok(Some(_)) = timeout(WAIT, service_out.next()).await {
        service_frames += 1;
    }
    assert_eq!(service_frames, 1);
}
