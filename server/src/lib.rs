//! HTTP/WebSocket surface for the incremental TTS pipeline.
//!
//! Three wire formats over one delivery core:
//! - `POST /tts/stream` — raw PCM bytes, format in response headers
//! - `POST /tts/sse` — `data:`-framed events with base64 audio chunks
//! - `GET /ws/tts` — full duplex: JSON text fragments in, binary audio out

pub mod config;
pub mod engine;
pub mod error;
pub mod validation;

use std::convert::Infallible;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

use stream_core::{
    parse_inbound, AudioChunkPacer, DeliverySession, EventStreamTransport, RawStreamTransport,
    SocketFrame, SocketTransport, TextFragment, VoiceRegistry,
};

use crate::error::ApiError;
use crate::validation::validate_stream_request;

/// Per-session channel capacity, in frames. Bounded so a stalled
/// client pushes back on the pacer instead of queueing audio.
const TRANSPORT_CHANNEL_CAPACITY: usize = 32;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<VoiceRegistry>,
    pub default_voice: String,
    pub pacer: AudioChunkPacer,
    pub request_count: Arc<AtomicU64>,
}

impl AppState {
    pub fn new(registry: Arc<VoiceRegistry>, pacer: AudioChunkPacer) -> anyhow::Result<Self> {
        let ids = registry.voice_ids();
        let default_voice = if ids.iter().any(|v| v == "english") {
            "english".to_string()
        } else {
            ids.first()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("voice registry is empty"))?
        };

        Ok(Self {
            registry,
            default_voice,
            pacer,
            request_count: Arc::new(AtomicU64::new(0)),
        })
    }
}

/// All routes, mounted both at the root and under `/api`.
pub fn build_router(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/voices", get(list_voices))
        .route("/tts/stream", post(stream_tts))
        .route("/tts/sse", post(sse_tts))
        .route("/ws/tts", get(ws_tts));

    // Metrics endpoint - consider adding authentication in production
    let metrics_api = Router::new().route("/metrics", get(metrics_endpoint));

    let api = Router::new().merge(public_api).merge(metrics_api);

    Router::new()
        .merge(api.clone()) // root paths
        .nest("/api", api) // /api prefix
        .with_state(state)
}

pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_voices(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.voice_ids())
}

#[derive(Deserialize)]
pub struct StreamTtsRequest {
    text: String,
    voice: Option<String>,
}

/// Raw PCM streaming: unframed little-endian samples, format metadata
/// announced once in response headers before the first byte.
pub async fn stream_tts(
    State(state): State<AppState>,
    Json(req): Json<StreamTtsRequest>,
) -> Result<Response, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    validate_stream_request(&req.text, req.voice.as_deref())?;

    let voice = req.voice.unwrap_or_else(|| state.default_voice.clone());
    // Request-response style: fail fast before any byte is streamed.
    let engine = state
        .registry
        .resolve(&voice)
        .ok_or_else(|| ApiError::UnknownVoice(voice.clone()))?;
    let format = engine.output_format();

    let (transport, rx) = RawStreamTransport::channel(TRANSPORT_CHANNEL_CAPACITY);
    let mut session =
        DeliverySession::new(state.registry.clone(), voice, transport).with_pacer(state.pacer);

    tokio::spawn(async move {
        if let Err(e) = session.ingest(TextFragment::last(req.text)).await {
            debug!(error = %e, "raw stream session ended early");
        }
    });

    let body = Body::from_stream(
        ReceiverStream::new(rx).map(|chunk| Ok::<_, Infallible>(Bytes::from(chunk))),
    );

    Response::builder()
        .header(header::CONTENT_TYPE, "audio/pcm")
        .header("x-sample-rate", format.sample_rate.to_string())
        .header("x-channels", format.channels.to_string())
        .header("x-sample-width", (format.sample_width_bits / 8).to_string())
        .body(body)
        .map_err(|e| ApiError::InternalError(e.to_string()))
}

/// Event-framed streaming: every payload is a `data: <json>` line;
/// errors after the stream starts arrive in-band as `error` events.
pub async fn sse_tts(
    State(state): State<AppState>,
    Json(req): Json<StreamTtsRequest>,
) -> Result<Response, ApiError> {
    state.request_count.fetch_add(1, Ordering::Relaxed);
    validate_stream_request(&req.text, req.voice.as_deref())?;

    let voice = req.voice.unwrap_or_else(|| state.default_voice.clone());

    let (transport, rx) = EventStreamTransport::channel(TRANSPORT_CHANNEL_CAPACITY);
    let mut session =
        DeliverySession::new(state.registry.clone(), voice, transport).with_pacer(state.pacer);

    tokio::spawn(async move {
        if let Err(e) = session.ingest(TextFragment::last(req.text)).await {
            debug!(error = %e, "event stream session ended early");
        }
    });

    let body = Body::from_stream(
        ReceiverStream::new(rx).map(|frame| Ok::<_, Infallible>(Bytes::from(frame))),
    );

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .map_err(|e| ApiError::InternalError(e.to_string()))
}

/// Full duplex loop: client streams `{ text, language?, is_final? }`
/// JSON messages (typically relayed from an LLM token stream), server
/// streams binary PCM frames back, closing after the final flush.
pub async fn ws_tts(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| run_socket_session(socket, state))
}

async fn run_socket_session(socket: WebSocket, state: AppState) {
    state.request_count.fetch_add(1, Ordering::Relaxed);

    let (mut outbound, mut inbound) = socket.split();
    let (transport, mut frames) = SocketTransport::channel(TRANSPORT_CHANNEL_CAPACITY);
    let mut session =
        DeliverySession::new(state.registry.clone(), state.default_voice.clone(), transport)
            .with_pacer(state.pacer);

    // Pump transport frames onto the socket. Awaiting the socket send
    // is what propagates client backpressure into the bounded channel.
    let pump = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            match frame {
                SocketFrame::Audio(bytes) => {
                    if outbound.send(Message::Binary(bytes.into())).await.is_err() {
                        break;
                    }
                }
                SocketFrame::Close { code, reason } => {
                    let _ = outbound
                        .send(Message::Close(Some(CloseFrame {
                            code,
                            reason: reason.into(),
                        })))
                        .await;
                    break;
                }
            }
        }
    });

    while let Some(msg) = inbound.next().await {
        let msg = match msg {
            Ok(msg) => msg,
            Err(_) => {
                session.disconnect();
                break;
            }
        };

        match msg {
            Message::Text(raw) => {
                let event = match parse_inbound(&raw) {
                    Ok(event) => event,
                    Err(e) => {
                        // Single bad event; the session continues.
                        debug!(error = %e, "ignoring malformed inbound event");
                        continue;
                    }
                };

                if let Some(language) = event.language {
                    session.set_voice(language);
                }

                let fragment = TextFragment {
                    content: event.text,
                    is_final: event.is_final,
                };
                if let Err(e) = session.ingest(fragment).await {
                    debug!(error = %e, "socket session ended with error");
                    break;
                }
                if session.state().is_terminal() {
                    break;
                }
            }
            Message::Close(_) => {
                session.disconnect();
                break;
            }
            _ => {}
        }
    }

    // Dropping the session drops the transport sender, ending the pump.
    drop(session);
    let _ = pump.await;
}

#[derive(Serialize)]
pub struct MetricsResponse {
    pub cpu_usage_percent: f32,
    pub memory_used_mb: u64,
    pub memory_total_mb: u64,
    pub memory_usage_percent: f32,
    pub request_count: u64,
    pub uptime_seconds: u64,
}

pub static START_TIME: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_cpu();
    system.refresh_memory();

    let cpu_usage = system.global_cpu_info().cpu_usage();
    let memory_used = system.used_memory();
    let memory_total = system.total_memory();
    let memory_usage_percent = if memory_total > 0 {
        (memory_used as f64 / memory_total as f64 * 100.0) as f32
    } else {
        0.0
    };

    let uptime = START_TIME
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0);

    Json(MetricsResponse {
        cpu_usage_percent: cpu_usage,
        memory_used_mb: memory_used / 1024 / 1024,
        memory_total_mb: memory_total / 1024 / 1024,
        memory_usage_percent,
        request_count: state.request_count.load(Ordering::Relaxed),
        uptime_seconds: uptime,
    })
}
