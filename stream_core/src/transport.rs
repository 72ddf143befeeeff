//! Transport adapters.
//!
//! One delivery contract, three wire framings: unframed PCM bytes,
//! `data:`-prefixed event lines, and bidirectional socket messages.
//! Each adapter feeds a bounded channel; the awaited send is how
//! backpressure from the wire reaches the pacer. A closed channel
//! means the peer is gone and surfaces as `TransportWrite`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::engine::AudioFormat;
use crate::error::StreamError;

/// Out-of-band signals a transport may (or may not) be able to frame.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    /// Audio format announcement, sent once before the first audio byte.
    Config(AudioFormat),
    /// Graceful end of the session's audio.
    Done,
    /// Unrecoverable failure; no further audio follows.
    Error(String),
}

/// Delivery half of a session: audio windows plus control events, in
/// order, with backpressure surfaced by blocking the calling flow.
#[async_trait]
pub trait TransportAdapter: Send {
    async fn write_audio(&mut self, window: &[u8]) -> Result<(), StreamError>;

    async fn write_control(&mut self, event: ControlEvent) -> Result<(), StreamError>;

    async fn close(&mut self) -> Result<(), StreamError>;
}

fn send_failed() -> StreamError {
    StreamError::TransportWrite("channel closed by receiver".into())
}

// ---------------------------------------------------------------------------
// Raw byte stream
// ---------------------------------------------------------------------------

/// Unframed little-endian PCM bytes. Control events are not
/// representable in-band; format metadata travels once in response
/// headers before the first byte, so Config/Done/Error are no-ops here.
pub struct RawStreamTransport {
    tx: Option<mpsc::Sender<Vec<u8>>>,
}

impl RawStreamTransport {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    fn sender(&self) -> Result<&mpsc::Sender<Vec<u8>>, StreamError> {
        self.tx.as_ref().ok_or_else(send_failed)
    }
}

#[async_trait]
impl TransportAdapter for RawStreamTransport {
    async fn write_audio(&mut self, window: &[u8]) -> Result<(), StreamError> {
        self.sender()?
            .send(window.to_vec())
            .await
            .map_err(|_| send_failed())
    }

    async fn write_control(&mut self, _event: ControlEvent) -> Result<(), StreamError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        // Dropping the sender ends the body stream.
        self.tx.take();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Event-framed stream (server-sent events)
// ---------------------------------------------------------------------------

/// Wire shape of one event-framed payload.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum EventFrame<'a> {
    Config {
        sample_rate: u32,
        channels: u16,
        sample_width: u16,
    },
    Audio {
        chunk: String,
        index: u64,
    },
    Done,
    Error {
        message: &'a str,
    },
}

/// Every payload wrapped in a self-describing `data: <json>` line.
/// Audio windows are base64-encoded and carry a monotonically
/// increasing index starting at 0, reset per request.
pub struct EventStreamTransport {
    tx: Option<mpsc::Sender<String>>,
    next_index: u64,
}

impl EventStreamTransport {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Some(tx),
                next_index: 0,
            },
            rx,
        )
    }

    async fn send_frame(&mut self, frame: EventFrame<'_>) -> Result<(), StreamError> {
        let json = serde_json::to_string(&frame)
            .map_err(|e| StreamError::TransportWrite(format!("frame encode: {e}")))?;
        let tx = self.tx.as_ref().ok_or_else(send_failed)?;
        tx.send(format!("data: {json}\n\n"))
            .await
            .map_err(|_| send_failed())
    }
}

#[async_trait]
impl TransportAdapter for EventStreamTransport {
    async fn write_audio(&mut self, window: &[u8]) -> Result<(), StreamError> {
        let index = self.next_index;
        self.next_index += 1;
        self.send_frame(EventFrame::Audio {
            chunk: BASE64.encode(window),
            index,
        })
        .await
    }

    async fn write_control(&mut self, event: ControlEvent) -> Result<(), StreamError> {
        let frame = match &event {
            ControlEvent::Config(format) => EventFrame::Config {
                sample_rate: format.sample_rate,
                channels: format.channels,
                sample_width: format.sample_width_bits / 8,
            },
            ControlEvent::Done => EventFrame::Done,
            ControlEvent::Error(message) => EventFrame::Error { message },
        };
        self.send_frame(frame).await
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        self.tx.take();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bidirectional socket
// ---------------------------------------------------------------------------

/// Outbound messages for the socket pump the server runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketFrame {
    /// Binary audio frame.
    Audio(Vec<u8>),
    /// Close the socket with the given code and reason.
    Close { code: u16, reason: String },
}

/// Normal closure per RFC 6455.
pub const CLOSE_NORMAL: u16 = 1000;
/// Server-side unrecoverable error.
pub const CLOSE_INTERNAL_ERROR: u16 = 1011;

/// Audio goes out as binary frames; inbound text fragments arrive on
/// the same channel (see [`InboundTextEvent`]) and are routed back into
/// the session by the caller's read loop.
pub struct SocketTransport {
    tx: Option<mpsc::Sender<SocketFrame>>,
}

impl SocketTransport {
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<SocketFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx: Some(tx) }, rx)
    }

    async fn send(&self, frame: SocketFrame) -> Result<(), StreamError> {
        let tx = self.tx.as_ref().ok_or_else(send_failed)?;
        tx.send(frame).await.map_err(|_| send_failed())
    }
}

#[async_trait]
impl TransportAdapter for SocketTransport {
    async fn write_audio(&mut self, window: &[u8]) -> Result<(), StreamError> {
        self.send(SocketFrame::Audio(window.to_vec())).await
    }

    async fn write_control(&mut self, event: ControlEvent) -> Result<(), StreamError> {
        match event {
            // Format is implied by the protocol; nothing to frame.
            ControlEvent::Config(_) => Ok(()),
            // Graceful end is signalled by the close frame itself.
            ControlEvent::Done => Ok(()),
            ControlEvent::Error(reason) => {
                self.send(SocketFrame::Close {
                    code: CLOSE_INTERNAL_ERROR,
                    reason,
                })
                .await
            }
        }
    }

    async fn close(&mut self) -> Result<(), StreamError> {
        if let Some(tx) = self.tx.take() {
            // Best effort: the peer may already be gone.
            let _ = tx
                .send(SocketFrame::Close {
                    code: CLOSE_NORMAL,
                    reason: String::new(),
                })
                .await;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Inbound events
// ---------------------------------------------------------------------------

/// One inbound message on the bidirectional socket.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundTextEvent {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub is_final: bool,
}

/// Parse an inbound socket message. Events missing required fields are
/// malformed; callers ignore them and keep the session alive.
pub fn parse_inbound(raw: &str) -> Result<InboundTextEvent, StreamError> {
    serde_json::from_str(raw).map_err(|e| StreamError::MalformedEvent(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn raw_transport_passes_bytes_through_unframed() {
        let (mut transport, mut rx) = RawStreamTransport::channel(4);
        transport.write_audio(&[1, 2, 3]).await.unwrap();
        transport
            .write_control(ControlEvent::Config(AudioFormat::default()))
            .await
            .unwrap();
        transport.write_audio(&[4, 5]).await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), vec![1, 2, 3]);
        assert_eq!(rx.recv().await.unwrap(), vec![4, 5]);
        // Close drops the sender and ends the stream.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn raw_transport_write_after_peer_drop_fails() {
        let (mut transport, rx) = RawStreamTransport::channel(1);
        drop(rx);
        let err = transport.write_audio(&[0]).await.unwrap_err();
        assert!(matches!(err, StreamError::TransportWrite(_)));
    }

    #[tokio::test]
    async fn event_transport_frames_payloads_as_data_lines() {
        let (mut transport, mut rx) = EventStreamTransport::channel(8);
        transport
            .write_control(ControlEvent::Config(AudioFormat::default()))
            .await
            .unwrap();
        transport.write_audio(&[0xAB, 0xCD]).await.unwrap();
        transport.write_audio(&[0xEF]).await.unwrap();
        transport.write_control(ControlEvent::Done).await.unwrap();
        transport.close().await.unwrap();

        let config = rx.recv().await.unwrap();
        assert!(config.starts_with("data: "));
        assert!(config.ends_with("\n\n"));
        let json: serde_json::Value =
            serde_json::from_str(config.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["type"], "config");
        assert_eq!(json["sample_rate"], 22050);
        assert_eq!(json["channels"], 1);
        assert_eq!(json["sample_width"], 2);

        for expected_index in 0..2u64 {
            let audio = rx.recv().await.unwrap();
            let json: serde_json::Value =
                serde_json::from_str(audio.trim_start_matches("data: ").trim()).unwrap();
            assert_eq!(json["type"], "audio");
            assert_eq!(json["index"], expected_index);
            assert!(BASE64.decode(json["chunk"].as_str().unwrap()).is_ok());
        }

        let done = rx.recv().await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(done.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["type"], "done");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn event_transport_error_frame_carries_message() {
        let (mut transport, mut rx) = EventStreamTransport::channel(2);
        transport
            .write_control(ControlEvent::Error("voice missing".into()))
            .await
            .unwrap();
        let frame = rx.recv().await.unwrap();
        let json: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "voice missing");
    }

    #[tokio::test]
    async fn socket_transport_sends_binary_then_close() {
        let (mut transport, mut rx) = SocketTransport::channel(4);
        transport.write_audio(&[9, 9]).await.unwrap();
        transport.close().await.unwrap();

        assert_eq!(rx.recv().await.unwrap(), SocketFrame::Audio(vec![9, 9]));
        assert_eq!(
            rx.recv().await.unwrap(),
            SocketFrame::Close {
                code: CLOSE_NORMAL,
                reason: String::new()
            }
        );
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn socket_transport_error_closes_with_1011() {
        let (mut transport, mut rx) = SocketTransport::channel(2);
        transport
            .write_control(ControlEvent::Error("synth blew up".into()))
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            SocketFrame::Close {
                code: CLOSE_INTERNAL_ERROR,
                reason: "synth blew up".into()
            }
        );
    }

    #[test]
    fn inbound_event_defaults() {
        let event = parse_inbound(r#"{"text": "hello"}"#).unwrap();
        assert_eq!(event.text, "hello");
        assert_eq!(event.language, None);
        assert!(!event.is_final);

        let event =
            parse_inbound(r#"{"text": "bye", "language": "english", "is_final": true}"#).unwrap();
        assert_eq!(event.language.as_deref(), Some("english"));
        assert!(event.is_final);
    }

    #[test]
    fn inbound_event_missing_text_is_malformed() {
        let err = parse_inbound(r#"{"language": "english"}"#).unwrap_err();
        assert!(matches!(err, StreamError::MalformedEvent(_)));
        assert!(parse_inbound("not json").is_err());
    }
}
