use thiserror::Error;

/// Errors surfaced by the streaming pipeline.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("unknown voice: {0}")]
    UnknownVoice(String),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("transport write failed: {0}")]
    TransportWrite(String),

    #[error("malformed inbound event: {0}")]
    MalformedEvent(String),
}

impl StreamError {
    /// True when the error means the peer is gone and nothing more can
    /// be delivered on this session.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, StreamError::TransportWrite(_))
    }
}
