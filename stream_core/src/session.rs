//! Per-client delivery session.
//!
//! Owns the text buffer and drives the text-in/audio-out loop: ingest
//! fragments, cut a coherent chunk, synthesize it, pace the audio out
//! through the transport. The only component aware of both halves of
//! the pipeline. One session per connection, accessed by a single
//! logical flow of control; synthesis calls are strictly serialized,
//! so audio for chunk N is fully delivered before chunk N+1 starts.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::engine::VoiceRegistry;
use crate::error::StreamError;
use crate::pacer::AudioChunkPacer;
use crate::segment::SentenceBoundaryBuffer;
use crate::transport::{ControlEvent, TransportAdapter};

/// A unit of incoming text, from one LLM token or a batch of tokens.
#[derive(Debug, Clone)]
pub struct TextFragment {
    pub content: String,
    /// Caller signals no more fragments will arrive on this session.
    pub is_final: bool,
}

impl TextFragment {
    pub fn partial(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_final: false,
        }
    }

    pub fn last(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            is_final: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Accepting text, no synthesis outstanding.
    Open,
    /// A ready chunk is being converted to audio.
    Synthesizing,
    /// Graceful end: final fragment processed, audio delivered,
    /// transport closed.
    Closed,
    /// Unrecoverable error; transport closed with an error signal.
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Closed | SessionState::Failed)
    }
}

pub struct DeliverySession<T: TransportAdapter> {
    state: SessionState,
    voice_id: String,
    buffer: SentenceBoundaryBuffer,
    pacer: AudioChunkPacer,
    registry: Arc<VoiceRegistry>,
    transport: T,
    config_sent: bool,
}

impl<T: TransportAdapter> DeliverySession<T> {
    pub fn new(registry: Arc<VoiceRegistry>, voice_id: impl Into<String>, transport: T) -> Self {
        Self {
            state: SessionState::Open,
            voice_id: voice_id.into(),
            buffer: SentenceBoundaryBuffer::new(),
            pacer: AudioChunkPacer::default(),
            registry,
            transport,
            config_sent: false,
        }
    }

    pub fn with_pacer(mut self, pacer: AudioChunkPacer) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Switch the voice for subsequent chunks. Chunks already delivered
    /// are unaffected.
    pub fn set_voice(&mut self, voice_id: impl Into<String>) {
        self.voice_id = voice_id.into();
    }

    /// Feed one text fragment through the pipeline. A no-op once the
    /// session is terminal: after a disconnect every further write is
    /// silently dropped because no one can observe it.
    pub async fn ingest(&mut self, fragment: TextFragment) -> Result<(), StreamError> {
        if self.state.is_terminal() {
            debug!(state = ?self.state, "ignoring fragment for terminal session");
            return Ok(());
        }

        if let Some(chunk) = self.buffer.add(&fragment.content) {
            self.speak(&chunk).await?;
        }

        if fragment.is_final {
            if let Some(remainder) = self.buffer.flush() {
                self.speak(&remainder).await?;
            }
            self.transport.write_control(ControlEvent::Done).await?;
            self.transport.close().await?;
            self.state = SessionState::Closed;
            debug!("session closed after final fragment");
        }

        Ok(())
    }

    /// The client went away. In-flight work is abandoned; the buffer is
    /// left as-is since nothing will read it again.
    pub fn disconnect(&mut self) {
        if !self.state.is_terminal() {
            debug!("client disconnected, closing session");
            self.state = SessionState::Closed;
        }
    }

    /// Synthesize one chunk and pace it out. Failures here are atomic
    /// per chunk: nothing partial is delivered for the failing chunk,
    /// and chunks already delivered stand.
    async fn speak(&mut self, text: &str) -> Result<(), StreamError> {
        self.state = SessionState::Synthesizing;

        let engine = match self.registry.resolve(&self.voice_id) {
            Some(engine) => engine,
            None => {
                let err = StreamError::UnknownVoice(self.voice_id.clone());
                self.fail(&err).await;
                return Err(err);
            }
        };

        // The engine call is blocking and atomic from our point of
        // view; run it off the async runtime.
        let owned = text.to_string();
        let result = tokio::task::spawn_blocking(move || engine.synthesize(&owned))
            .await
            .map_err(|e| StreamError::Synthesis(format!("synthesis task panicked: {e}")));

        let segment = match result.and_then(|inner| inner) {
            Ok(segment) => segment,
            Err(err) => {
                self.fail(&err).await;
                return Err(err);
            }
        };

        if !self.config_sent {
            // Announce the engine-reported format before the first
            // audio byte.
            self.write(ControlEvent::Config(segment.format())).await?;
            self.config_sent = true;
        }

        if let Err(err) = self.pacer.release(&segment, &mut self.transport).await {
            // Mid-delivery write failure means the peer is gone.
            self.state = SessionState::Closed;
            debug!(error = %err, "transport dropped during delivery");
            return Err(err);
        }

        self.state = SessionState::Open;
        Ok(())
    }

    async fn write(&mut self, event: ControlEvent) -> Result<(), StreamError> {
        if let Err(err) = self.transport.write_control(event).await {
            self.state = SessionState::Closed;
            return Err(err);
        }
        Ok(())
    }

    /// Unrecoverable error: signal the client, close the transport,
    /// mark the session failed.
    async fn fail(&mut self, err: &StreamError) {
        warn!(error = %err, voice = %self.voice_id, "session failed");
        let _ = self
            .transport
            .write_control(ControlEvent::Error(err.to_string()))
            .await;
        let _ = self.transport.close().await;
        self.state = SessionState::Failed;
    }
}
