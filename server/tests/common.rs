//! Common utilities for integration tests

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use stream_core::{
    AudioChunkPacer, AudioFormat, AudioSegment, StreamError, SynthesisEngine, VoiceRegistry,
};

use server::{build_router, AppState};

/// Engine double: "audio" is just the text's bytes, so tests can check
/// byte-exact delivery without loading a real model.
pub struct EchoEngine;

impl SynthesisEngine for EchoEngine {
    fn output_format(&self) -> AudioFormat {
        AudioFormat::default()
    }

    fn synthesize(&self, text: &str) -> Result<AudioSegment, StreamError> {
        Ok(AudioSegment::pcm(
            AudioFormat::default(),
            text.as_bytes().to_vec(),
        ))
    }
}

/// Engine that always fails, for error-path tests.
pub struct FailingEngine;

impl SynthesisEngine for FailingEngine {
    fn output_format(&self) -> AudioFormat {
        AudioFormat::default()
    }

    fn synthesize(&self, _text: &str) -> Result<AudioSegment, StreamError> {
        Err(StreamError::Synthesis("model unavailable".into()))
    }
}

/// Create a test app instance backed by fake engines.
pub fn create_test_app() -> Router {
    let mut registry = VoiceRegistry::new();
    registry.register("english", Arc::new(EchoEngine));
    registry.register("broken", Arc::new(FailingEngine));

    // Small windows and a negligible pacing delay keep tests fast.
    let pacer = AudioChunkPacer::new(16, Duration::from_millis(1));
    let state = AppState::new(Arc::new(registry), pacer).expect("test registry is non-empty");
    build_router(state)
}
