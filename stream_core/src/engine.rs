//! Synthesis engine and voice registry seams.
//!
//! The actual text-to-audio conversion is an external capability. The
//! pipeline only depends on the [`SynthesisEngine`] trait, and the
//! registry is an injected, immutable mapping built once at startup so
//! sessions (and tests) can substitute fakes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::error::StreamError;
use crate::wav::WAV_HEADER_LEN;

/// PCM format metadata carried end-to-end with every segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_width_bits: u16,
}

impl Default for AudioFormat {
    fn default() -> Self {
        // Piper default: 16-bit signed little-endian PCM, mono, 22050 Hz.
        Self {
            sample_rate: 22050,
            channels: 1,
            sample_width_bits: 16,
        }
    }
}

/// How the raw bytes of an [`AudioSegment`] are framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Bare little-endian PCM payload.
    RawPcm,
    /// RIFF/WAVE buffer; the fixed-size header precedes the payload.
    Wav,
}

/// Raw audio produced by one synthesis call. Consumed once by the
/// pacer, never retained after delivery.
#[derive(Debug, Clone)]
pub struct AudioSegment {
    format: AudioFormat,
    container: Container,
    data: Vec<u8>,
}

impl AudioSegment {
    pub fn pcm(format: AudioFormat, data: Vec<u8>) -> Self {
        Self {
            format,
            container: Container::RawPcm,
            data,
        }
    }

    pub fn wav(format: AudioFormat, data: Vec<u8>) -> Self {
        Self {
            format,
            container: Container::Wav,
            data,
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// The PCM payload with any container header stripped.
    pub fn pcm_bytes(&self) -> &[u8] {
        match self.container {
            Container::RawPcm => &self.data,
            Container::Wav => self.data.get(WAV_HEADER_LEN..).unwrap_or(&[]),
        }
    }
}

/// External collaborator converting text into audio samples.
///
/// `synthesize` is a blocking call with no externally observable
/// intermediate state; callers run it under `spawn_blocking`. Safe for
/// concurrent invocation across sessions, one call at a time per
/// session.
pub trait SynthesisEngine: Send + Sync {
    /// Format the engine will produce, known before any synthesis.
    fn output_format(&self) -> AudioFormat;

    fn synthesize(&self, text: &str) -> Result<AudioSegment, StreamError>;
}

/// Immutable voice id -> engine mapping, populated once at startup and
/// read concurrently by every session for the life of the process.
#[derive(Default)]
pub struct VoiceRegistry {
    voices: HashMap<String, Arc<dyn SynthesisEngine>>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a voice. Only called during startup, before the
    /// registry is shared.
    pub fn register(&mut self, voice_id: impl Into<String>, engine: Arc<dyn SynthesisEngine>) {
        self.voices.insert(voice_id.into(), engine);
    }

    pub fn resolve(&self, voice_id: &str) -> Option<Arc<dyn SynthesisEngine>> {
        self.voices.get(voice_id).cloned()
    }

    pub fn voice_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.voices.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEngine;

    impl SynthesisEngine for NullEngine {
        fn output_format(&self) -> AudioFormat {
            AudioFormat::default()
        }

        fn synthesize(&self, _text: &str) -> Result<AudioSegment, StreamError> {
            Ok(AudioSegment::pcm(AudioFormat::default(), Vec::new()))
        }
    }

    #[test]
    fn registry_resolves_registered_voices_only() {
        let mut registry = VoiceRegistry::new();
        registry.register("english", Arc::new(NullEngine));

        assert!(registry.resolve("english").is_some());
        assert!(registry.resolve("klingon").is_none());
        assert_eq!(registry.voice_ids(), vec!["english".to_string()]);
    }

    #[test]
    fn wav_segment_strips_header() {
        let data = crate::wav::encode_wav(&[0.25; 8], 22050).unwrap();
        let segment = AudioSegment::wav(AudioFormat::default(), data);
        assert_eq!(segment.pcm_bytes().len(), 16);
    }

    #[test]
    fn short_wav_segment_yields_empty_payload() {
        let segment = AudioSegment::wav(AudioFormat::default(), vec![0u8; 10]);
        assert!(segment.pcm_bytes().is_empty());
    }
}
