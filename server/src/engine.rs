//! Piper-backed synthesis engine and voice-map loading.
//!
//! Each registered voice owns one eagerly-loaded Piper synthesizer.
//! Loading happens once at startup; a missing or broken model is fatal
//! then and never afterwards.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};

use anyhow::Context;
use piper_rs::synth::{PiperSpeechStreamParallel, PiperSpeechSynthesizer};
use tracing::info;

use stream_core::{wav, AudioFormat, AudioSegment, StreamError, SynthesisEngine, VoiceRegistry};

pub struct PiperEngine {
    synth: Arc<RwLock<PiperSpeechSynthesizer>>,
    format: AudioFormat,
}

impl PiperEngine {
    /// Load a Piper model from its config JSON.
    pub fn from_config_path<P: AsRef<Path>>(cfg_path: P) -> anyhow::Result<Self> {
        let sample_rate = read_sample_rate(&cfg_path)?;
        let model = piper_rs::from_config_path(cfg_path.as_ref())
            .map_err(|e| anyhow::anyhow!("piper load error: {e}"))?;
        let synth = PiperSpeechSynthesizer::new(model)?;

        Ok(Self {
            synth: Arc::new(RwLock::new(synth)),
            format: AudioFormat {
                sample_rate,
                channels: 1,
                sample_width_bits: 16,
            },
        })
    }
}

impl SynthesisEngine for PiperEngine {
    fn output_format(&self) -> AudioFormat {
        self.format
    }

    fn synthesize(&self, text: &str) -> Result<AudioSegment, StreamError> {
        let synth = self
            .synth
            .read()
            .map_err(|_| StreamError::Synthesis("synthesizer lock poisoned".into()))?;

        let iter: PiperSpeechStreamParallel = synth
            .synthesize_parallel(text.to_string(), None)
            .map_err(|e| StreamError::Synthesis(format!("piper synth error: {e}")))?;

        let mut samples: Vec<f32> = Vec::new();
        for part in iter {
            samples.extend(
                part.map_err(|e| StreamError::Synthesis(format!("chunk error: {e}")))?
                    .into_vec(),
            );
        }

        let data = wav::encode_wav(&samples, self.format.sample_rate)
            .map_err(|e| StreamError::Synthesis(format!("wav encode error: {e}")))?;
        Ok(AudioSegment::wav(self.format, data))
    }
}

/// Read sample rate from a Piper model config JSON
fn read_sample_rate<P: AsRef<Path>>(cfg_path: P) -> anyhow::Result<u32> {
    let text = fs::read_to_string(cfg_path.as_ref())
        .with_context(|| format!("Failed to read config file: {}", cfg_path.as_ref().display()))?;
    let json: serde_json::Value =
        serde_json::from_str(&text).with_context(|| "Config file is not valid JSON")?;

    let sample_rate = json
        .get("audio")
        .and_then(|a| a.get("sample_rate"))
        .and_then(|sr| sr.as_u64())
        .ok_or_else(|| anyhow::anyhow!("Missing or invalid 'audio.sample_rate' in config"))?;

    Ok(sample_rate as u32)
}

/// Build the process-wide voice registry from `models/map.json`.
///
/// Supports `{ "voice": "path/to/config.json" }` and
/// `{ "voice": { "config": "path/to/config.json" } }` entries.
pub fn load_registry<P: AsRef<Path>>(map_path: P) -> anyhow::Result<VoiceRegistry> {
    let text = fs::read_to_string(map_path.as_ref())
        .with_context(|| format!("Failed to load {}", map_path.as_ref().display()))?;
    let json: HashMap<String, serde_json::Value> =
        serde_json::from_str(&text).with_context(|| "voice map is not a JSON object")?;

    let mut registry = VoiceRegistry::new();
    for (voice_id, entry) in json {
        let cfg_path = match &entry {
            serde_json::Value::String(path) => path.clone(),
            serde_json::Value::Object(o) => o
                .get("config")
                .and_then(|x| x.as_str())
                .ok_or_else(|| anyhow::anyhow!("missing 'config' for voice {}", voice_id))?
                .to_string(),
            _ => {
                return Err(anyhow::anyhow!(
                    "invalid entry for voice {} (expected string or object)",
                    voice_id
                ));
            }
        };

        let engine = PiperEngine::from_config_path(&cfg_path)
            .with_context(|| format!("loading voice '{voice_id}' from {cfg_path}"))?;
        info!(voice = %voice_id, sample_rate = engine.output_format().sample_rate, "voice loaded");
        registry.register(voice_id, Arc::new(engine));
    }

    Ok(registry)
}
