// Configuration constants for the server

use std::time::Duration;

#[derive(Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub voices_map_path: String,
    pub rate_limit_per_minute: u32,
    pub request_timeout_secs: u64,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub pacer_window_bytes: usize,
    pub pacer_interval_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8085,
            voices_map_path: "models/map.json".into(),
            rate_limit_per_minute: 60,
            request_timeout_secs: 60,
            cors_allowed_origins: None,
            pacer_window_bytes: stream_core::pacer::DEFAULT_WINDOW_BYTES,
            pacer_interval_ms: 10,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let voices_map_path =
            std::env::var("VOICES_MAP").unwrap_or(defaults.voices_map_path);

        let rate_limit_per_minute = std::env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.rate_limit_per_minute);

        let request_timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.request_timeout_secs);

        let cors_allowed_origins = std::env::var("CORS_ALLOWED_ORIGINS")
            .ok()
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .collect()
            });

        let pacer_window_bytes = std::env::var("PACER_WINDOW_BYTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.pacer_window_bytes);

        let pacer_interval_ms = std::env::var("PACER_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.pacer_interval_ms);

        Self {
            port,
            voices_map_path,
            rate_limit_per_minute,
            request_timeout_secs,
            cors_allowed_origins,
            pacer_window_bytes,
            pacer_interval_ms,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn pacer(&self) -> stream_core::AudioChunkPacer {
        stream_core::AudioChunkPacer::new(
            self.pacer_window_bytes,
            Duration::from_millis(self.pacer_interval_ms),
        )
    }
}
