//! Audio delivery pacing.
//!
//! Synthesis finishes much faster than real-time playback, so dumping
//! a whole segment at once would flood clients with small receive
//! buffers. The pacer releases fixed-size windows with a short pause
//! between them, approximating playback rate. The pause is best
//! effort, not a real-time guarantee.

use std::time::Duration;

use crate::engine::AudioSegment;
use crate::error::StreamError;
use crate::transport::TransportAdapter;

/// 4096 bytes ~= 93 ms of audio at 22050 Hz / 16-bit / mono.
pub const DEFAULT_WINDOW_BYTES: usize = 4096;

/// Delay between windows.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Splits a segment's PCM payload into fixed-size windows and writes
/// them to a sink in order, waiting the pacing interval between
/// windows. Holds no queue of its own: if the sink's write blocks on
/// backpressure, the pacer simply waits before composing the next
/// window. Container headers are stripped so only raw samples stream.
#[derive(Debug, Clone, Copy)]
pub struct AudioChunkPacer {
    window_bytes: usize,
    interval: Duration,
}

impl Default for AudioChunkPacer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_BYTES, DEFAULT_INTERVAL)
    }
}

impl AudioChunkPacer {
    pub fn new(window_bytes: usize, interval: Duration) -> Self {
        Self {
            window_bytes: window_bytes.max(1),
            interval,
        }
    }

    pub async fn release<T>(&self, segment: &AudioSegment, sink: &mut T) -> Result<(), StreamError>
    where
        T: TransportAdapter + ?Sized,
    {
        for window in segment.pcm_bytes().chunks(self.window_bytes) {
            sink.write_audio(window).await?;
            tokio::time::sleep(self.interval).await;
        }
        Ok(())
    }
}
