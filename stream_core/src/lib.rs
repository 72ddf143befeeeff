//! Incremental text-to-speech streaming pipeline.
//!
//! Text arrives progressively (typically from an LLM token stream) and
//! audio leaves progressively, one linguistically coherent chunk at a
//! time. The pieces:
//!
//! - [`segment::SentenceBoundaryBuffer`] decides when enough text has
//!   accumulated to synthesize a coherent chunk.
//! - [`pacer::AudioChunkPacer`] releases synthesized audio in paced
//!   fixed-size windows so slow consumers are never flooded.
//! - [`session::DeliverySession`] is the per-client state machine
//!   interleaving text ingestion with audio delivery.
//! - [`transport`] holds the delivery contract plus its three wire
//!   framings (raw bytes, event lines, bidirectional socket).
//! - [`engine`] is the seam to the external synthesis capability and
//!   the immutable voice registry.

pub mod engine;
pub mod error;
pub mod pacer;
pub mod segment;
pub mod session;
pub mod transport;
pub mod wav;

pub use engine::{AudioFormat, AudioSegment, SynthesisEngine, VoiceRegistry};
pub use error::StreamError;
pub use pacer::AudioChunkPacer;
pub use segment::SentenceBoundaryBuffer;
pub use session::{DeliverySession, SessionState, TextFragment};
pub use transport::{
    parse_inbound, ControlEvent, EventStreamTransport, InboundTextEvent, RawStreamTransport,
    SocketFrame, SocketTransport, TransportAdapter,
};
