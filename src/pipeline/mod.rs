//! Audio pipeline components.
//!
//! Capture and playback each cross the real-time boundary through a
//! lock-free SPSC ring:
//!
//! ```text
//! input callback → CaptureInput → PCM16 ring → CaptureBridge → Router → Transports
//! network task   → PlaybackHandle → f32 queue → PlaybackConsumer → output callback
//! ```
//!
//! - **CaptureBuffer**: Cuts arbitrary input frames into fixed-size chunks
//! - **Capture ring**: Absorbs pressure from slow transports
//! - **Capture Bridge**: Reads chunks from the ring, forwards them, reports events
//! - **Router**: Fans out chunks to all transports with retry logic
//! - **Playback buffer**: Jitter queue that zero-fills on under-run
//!
//! Neither callback side ever blocks or allocates once warmed up.

mod capture;
mod capture_buffer;
mod playback;
mod playback_buffer;
mod ring_buffer;
mod router;

pub use capture::{CaptureInput, InputFormat};
pub(crate) use capture::{BridgeCommand, CaptureBridge};
pub use capture_buffer::CaptureBuffer;
pub use playback::PlaybackHandle;
pub use playback_buffer::{
    playback_buffer, PlaybackConsumer, PlaybackControl, PlaybackProducer, PlaybackStats,
    RenderOutcome,
};
pub(crate) use ring_buffer::{capture_ring, ChunkReader, ChunkWriter};
pub(crate) use router::Router;
