//! # live-audio
//!
//! **Note:** This crate is under active development. The API may change before 1.0.
//!
//! Client-side audio buffering for live, full-duplex voice sessions.
//!
//! `live-audio` sits between the sound card and a streaming speech service.
//! Microphone audio is cut into fixed-size PCM16 chunks and handed to one or
//! more transports; audio coming back from the service is queued in a
//! jitter-tolerant playback buffer that pads with silence instead of
//! stalling the output device.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use live_audio::{ChannelTransport, EncodedChunk, LiveAudio};
//! use tokio::sync::mpsc;
//!
//! let (tx, mut rx) = mpsc::channel::<EncodedChunk>(32);
//!
//! let mut session = LiveAudio::builder()
//!     .add_transport(ChannelTransport::new(tx))
//!     .on_event(|e| tracing::warn!(?e, "session event"))
//!     .start()
//!     .await?;
//!
//! let mut playback = session.take_playback_handle().unwrap();
//!
//! // 4096-sample chunks of 16kHz mono PCM16, ready for the wire
//! while let Some(chunk) = rx.recv().await {
//!     // socket.send(chunk.to_base64()).await?;
//!     // playback.push_base64(&reply)?;
//! }
//!
//! session.stop().await?;
//! ```
//!
//! ## Architecture
//!
//! The crate maintains a strict thread boundary:
//!
//! - **Audio callbacks**: High-priority CPAL threads that never block, lock or log
//! - **Ring buffers**: Lock-free SPSC queues in each direction
//! - **Tokio runtime**: The capture bridge fans chunks out to transports and
//!   turns callback-side counters into [`SessionEvent`]s
//!
//! The building blocks are usable on their own: [`CaptureBuffer`] for
//! fixed-size chunking, [`playback_buffer`] for the jitter queue and
//! [`format`] for the PCM16 conversions.

// unsafe_code lint is configured in Cargo.toml as "deny"
#![warn(missing_docs)]
// Audio code requires intentional numeric casts between sample formats
#![allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_possible_wrap,
    clippy::cast_lossless
)]
// unwrap/expect allowed in tests only
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used))]
// These doc lints are too strict for internal implementation details
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

mod builder;
mod chunk;
mod config;
mod error;
mod event;
pub mod format;
pub mod output;
mod pipeline;
mod session;
pub mod source;
mod transport;

pub use builder::{CaptureSource, LiveAudio, LiveAudioBuilder, PlaybackTarget};
pub use chunk::EncodedChunk;
pub use config::{SessionConfig, UnderrunPolicy};
pub use error::{LiveAudioError, TransportError};
pub use event::{event_callback, EventCallback, SessionEvent};
pub use output::{
    default_output_device_name, list_output_devices, OutputDevice, OutputFormat, PlaybackStream,
};
pub use pipeline::{
    playback_buffer, CaptureBuffer, CaptureInput, InputFormat, PlaybackConsumer, PlaybackControl,
    PlaybackHandle, PlaybackProducer, PlaybackStats, RenderOutcome,
};
pub use session::{LiveSession, SessionStats};
pub use source::{
    default_input_device_name, list_input_devices, CaptureStream, InputDevice, MockSource,
};
pub use transport::{ChannelTransport, Transport};
