//! Encoded capture chunk with metadata.

use std::sync::Arc;
use std::time::Duration;

use crate::format::{pcm16_to_base64, pcm16_to_le_bytes};

/// A fixed-size buffer of PCM16 samples ready for a transport.
///
/// `EncodedChunk` is what the capture side hands to every
/// [`Transport`](crate::Transport). Samples are stored in an `Arc<Vec<i16>>`
/// so fanning a chunk out to several transports does not copy audio.
///
/// # Example
///
/// ```
/// use live_audio::EncodedChunk;
/// use std::time::Duration;
///
/// let chunk = EncodedChunk::new(vec![0i16; 1600], 0, Duration::ZERO, 16000);
/// assert_eq!(chunk.duration(), Duration::from_millis(100));
/// assert_eq!(chunk.to_le_bytes().len(), 3200);
/// ```
#[derive(Debug, Clone)]
pub struct EncodedChunk {
    /// Mono PCM samples in signed 16-bit format.
    pub samples: Arc<Vec<i16>>,

    /// Zero-based position of this chunk in the capture stream.
    pub sequence: u64,

    /// Offset of the first sample from the start of the session.
    ///
    /// Audio dropped on capture overflow still advances the clock, so a gap
    /// in `sequence`-ordered audio shows up as a jump here.
    pub timestamp: Duration,

    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl EncodedChunk {
    /// Creates a new chunk.
    pub fn new(samples: Vec<i16>, sequence: u64, timestamp: Duration, sample_rate: u32) -> Self {
        Self {
            samples: Arc::new(samples),
            sequence,
            timestamp,
            sample_rate,
        }
    }

    /// Returns the duration of the audio in this chunk.
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.samples.len() as f64 / f64::from(self.sample_rate))
    }

    /// Number of samples in this chunk.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns `true` if this chunk contains no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Little-endian byte payload for binary frames.
    pub fn to_le_bytes(&self) -> Vec<u8> {
        pcm16_to_le_bytes(&self.samples)
    }

    /// Base64 payload for JSON-framed transports.
    pub fn to_base64(&self) -> String {
        pcm16_to_base64(&self.samples)
    }

    /// MIME type describing the payload, e.g. `audio/pcm;rate=16000`.
    pub fn mime_type(&self) -> String {
        format!("audio/pcm;rate={}", self.sample_rate)
    }
}
