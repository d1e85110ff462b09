//! Receive side of the playback path.

use crate::format::{pcm16_from_base64, pcm16_from_le_bytes, pcm16_slice_to_f32, resample_linear};
use crate::pipeline::{PlaybackControl, PlaybackProducer, PlaybackStats};
use crate::TransportError;

/// Accepts audio from the transport and queues it for playback.
///
/// Owned by the task that receives network messages. Decoding and rate
/// conversion happen here, off the real-time thread, so the output
/// callback only ever copies samples.
///
/// Every `push_*` method returns `false` when the decoded chunk did not fit
/// in the queue and was dropped whole.
pub struct PlaybackHandle {
    producer: PlaybackProducer,
    control: PlaybackControl,
    wire_sample_rate: u32,
    output_sample_rate: u32,
}

impl PlaybackHandle {
    /// Creates a handle that converts from `wire_sample_rate` to
    /// `output_sample_rate` before queueing.
    pub fn new(producer: PlaybackProducer, wire_sample_rate: u32, output_sample_rate: u32) -> Self {
        let control = producer.control();
        Self {
            producer,
            control,
            wire_sample_rate,
            output_sample_rate,
        }
    }

    /// Queues f32 samples at the wire rate.
    pub fn push_samples(&mut self, samples: &[f32]) -> bool {
        if self.wire_sample_rate == self.output_sample_rate {
            return self.producer.on_chunk_received(samples);
        }
        let converted = resample_linear(samples, self.wire_sample_rate, self.output_sample_rate);
        self.producer.on_chunk_received(&converted)
    }

    /// Queues PCM16 samples at the wire rate.
    pub fn push_pcm16(&mut self, samples: &[i16]) -> bool {
        self.push_samples(&pcm16_slice_to_f32(samples))
    }

    /// Queues a little-endian PCM16 payload, as carried by binary frames.
    pub fn push_pcm16_le_bytes(&mut self, bytes: &[u8]) -> bool {
        self.push_pcm16(&pcm16_from_le_bytes(bytes))
    }

    /// Queues a base64 little-endian PCM16 payload, as carried by JSON frames.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidPayload`] if the payload is not
    /// valid base64. Nothing is queued in that case.
    pub fn push_base64(&mut self, encoded: &str) -> Result<bool, TransportError> {
        let samples =
            pcm16_from_base64(encoded).map_err(|e| TransportError::invalid_payload(e.to_string()))?;
        Ok(self.push_pcm16(&samples))
    }

    /// Discards everything queued so far (barge-in).
    pub fn interrupt(&self) {
        tracing::debug!(queued = self.producer.queued(), "interrupting playback");
        self.control.interrupt();
    }

    /// Sets the output gain, clamped to [0.0, 1.0].
    pub fn set_volume(&self, volume: f32) {
        self.control.set_volume(volume);
    }

    /// Control handle usable from other threads.
    pub fn control(&self) -> PlaybackControl {
        self.control.clone()
    }

    /// Playback counters.
    pub fn stats(&self) -> PlaybackStats {
        self.control.stats()
    }

    /// Sample rate of the audio this handle accepts.
    pub fn wire_sample_rate(&self) -> u32 {
        self.wire_sample_rate
    }

    /// Sample rate the queue is drained at.
    pub fn output_sample_rate(&self) -> u32 {
        self.output_sample_rate
    }
}
