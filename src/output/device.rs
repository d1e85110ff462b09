//! CPAL device wrapper for audio playback.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig as CpalStreamConfig};

use crate::format::{f32_to_pcm16, fan_out_mono};
use crate::pipeline::PlaybackConsumer;
use crate::source::stream_error_handler;
use crate::{EventCallback, LiveAudioError};

/// Frames rendered per queue read. Larger device buffers are filled in
/// several blocks so the callback never grows its scratch.
const SCRATCH_CAPACITY: usize = 8192;

/// Native format of an output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count.
    pub channels: u16,
}

/// Wrapper around a CPAL audio output device.
#[must_use]
pub struct OutputDevice {
    device: Device,
}

impl OutputDevice {
    /// Opens the default output device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultOutputDevice` if no default output device is configured.
    pub fn open_default() -> Result<Self, LiveAudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(LiveAudioError::NoDefaultOutputDevice)?;

        Ok(Self { device })
    }

    /// Opens a specific output device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, LiveAudioError> {
        let host = cpal::default_host();
        let devices = host
            .output_devices()
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;

        for device in devices {
            if let Ok(device_name) = device.name() {
                if device_name == name {
                    return Ok(Self { device });
                }
            }
        }

        Err(LiveAudioError::DeviceNotFound {
            name: name.to_string(),
        })
    }

    /// Returns the device name.
    pub fn name(&self) -> String {
        self.device.name().unwrap_or_else(|_| "unknown".to_string())
    }

    /// Returns the device's native playback format.
    pub fn native_format(&self) -> Result<OutputFormat, LiveAudioError> {
        let config = self
            .device
            .default_output_config()
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;
        Ok(OutputFormat {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    /// Starts rendering from `consumer` and returns a running stream.
    ///
    /// The consumer's queue must hold audio at the
    /// [`native_format()`](Self::native_format) sample rate. Each mono
    /// sample is copied to every output channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be built or started.
    pub fn start_playback(
        &self,
        consumer: PlaybackConsumer,
        event_callback: Option<EventCallback>,
    ) -> Result<PlaybackStream, LiveAudioError> {
        let supported_config = self
            .device
            .default_output_config()
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let cpal_config: CpalStreamConfig = supported_config.into();
        let mut renderer = OutputRenderer::new(consumer, cpal_config.channels);

        let stream = match sample_format {
            SampleFormat::F32 => self.device.build_output_stream(
                &cpal_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| renderer.fill_f32(data),
                stream_error_handler(event_callback),
                None,
            ),
            SampleFormat::I16 => self.device.build_output_stream(
                &cpal_config,
                move |data: &mut [i16], _: &cpal::OutputCallbackInfo| renderer.fill_i16(data),
                stream_error_handler(event_callback),
                None,
            ),
            format => {
                return Err(LiveAudioError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        }
        .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;

        stream
            .play()
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;

        tracing::info!(
            device = %self.name(),
            sample_rate = cpal_config.sample_rate.0,
            channels = cpal_config.channels,
            ?sample_format,
            "playback stream started"
        );

        Ok(PlaybackStream { _stream: stream })
    }
}

/// Fills interleaved device buffers from the mono playback queue.
struct OutputRenderer {
    consumer: PlaybackConsumer,
    channels: usize,
    mono: Vec<f32>,
}

impl OutputRenderer {
    fn new(consumer: PlaybackConsumer, channels: u16) -> Self {
        Self {
            consumer,
            channels: usize::from(channels.max(1)),
            mono: vec![0.0; SCRATCH_CAPACITY],
        }
    }

    /// Renders `frames` (at most [`SCRATCH_CAPACITY`]) mono samples into scratch.
    fn render_mono(&mut self, frames: usize) -> &[f32] {
        let mono = &mut self.mono[..frames];
        self.consumer.render_into(mono);
        mono
    }

    /// Splits `data` into whole-frame blocks the scratch buffer can hold.
    fn frame_blocks<T>(
        data: &mut [T],
        channels: usize,
    ) -> (std::slice::ChunksMut<'_, T>, &mut [T]) {
        let whole = data.len() / channels * channels;
        let (frames, ragged) = data.split_at_mut(whole);
        (frames.chunks_mut(SCRATCH_CAPACITY * channels), ragged)
    }

    fn fill_f32(&mut self, data: &mut [f32]) {
        let channels = self.channels;
        let (blocks, ragged) = Self::frame_blocks(data, channels);
        for block in blocks {
            let mono = self.render_mono(block.len() / channels);
            fan_out_mono(mono, channels as u16, block);
        }
        ragged.fill(0.0);
    }

    fn fill_i16(&mut self, data: &mut [i16]) {
        let channels = self.channels;
        let (blocks, ragged) = Self::frame_blocks(data, channels);
        for block in blocks {
            let mono = self.render_mono(block.len() / channels);
            for (frame, &sample) in block.chunks_exact_mut(channels).zip(mono) {
                frame.fill(f32_to_pcm16(sample));
            }
        }
        ragged.fill(0);
    }
}

/// A running audio playback stream.
///
/// Playback continues while this struct is held. When dropped, the CPAL
/// stream is stopped and resources are released.
pub struct PlaybackStream {
    /// The underlying CPAL stream. Dropping this stops playback.
    _stream: Stream,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::playback_buffer;
    use crate::UnderrunPolicy;

    #[test]
    fn test_fill_f32_duplicates_channels() {
        let (mut producer, consumer, _) =
            playback_buffer(64, UnderrunPolicy::PadWithSilence, 1.0).unwrap();
        producer.on_chunk_received(&[0.25, -0.5]);
        let mut renderer = OutputRenderer::new(consumer, 2);

        let mut data = [1.0f32; 6];
        renderer.fill_f32(&mut data);
        assert_eq!(data, [0.25, 0.25, -0.5, -0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_fill_i16_converts_asymmetrically() {
        let (mut producer, consumer, _) =
            playback_buffer(64, UnderrunPolicy::PadWithSilence, 1.0).unwrap();
        producer.on_chunk_received(&[-1.0, 1.0]);
        let mut renderer = OutputRenderer::new(consumer, 1);

        let mut data = [7i16; 3];
        renderer.fill_i16(&mut data);
        assert_eq!(data, [-32768, 32767, 0]);
    }

    #[test]
    fn test_fill_ragged_buffer_zeroes_tail() {
        let (mut producer, consumer, _) =
            playback_buffer(64, UnderrunPolicy::PadWithSilence, 1.0).unwrap();
        producer.on_chunk_received(&[0.5; 4]);
        let mut renderer = OutputRenderer::new(consumer, 2);

        let mut data = [1.0f32; 5];
        renderer.fill_f32(&mut data);
        assert_eq!(data, [0.5, 0.5, 0.5, 0.5, 0.0]);
    }

    #[test]
    fn test_fill_buffer_larger_than_scratch() {
        let frames = SCRATCH_CAPACITY + 1808;
        let ramp: Vec<f32> = (0..frames).map(|i| i as f32 / frames as f32).collect();
        let (mut producer, consumer, control) =
            playback_buffer(frames, UnderrunPolicy::PadWithSilence, 1.0).unwrap();
        assert!(producer.on_chunk_received(&ramp));
        let mut renderer = OutputRenderer::new(consumer, 2);

        let mut data = vec![1.0f32; frames * 2 + 1];
        renderer.fill_f32(&mut data);

        for (frame, &expected) in data.chunks_exact(2).zip(&ramp) {
            assert_eq!(frame, [expected, expected]);
        }
        assert_eq!(data[frames * 2], 0.0);
        assert_eq!(renderer.mono.len(), SCRATCH_CAPACITY);
        assert_eq!(control.stats().rendered_samples, frames as u64);
        assert_eq!(control.stats().underruns, 0);
    }

    #[test]
    fn test_fill_i16_buffer_larger_than_scratch() {
        let frames = SCRATCH_CAPACITY * 2 + 3;
        let (mut producer, consumer, _) =
            playback_buffer(frames, UnderrunPolicy::PadWithSilence, 1.0).unwrap();
        assert!(producer.on_chunk_received(&vec![-1.0; frames]));
        let mut renderer = OutputRenderer::new(consumer, 1);

        let mut data = vec![0i16; frames];
        renderer.fill_i16(&mut data);
        assert!(data.iter().all(|&s| s == -32768));
    }

    #[test]
    #[ignore = "requires audio hardware"]
    fn test_open_default_output_device() {
        let device = OutputDevice::open_default().unwrap();
        let format = device.native_format().unwrap();
        println!("Default output: {} {format:?}", device.name());
        assert!(format.sample_rate > 0);
    }
}
