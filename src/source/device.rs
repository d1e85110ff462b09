//! CPAL device wrapper for audio capture.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig as CpalStreamConfig};

use crate::pipeline::{CaptureInput, InputFormat};
use crate::{EventCallback, LiveAudioError, SessionEvent};

/// Wrapper around a CPAL audio input device.
///
/// This handles device selection and builds the input stream that drives a
/// [`CaptureInput`].
#[must_use]
pub struct InputDevice {
    device: Device,
}

impl InputDevice {
    /// Opens the default input device.
    ///
    /// # Errors
    ///
    /// Returns `NoDefaultInputDevice` if no default input device is configured.
    pub fn open_default() -> Result<Self, LiveAudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(LiveAudioError::NoDefaultInputDevice)?;

        Ok(Self { device })
    }

    /// Opens a specific input device by name.
    ///
    /// # Errors
    ///
    /// Returns `DeviceNotFound` if no device with the given name exists.
    pub fn open_by_name(name: &str) -> Result<Self, LiveAudioError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
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

    /// Returns the device's native capture format.
    ///
    /// Capture always runs at this format; the pipeline mixes and
    /// downsamples to the wire format itself.
    pub fn native_format(&self) -> Result<InputFormat, LiveAudioError> {
        let config = self
            .device
            .default_input_config()
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;
        Ok(InputFormat {
            sample_rate: config.sample_rate().0,
            channels: config.channels(),
        })
    }

    /// Starts capturing audio into `input` and returns a running stream.
    ///
    /// `input` must have been created for [`native_format()`](Self::native_format).
    /// The returned `CaptureStream` must be kept alive for capture to
    /// continue. Backend errors are logged and reported as
    /// [`SessionEvent::StreamError`].
    ///
    /// # Errors
    ///
    /// Returns an error if the stream cannot be built or started.
    pub fn start_capture(
        &self,
        input: CaptureInput,
        event_callback: Option<EventCallback>,
    ) -> Result<CaptureStream, LiveAudioError> {
        let supported_config = self
            .device
            .default_input_config()
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;

        let sample_format = supported_config.sample_format();
        let cpal_config: CpalStreamConfig = supported_config.into();

        let stream = match sample_format {
            SampleFormat::I16 => self.build_i16_stream(&cpal_config, input, event_callback)?,
            SampleFormat::F32 => self.build_f32_stream(&cpal_config, input, event_callback)?,
            format => {
                return Err(LiveAudioError::UnsupportedFormat {
                    format: format!("{format:?}"),
                });
            }
        };

        stream
            .play()
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))?;

        tracing::info!(
            device = %self.name(),
            sample_rate = cpal_config.sample_rate.0,
            channels = cpal_config.channels,
            ?sample_format,
            "capture stream started"
        );

        Ok(CaptureStream { _stream: stream })
    }

    fn build_i16_stream(
        &self,
        config: &CpalStreamConfig,
        mut input: CaptureInput,
        event_callback: Option<EventCallback>,
    ) -> Result<Stream, LiveAudioError> {
        self.device
            .build_input_stream(
                config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    input.push_interleaved_i16(data);
                },
                stream_error_handler(event_callback),
                None,
            )
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))
    }

    fn build_f32_stream(
        &self,
        config: &CpalStreamConfig,
        mut input: CaptureInput,
        event_callback: Option<EventCallback>,
    ) -> Result<Stream, LiveAudioError> {
        self.device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    input.push_interleaved(data);
                },
                stream_error_handler(event_callback),
                None,
            )
            .map_err(|e| LiveAudioError::BackendError(e.to_string()))
    }
}

/// Builds the CPAL error callback shared by input and output streams.
pub(crate) fn stream_error_handler(
    event_callback: Option<EventCallback>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        tracing::error!("Audio stream error: {}", err);
        if let Some(ref callback) = event_callback {
            callback(SessionEvent::StreamError {
                reason: err.to_string(),
            });
        }
    }
}

/// A running audio capture stream.
///
/// Audio capture continues while this struct is held. When dropped, the CPAL
/// stream is stopped and the [`CaptureInput`] it owns is dropped, which
/// flushes its partial chunk.
pub struct CaptureStream {
    /// The underlying CPAL stream. Dropping this stops capture.
    _stream: Stream,
}
