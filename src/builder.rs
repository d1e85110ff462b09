//! Builder pattern for `LiveAudio`.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::output::{OutputDevice, PlaybackStream};
use crate::pipeline::{
    capture_ring, playback_buffer, BridgeCommand, CaptureBridge, CaptureInput, ChunkWriter,
    InputFormat, PlaybackConsumer, PlaybackControl, PlaybackHandle, Router,
};
use crate::session::{LiveSession, SessionParts, SessionState};
use crate::source::{CaptureStream, InputDevice};
use crate::transport::Transport;
use crate::{event_callback, EventCallback, LiveAudioError, SessionConfig, SessionEvent};

/// Channel capacity for bridge commands.
/// Only need 1 since commands are rare (just Stop).
const COMMAND_CHANNEL_CAPACITY: usize = 1;

/// Where captured audio comes from.
#[derive(Debug, Clone, Default)]
pub enum CaptureSource {
    /// The system's default input device.
    #[default]
    DefaultDevice,
    /// A specific input device by name.
    Device(String),
    /// Frames pushed by the application through
    /// [`LiveSession::take_capture_input()`](crate::LiveSession::take_capture_input).
    Manual(InputFormat),
}

impl CaptureSource {
    /// Capture from a specific device by name.
    pub fn device(name: impl Into<String>) -> Self {
        Self::Device(name.into())
    }
}

/// Where received audio is played.
#[derive(Debug, Clone, Default)]
pub enum PlaybackTarget {
    /// The system's default output device.
    #[default]
    DefaultDevice,
    /// A specific output device by name.
    Device(String),
    /// Rendered by the application through
    /// [`LiveSession::take_playback_consumer()`](crate::LiveSession::take_playback_consumer),
    /// at the given sample rate.
    Manual {
        /// Rate the application renders at, in Hz.
        sample_rate: u32,
    },
    /// No playback path.
    Disabled,
}

impl PlaybackTarget {
    /// Play on a specific device by name.
    pub fn device(name: impl Into<String>) -> Self {
        Self::Device(name.into())
    }
}

/// Capture side after the device (if any) has been opened.
enum ResolvedCapture {
    Device(InputDevice, InputFormat),
    Manual(InputFormat),
}

impl ResolvedCapture {
    fn format(&self) -> InputFormat {
        match self {
            ResolvedCapture::Device(_, format) | ResolvedCapture::Manual(format) => *format,
        }
    }
}

/// Playback side after the device (if any) has been opened.
enum ResolvedPlayback {
    Device(OutputDevice, u32),
    Manual(u32),
    Disabled,
}

/// Running endpoints created by [`LiveAudioBuilder::start()`].
struct Endpoints {
    capture_stream: Option<CaptureStream>,
    capture_input: Option<CaptureInput>,
    playback_stream: Option<PlaybackStream>,
    playback_handle: Option<PlaybackHandle>,
    playback_consumer: Option<PlaybackConsumer>,
    playback_control: Option<PlaybackControl>,
}

/// Builder for configuring and starting a live audio session.
///
/// Use [`LiveAudio::builder()`] to create a new builder.
///
/// # Example
///
/// ```ignore
/// use live_audio::{ChannelTransport, LiveAudio};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel(32);
///
/// let mut session = LiveAudio::builder()
///     .add_transport(ChannelTransport::new(tx))
///     .on_event(|e| tracing::warn!(?e, "session event"))
///     .start()
///     .await?;
///
/// let mut playback = session.take_playback_handle().unwrap();
///
/// // Capture: forward chunks to the server
/// while let Some(chunk) = rx.recv().await {
///     // socket.send(chunk.to_base64()).await?;
/// }
///
/// // Playback: queue audio received from the server
/// // playback.push_base64(&message.data)?;
///
/// session.stop().await?;
/// ```
///
/// [`LiveAudio::builder()`]: crate::LiveAudio::builder
#[must_use]
pub struct LiveAudioBuilder {
    capture: CaptureSource,
    playback: PlaybackTarget,
    transports: Vec<Arc<dyn Transport>>,
    event_callback: Option<EventCallback>,
    config: SessionConfig,
}

impl Default for LiveAudioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveAudioBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            capture: CaptureSource::default(),
            playback: PlaybackTarget::default(),
            transports: Vec::new(),
            event_callback: None,
            config: SessionConfig::default(),
        }
    }

    /// Set where captured audio comes from.
    ///
    /// Default: [`CaptureSource::DefaultDevice`]
    pub fn capture(mut self, source: CaptureSource) -> Self {
        self.capture = source;
        self
    }

    /// Set where received audio is played.
    ///
    /// Default: [`PlaybackTarget::DefaultDevice`]
    pub fn playback(mut self, target: PlaybackTarget) -> Self {
        self.playback = target;
        self
    }

    /// Add a transport to receive every captured chunk.
    pub fn add_transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transports.push(Arc::new(transport));
        self
    }

    /// Set a callback to receive runtime events.
    ///
    /// Events include overflows, under-runs, interrupts, transport errors
    /// and stream errors.
    pub fn on_event<F>(mut self, callback: F) -> Self
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        self.event_callback = Some(event_callback(callback));
        self
    }

    /// Set custom session configuration.
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the builder configuration.
    fn validate(&self) -> Result<(), LiveAudioError> {
        if self.transports.is_empty() {
            return Err(LiveAudioError::NoTransportConfigured);
        }
        self.config.validate()?;

        if let CaptureSource::Manual(format) = &self.capture {
            if format.sample_rate == 0 || format.channels == 0 {
                return Err(LiveAudioError::invalid_config(
                    "capture",
                    "manual input format needs a non-zero rate and channel count",
                ));
            }
        }
        if let PlaybackTarget::Manual { sample_rate: 0 } = &self.playback {
            return Err(LiveAudioError::invalid_config(
                "playback",
                "manual render rate must be non-zero",
            ));
        }
        Ok(())
    }

    /// Start the session.
    ///
    /// Returns a [`LiveSession`] handle to control it.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No transports are configured
    /// - The configuration is invalid
    /// - An audio device cannot be opened or started
    /// - Any transport fails to start
    pub async fn start(self) -> Result<LiveSession, LiveAudioError> {
        self.validate()?;

        let capture = self.resolve_capture()?;
        let playback = self.resolve_playback()?;

        let state = Arc::new(SessionState::new());
        let router = Router::new(
            self.transports.clone(),
            &self.config,
            self.event_callback.clone(),
        );
        router.start_transports().await?;

        let (writer, reader) = capture_ring(
            self.config.capture_ring_capacity(),
            self.config.capture_sample_rate,
            self.config.capture_chunk_size,
        );

        let endpoints = match self.start_endpoints(capture, playback, writer, &state) {
            Ok(endpoints) => endpoints,
            Err(e) => {
                router.stop_transports().await;
                return Err(e);
            }
        };

        let (cmd_tx, cmd_rx) = mpsc::channel::<BridgeCommand>(COMMAND_CHANNEL_CAPACITY);
        let bridge = CaptureBridge::new(
            reader,
            router,
            Arc::clone(&state),
            endpoints.playback_control.clone(),
            self.event_callback.clone(),
            self.config.capture_chunk_duration(),
        );
        let bridge_handle = tokio::spawn(bridge.run(cmd_rx));

        tracing::info!(
            capture_rate = self.config.capture_sample_rate,
            chunk_size = self.config.capture_chunk_size,
            playback = endpoints.playback_control.is_some(),
            transports = self.transports.len(),
            "live session started"
        );

        Ok(LiveSession::new(SessionParts {
            state,
            cmd_tx,
            bridge_handle,
            capture_stream: endpoints.capture_stream,
            capture_input: endpoints.capture_input,
            playback_stream: endpoints.playback_stream,
            playback_handle: endpoints.playback_handle,
            playback_consumer: endpoints.playback_consumer,
            playback_control: endpoints.playback_control,
        }))
    }

    /// Opens the input device, if any, and queries its format.
    fn resolve_capture(&self) -> Result<ResolvedCapture, LiveAudioError> {
        let device = match &self.capture {
            CaptureSource::DefaultDevice => InputDevice::open_default()?,
            CaptureSource::Device(name) => InputDevice::open_by_name(name)?,
            CaptureSource::Manual(format) => return Ok(ResolvedCapture::Manual(*format)),
        };
        let format = device.native_format()?;
        Ok(ResolvedCapture::Device(device, format))
    }

    /// Opens the output device, if any, and queries its rate.
    fn resolve_playback(&self) -> Result<ResolvedPlayback, LiveAudioError> {
        let device = match &self.playback {
            PlaybackTarget::DefaultDevice => OutputDevice::open_default()?,
            PlaybackTarget::Device(name) => OutputDevice::open_by_name(name)?,
            PlaybackTarget::Manual { sample_rate } => {
                return Ok(ResolvedPlayback::Manual(*sample_rate))
            }
            PlaybackTarget::Disabled => return Ok(ResolvedPlayback::Disabled),
        };
        let rate = device.native_format()?.sample_rate;
        Ok(ResolvedPlayback::Device(device, rate))
    }

    /// Builds the capture input and playback buffer and starts device streams.
    fn start_endpoints(
        &self,
        capture: ResolvedCapture,
        playback: ResolvedPlayback,
        writer: ChunkWriter,
        state: &Arc<SessionState>,
    ) -> Result<Endpoints, LiveAudioError> {
        let input = CaptureInput::new(
            writer,
            capture.format(),
            self.config.capture_sample_rate,
            self.config.capture_chunk_size,
            Arc::clone(state),
        )?;

        let mut endpoints = Endpoints {
            capture_stream: None,
            capture_input: None,
            playback_stream: None,
            playback_handle: None,
            playback_consumer: None,
            playback_control: None,
        };

        let output_rate = match &playback {
            ResolvedPlayback::Device(_, rate) | ResolvedPlayback::Manual(rate) => Some(*rate),
            ResolvedPlayback::Disabled => None,
        };
        if let Some(output_rate) = output_rate {
            let (producer, consumer, control) = playback_buffer(
                self.config.playback_queue_capacity(output_rate),
                self.config.underrun_policy,
                self.config.initial_volume,
            )?;
            endpoints.playback_handle = Some(PlaybackHandle::new(
                producer,
                self.config.playback_sample_rate,
                output_rate,
            ));
            endpoints.playback_control = Some(control);

            match playback {
                ResolvedPlayback::Device(device, _) => {
                    endpoints.playback_stream =
                        Some(device.start_playback(consumer, self.event_callback.clone())?);
                }
                _ => endpoints.playback_consumer = Some(consumer),
            }
        }

        match capture {
            ResolvedCapture::Device(device, _) => {
                endpoints.capture_stream =
                    Some(device.start_capture(input, self.event_callback.clone())?);
            }
            ResolvedCapture::Manual(_) => endpoints.capture_input = Some(input),
        }

        Ok(endpoints)
    }
}

/// Main entry point for live-audio.
///
/// Use [`LiveAudio::builder()`] to start configuring a session.
pub struct LiveAudio;

impl LiveAudio {
    /// Creates a new builder for configuring a live audio session.
    pub fn builder() -> LiveAudioBuilder {
        LiveAudioBuilder::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChannelTransport;

    fn manual_builder() -> LiveAudioBuilder {
        LiveAudio::builder()
            .capture(CaptureSource::Manual(InputFormat {
                sample_rate: 16000,
                channels: 1,
            }))
            .playback(PlaybackTarget::Manual { sample_rate: 24000 })
            .add_transport(ChannelTransport::new(mpsc::channel(1).0))
    }

    #[test]
    fn test_builder_default() {
        let builder = LiveAudioBuilder::new();
        assert!(builder.transports.is_empty());
        assert!(matches!(builder.capture, CaptureSource::DefaultDevice));
        assert!(matches!(builder.playback, PlaybackTarget::DefaultDevice));
    }

    #[test]
    fn test_builder_rejects_no_transport() {
        let builder = LiveAudio::builder();
        assert!(matches!(
            builder.validate(),
            Err(LiveAudioError::NoTransportConfigured)
        ));
    }

    #[test]
    fn test_builder_rejects_bad_config() {
        let builder = manual_builder().with_config(SessionConfig {
            capture_chunk_size: 0,
            ..Default::default()
        });
        assert!(matches!(
            builder.validate(),
            Err(LiveAudioError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_builder_rejects_zero_manual_rates() {
        let builder = manual_builder().playback(PlaybackTarget::Manual { sample_rate: 0 });
        assert!(builder.validate().is_err());

        let builder = manual_builder().capture(CaptureSource::Manual(InputFormat {
            sample_rate: 16000,
            channels: 0,
        }));
        assert!(builder.validate().is_err());
    }

    #[test]
    fn test_builder_device_helpers() {
        assert!(matches!(
            CaptureSource::device("USB Mic"),
            CaptureSource::Device(name) if name == "USB Mic"
        ));
        assert!(matches!(
            PlaybackTarget::device("Speakers"),
            PlaybackTarget::Device(name) if name == "Speakers"
        ));
    }

    #[tokio::test]
    async fn test_manual_session_exposes_endpoints() {
        let mut session = manual_builder().start().await.unwrap();

        assert!(session.is_running());
        assert!(session.take_capture_input().is_some());
        assert!(session.take_playback_handle().is_some());
        assert!(session.take_playback_consumer().is_some());
        assert!(session.playback_control().is_some());

        session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_playback_disabled() {
        let mut session = manual_builder()
            .playback(PlaybackTarget::Disabled)
            .start()
            .await
            .unwrap();

        assert!(session.take_playback_handle().is_none());
        assert!(session.playback_control().is_none());
        assert_eq!(session.stats().playback.queued_samples, 0);

        session.stop().await.unwrap();
    }
}
