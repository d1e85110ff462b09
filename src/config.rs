//! Configuration types for live audio sessions.

use std::time::Duration;

use crate::LiveAudioError;

/// What the playback buffer does when asked for more samples than it holds.
///
/// Either way the render callback gets a full frame and never waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderrunPolicy {
    /// Deliver whatever is queued and zero-pad the rest of the frame.
    ///
    /// The queue is empty afterwards.
    #[default]
    PadWithSilence,

    /// Deliver a full frame of silence and keep the short queue intact.
    ///
    /// Queued audio waits until a whole frame is available, which avoids
    /// chopping a trickle of network audio into fragments.
    HoldForFullFrame,
}

/// Configuration for a live audio session.
///
/// Use [`SessionConfig::default()`] for the common live-voice setup
/// (16kHz capture in 4096-sample chunks, 24kHz playback), or customize as
/// needed.
///
/// # Example
///
/// ```
/// use live_audio::SessionConfig;
///
/// let config = SessionConfig {
///     capture_chunk_size: 1024,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Sample rate of captured audio handed to transports, in Hz.
    ///
    /// Default: 16000
    pub capture_sample_rate: u32,

    /// Number of samples in each emitted capture chunk.
    ///
    /// Default: 4096
    pub capture_chunk_size: usize,

    /// Capacity of the ring between the input callback and the transport
    /// bridge, expressed as audio duration at `capture_sample_rate`.
    ///
    /// Default: 10 seconds
    pub capture_buffer_duration: Duration,

    /// Sample rate of audio received from the transport, in Hz.
    ///
    /// Default: 24000
    pub playback_sample_rate: u32,

    /// Capacity of the playback queue, expressed as audio duration at the
    /// output device rate.
    ///
    /// Default: 30 seconds
    pub playback_buffer_duration: Duration,

    /// Under-run behavior of the playback buffer.
    pub underrun_policy: UnderrunPolicy,

    /// Initial playback gain in [0.0, 1.0].
    ///
    /// Default: 1.0
    pub initial_volume: f32,

    /// Number of attempts for a failed transport send.
    ///
    /// Default: 3
    pub transport_retry_attempts: u32,

    /// Initial delay between transport retries (doubles each attempt).
    ///
    /// Default: 100ms
    pub transport_retry_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capture_sample_rate: 16000,
            capture_chunk_size: 4096,
            capture_buffer_duration: Duration::from_secs(10),
            playback_sample_rate: 24000,
            playback_buffer_duration: Duration::from_secs(30),
            underrun_policy: UnderrunPolicy::default(),
            initial_volume: 1.0,
            transport_retry_attempts: 3,
            transport_retry_delay: Duration::from_millis(100),
        }
    }
}

impl SessionConfig {
    /// Checks that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`LiveAudioError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<(), LiveAudioError> {
        if self.capture_sample_rate == 0 {
            return Err(LiveAudioError::invalid_config(
                "capture_sample_rate",
                "must be non-zero",
            ));
        }
        if self.capture_chunk_size == 0 {
            return Err(LiveAudioError::invalid_config(
                "capture_chunk_size",
                "must be non-zero",
            ));
        }
        if self.capture_ring_capacity() < self.capture_chunk_size {
            return Err(LiveAudioError::invalid_config(
                "capture_buffer_duration",
                "must hold at least one capture chunk",
            ));
        }
        if self.playback_sample_rate == 0 {
            return Err(LiveAudioError::invalid_config(
                "playback_sample_rate",
                "must be non-zero",
            ));
        }
        if self.playback_buffer_duration.is_zero() {
            return Err(LiveAudioError::invalid_config(
                "playback_buffer_duration",
                "must be non-zero",
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(LiveAudioError::invalid_config(
                "initial_volume",
                format!("{} is outside [0.0, 1.0]", self.initial_volume),
            ));
        }
        Ok(())
    }

    /// Capture ring capacity in samples.
    pub fn capture_ring_capacity(&self) -> usize {
        samples_for(self.capture_buffer_duration, self.capture_sample_rate)
    }

    /// Playback queue capacity in samples at the given output rate.
    pub fn playback_queue_capacity(&self, output_sample_rate: u32) -> usize {
        samples_for(self.playback_buffer_duration, output_sample_rate).max(1)
    }

    /// Duration of one capture chunk.
    pub fn capture_chunk_duration(&self) -> Duration {
        if self.capture_sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(
            self.capture_chunk_size as u64 * 1_000_000 / u64::from(self.capture_sample_rate),
        )
    }
}

fn samples_for(duration: Duration, sample_rate: u32) -> usize {
    (f64::from(sample_rate) * duration.as_secs_f64()) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_config_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.capture_sample_rate, 16000);
        assert_eq!(config.capture_chunk_size, 4096);
        assert_eq!(config.playback_sample_rate, 24000);
        assert_eq!(config.underrun_policy, UnderrunPolicy::PadWithSilence);
        assert_eq!(config.initial_volume, 1.0);
        assert_eq!(config.transport_retry_attempts, 3);
        assert_eq!(config.transport_retry_delay, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_capacities() {
        let config = SessionConfig::default();
        assert_eq!(config.capture_ring_capacity(), 160_000);
        assert_eq!(config.playback_queue_capacity(48000), 48000 * 30);
        assert_eq!(config.capture_chunk_duration(), Duration::from_millis(256));
    }

    #[test]
    fn test_validate_zero_chunk() {
        let config = SessionConfig {
            capture_chunk_size: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LiveAudioError::InvalidConfig {
                field: "capture_chunk_size",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_ring_smaller_than_chunk() {
        let config = SessionConfig {
            capture_buffer_duration: Duration::from_millis(10),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_volume_range() {
        let config = SessionConfig {
            initial_volume: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
