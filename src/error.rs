//! Error types for live-audio.
//!
//! Errors are split into two categories:
//! - **Fatal errors** ([`LiveAudioError`]): Prevent a session from starting
//! - **Recoverable errors** ([`TransportError`]): Runtime send failures,
//!   surfaced via [`EventCallback`](crate::EventCallback)
//!
//! Nothing on the real-time audio path returns an error. Under-runs and
//! overflows are counted and reported out of band.

/// Fatal errors that prevent a live audio session from starting.
///
/// These errors are returned from [`LiveAudioBuilder::start()`] and from
/// constructors that validate their configuration.
///
/// [`LiveAudioBuilder::start()`]: crate::LiveAudioBuilder::start
#[derive(Debug, thiserror::Error)]
pub enum LiveAudioError {
    /// The requested audio device was not found.
    #[error("device not found: {name}")]
    DeviceNotFound {
        /// Name of the device that wasn't found.
        name: String,
    },

    /// No default input device is configured on this system.
    #[error("no default input device configured")]
    NoDefaultInputDevice,

    /// No default output device is configured on this system.
    #[error("no default output device configured")]
    NoDefaultOutputDevice,

    /// The device's sample format is not supported.
    #[error("unsupported sample format: {format}")]
    UnsupportedFormat {
        /// The format that wasn't supported.
        format: String,
    },

    /// A configuration value is out of range.
    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        /// The offending field.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },

    /// No transport was configured before starting.
    #[error("no transport configured - add at least one transport")]
    NoTransportConfigured,

    /// A transport failed during initialization.
    #[error("transport '{transport}' failed to start: {reason}")]
    TransportStartFailed {
        /// Name of the transport that failed.
        transport: String,
        /// Why the transport failed to start.
        reason: String,
    },

    /// An error from the underlying audio library (CPAL).
    #[error("audio backend error: {0}")]
    BackendError(String),
}

impl LiveAudioError {
    /// Creates an invalid configuration error.
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur within a [`Transport`](crate::Transport) implementation.
///
/// Transport errors are recoverable - the capture bridge emits a
/// [`SessionEvent::TransportError`] and retries according to
/// [`SessionConfig`](crate::SessionConfig).
///
/// [`SessionEvent::TransportError`]: crate::SessionEvent::TransportError
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// A send operation failed.
    #[error("send failed: {reason}")]
    SendFailed {
        /// Description of what went wrong.
        reason: String,
    },

    /// The receiving channel was closed.
    #[error("channel closed")]
    ChannelClosed,

    /// A received audio payload could not be decoded.
    #[error("invalid payload: {reason}")]
    InvalidPayload {
        /// Why decoding failed.
        reason: String,
    },

    /// Custom error for user-implemented transports.
    #[error("{0}")]
    Custom(String),
}

impl TransportError {
    /// Creates a custom transport error with the given message.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }

    /// Creates a send failed error with the given reason.
    pub fn send_failed(reason: impl Into<String>) -> Self {
        Self::SendFailed {
            reason: reason.into(),
        }
    }

    /// Returns `true` if sending the same chunk again could succeed.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ChannelClosed | Self::InvalidPayload { .. })
    }

    /// Creates an invalid payload error with the given reason.
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }
}
