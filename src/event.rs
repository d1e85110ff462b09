//! Runtime events for monitoring session health.
//!
//! Events are non-fatal notifications. The session keeps running after
//! any of them; they exist for logging and metrics.

use std::sync::Arc;

/// Runtime events emitted during a live audio session.
///
/// Events are raised from the bridge task, never from inside an audio
/// callback; counters updated by the callbacks are polled and turned into
/// events there.
///
/// # Example
///
/// ```
/// use live_audio::SessionEvent;
///
/// fn handle_event(event: SessionEvent) {
///     match event {
///         SessionEvent::CaptureOverflow { dropped_samples } => {
///             eprintln!("capture dropped {dropped_samples} samples");
///         }
///         SessionEvent::PlaybackOverflow { dropped_samples } => {
///             eprintln!("playback rejected {dropped_samples} samples");
///         }
///         SessionEvent::PlaybackUnderrun { total } => {
///             eprintln!("playback starved ({total} so far)");
///         }
///         SessionEvent::PlaybackInterrupted => eprintln!("playback interrupted"),
///         SessionEvent::TransportError { transport, error } => {
///             eprintln!("transport '{transport}' error: {error}");
///         }
///         SessionEvent::StreamError { reason } => eprintln!("stream error: {reason}"),
///     }
/// }
/// ```
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The capture ring was full and whole chunks were dropped.
    ///
    /// Happens when transports are slower than real time for longer than
    /// `capture_buffer_duration`.
    CaptureOverflow {
        /// Samples dropped since the previous event.
        dropped_samples: u64,
    },

    /// Received audio did not fit in the playback queue and was rejected.
    PlaybackOverflow {
        /// Samples rejected since the previous event.
        dropped_samples: u64,
    },

    /// The output callback ran out of queued audio mid-playback.
    PlaybackUnderrun {
        /// Total starvation episodes so far in this session.
        total: u64,
    },

    /// Queued playback audio was discarded by an interrupt.
    PlaybackInterrupted,

    /// A transport failed to send a chunk.
    ///
    /// The bridge retries according to [`SessionConfig`](crate::SessionConfig);
    /// after the last attempt the chunk is dropped.
    TransportError {
        /// Name of the transport that errored.
        transport: String,
        /// Description of the error.
        error: String,
    },

    /// The audio backend reported an error on a running stream.
    StreamError {
        /// Description from the backend.
        reason: String,
    },
}

/// Callback type for receiving runtime events.
///
/// Register one via [`LiveAudioBuilder::on_event()`].
///
/// [`LiveAudioBuilder::on_event()`]: crate::LiveAudioBuilder::on_event
pub type EventCallback = Arc<dyn Fn(SessionEvent) + Send + Sync>;

/// Creates an [`EventCallback`] from a closure.
///
/// # Example
///
/// ```
/// use live_audio::{event_callback, SessionEvent};
///
/// let callback = event_callback(|event| {
///     println!("Got event: {:?}", event);
/// });
/// callback(SessionEvent::PlaybackInterrupted);
/// ```
pub fn event_callback<F>(f: F) -> EventCallback
where
    F: Fn(SessionEvent) + Send + Sync + 'static,
{
    Arc::new(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_event_debug() {
        let event = SessionEvent::CaptureOverflow {
            dropped_samples: 4096,
        };
        let debug = format!("{event:?}");
        assert!(debug.contains("CaptureOverflow"));
        assert!(debug.contains("4096"));
    }

    #[test]
    fn test_event_callback_helper() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let called = Arc::new(AtomicBool::new(false));
        let called_clone = called.clone();

        let callback = event_callback(move |_| {
            called_clone.store(true, Ordering::SeqCst);
        });

        callback(SessionEvent::PlaybackInterrupted);
        assert!(called.load(Ordering::SeqCst));
    }
}
