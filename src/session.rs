//! Live audio session management.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::output::PlaybackStream;
use crate::pipeline::{
    BridgeCommand, CaptureInput, PlaybackConsumer, PlaybackControl, PlaybackHandle, PlaybackStats,
};
use crate::source::CaptureStream;
use crate::LiveAudioError;

/// How long `stop()` waits for the capture side to flush its last partial chunk.
const FLUSH_TIMEOUT: Duration = Duration::from_millis(100);

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Statistics about a live session.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Capture chunks handed to the transports.
    pub chunks_sent: u64,
    /// Samples captured at the wire rate and queued for sending.
    pub samples_captured: u64,
    /// Samples dropped because the capture ring was full.
    pub capture_overflow_samples: u64,
    /// Playback counters. All zero when playback is disabled.
    pub playback: PlaybackStats,
}

/// Internal state shared between the session, the capture input and the
/// bridge task.
pub(crate) struct SessionState {
    pub running: AtomicBool,
    pub chunks_sent: AtomicU64,
    pub samples_captured: AtomicU64,
    pub capture_overflow_samples: AtomicU64,
    /// Set by the session to ask the capture input to emit its partial chunk.
    pub flush_requested: AtomicBool,
    /// Set by the capture input once the partial chunk is in the ring.
    pub capture_flushed: AtomicBool,
}

impl SessionState {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            chunks_sent: AtomicU64::new(0),
            samples_captured: AtomicU64::new(0),
            capture_overflow_samples: AtomicU64::new(0),
            flush_requested: AtomicBool::new(false),
            capture_flushed: AtomicBool::new(false),
        }
    }
}

/// The pieces a [`LiveSession`] owns, assembled by the builder.
pub(crate) struct SessionParts {
    pub state: Arc<SessionState>,
    pub cmd_tx: mpsc::Sender<BridgeCommand>,
    pub bridge_handle: JoinHandle<()>,
    pub capture_stream: Option<CaptureStream>,
    pub capture_input: Option<CaptureInput>,
    pub playback_stream: Option<PlaybackStream>,
    pub playback_handle: Option<PlaybackHandle>,
    pub playback_consumer: Option<PlaybackConsumer>,
    pub playback_control: Option<PlaybackControl>,
}

/// Handle to a running live audio session.
///
/// Returned by [`LiveAudioBuilder::start()`]. Capture and playback run in
/// the background until [`stop()`](LiveSession::stop) is called or the
/// session is dropped.
///
/// Depending on how the session was built, some endpoints are handed to
/// the application instead of an audio device:
///
/// - [`take_capture_input()`](LiveSession::take_capture_input) for manual capture
/// - [`take_playback_handle()`](LiveSession::take_playback_handle) to feed
///   received audio (always available when playback is enabled)
/// - [`take_playback_consumer()`](LiveSession::take_playback_consumer) for
///   manual rendering
///
/// # Lifecycle
///
/// 1. Created by [`LiveAudioBuilder::start()`]
/// 2. Audio flows in the background
/// 3. Call [`stop()`](LiveSession::stop) for graceful shutdown, which sends
///    the trailing partial capture chunk
/// 4. Dropping the session also stops it (but prefer explicit `stop()`)
///
/// [`LiveAudioBuilder::start()`]: crate::LiveAudioBuilder::start
pub struct LiveSession {
    state: Arc<SessionState>,
    cmd_tx: mpsc::Sender<BridgeCommand>,
    bridge_handle: Option<JoinHandle<()>>,
    // Keep the streams alive - dropping them stops CPAL
    capture_stream: Option<CaptureStream>,
    playback_stream: Option<PlaybackStream>,
    capture_input: Option<CaptureInput>,
    playback_handle: Option<PlaybackHandle>,
    playback_consumer: Option<PlaybackConsumer>,
    playback_control: Option<PlaybackControl>,
}

impl LiveSession {
    pub(crate) fn new(parts: SessionParts) -> Self {
        Self {
            state: parts.state,
            cmd_tx: parts.cmd_tx,
            bridge_handle: Some(parts.bridge_handle),
            capture_stream: parts.capture_stream,
            playback_stream: parts.playback_stream,
            capture_input: parts.capture_input,
            playback_handle: parts.playback_handle,
            playback_consumer: parts.playback_consumer,
            playback_control: parts.playback_control,
        }
    }

    /// Returns `true` if the session is still running.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Returns current session statistics.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            chunks_sent: self.state.chunks_sent.load(Ordering::Relaxed),
            samples_captured: self.state.samples_captured.load(Ordering::Relaxed),
            capture_overflow_samples: self.state.capture_overflow_samples.load(Ordering::Relaxed),
            playback: self
                .playback_control
                .as_ref()
                .map(PlaybackControl::stats)
                .unwrap_or_default(),
        }
    }

    /// Takes the capture input of a session built with
    /// [`CaptureSource::Manual`](crate::CaptureSource::Manual).
    ///
    /// Returns `None` for device capture or if already taken.
    pub fn take_capture_input(&mut self) -> Option<CaptureInput> {
        self.capture_input.take()
    }

    /// Takes the handle used to queue received audio for playback.
    ///
    /// Returns `None` if playback is disabled or the handle was already taken.
    pub fn take_playback_handle(&mut self) -> Option<PlaybackHandle> {
        self.playback_handle.take()
    }

    /// Takes the render side of a session built with
    /// [`PlaybackTarget::Manual`](crate::PlaybackTarget::Manual).
    pub fn take_playback_consumer(&mut self) -> Option<PlaybackConsumer> {
        self.playback_consumer.take()
    }

    /// Returns a control handle for the playback queue, if playback is enabled.
    pub fn playback_control(&self) -> Option<PlaybackControl> {
        self.playback_control.clone()
    }

    /// Discards all queued playback audio.
    pub fn interrupt(&self) {
        if let Some(control) = &self.playback_control {
            control.interrupt();
        }
    }

    /// Sets the playback gain, clamped to [0.0, 1.0].
    pub fn set_volume(&self, volume: f32) {
        if let Some(control) = &self.playback_control {
            control.set_volume(volume);
        }
    }

    /// Gracefully stops the session.
    ///
    /// This will:
    /// 1. Flush the buffered partial capture chunk into the ring
    /// 2. Stop the CPAL streams
    /// 3. Send all remaining captured audio to the transports
    /// 4. Call `on_stop()` on all transports
    /// 5. Wait for the bridge task to complete
    ///
    /// A [`CaptureInput`] taken by the application flushes when it is
    /// dropped or on its next push; audio it has not flushed within a short
    /// grace period is not sent.
    ///
    /// # Errors
    ///
    /// Returns an error if the bridge task panicked.
    pub async fn stop(mut self) -> Result<(), LiveAudioError> {
        self.stop_internal().await
    }

    async fn stop_internal(&mut self) -> Result<(), LiveAudioError> {
        if !self.state.running.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        self.state.flush_requested.store(true, Ordering::Release);
        // Dropping the input (directly or inside the stream callback) flushes it
        self.capture_input.take();
        self.capture_stream.take();
        self.playback_stream.take();

        let deadline = tokio::time::Instant::now() + FLUSH_TIMEOUT;
        while !self.state.capture_flushed.load(Ordering::Acquire) {
            if tokio::time::Instant::now() >= deadline {
                tracing::debug!("capture input did not flush before stop");
                break;
            }
            tokio::time::sleep(FLUSH_POLL_INTERVAL).await;
        }

        let _ = self.cmd_tx.send(BridgeCommand::Stop).await;

        if let Some(handle) = self.bridge_handle.take() {
            handle
                .await
                .map_err(|e| LiveAudioError::BackendError(format!("bridge task failed: {e}")))?;
        }

        tracing::info!(
            chunks_sent = self.state.chunks_sent.load(Ordering::Relaxed),
            "live session stopped"
        );
        Ok(())
    }
}

impl Drop for LiveSession {
    fn drop(&mut self) {
        if self.state.running.load(Ordering::SeqCst) {
            // Dropped without explicit stop() - trigger background cleanup
            self.state.running.store(false, Ordering::SeqCst);
            self.state.flush_requested.store(true, Ordering::Release);
            let _ = self.cmd_tx.try_send(BridgeCommand::Stop);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_new() {
        let state = SessionState::new();
        assert!(state.running.load(Ordering::SeqCst));
        assert_eq!(state.chunks_sent.load(Ordering::SeqCst), 0);
        assert!(!state.flush_requested.load(Ordering::SeqCst));
        assert!(!state.capture_flushed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_session_stats_default() {
        let stats = SessionStats::default();
        assert_eq!(stats.chunks_sent, 0);
        assert_eq!(stats.samples_captured, 0);
        assert_eq!(stats.capture_overflow_samples, 0);
        assert_eq!(stats.playback, PlaybackStats::default());
    }
}
