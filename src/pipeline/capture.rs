//! Capture path: input callback adapter and transport bridge task.
//!
//! ```text
//! input callback ─▶ CaptureInput ─▶ [ PCM16 ring ] ─▶ CaptureBridge ─▶ Router ─▶ transports
//! ```
//!
//! [`CaptureInput`] runs inside the real-time callback. It mixes to mono,
//! converts to the wire rate, chunks through a [`CaptureBuffer`] and
//! pushes whole PCM16 chunks into the ring. The bridge is a tokio task that
//! pulls chunks out, sends them, and turns the callback-side counters into
//! [`SessionEvent`]s.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::event::EventCallback;
use crate::format::{
    downsample_average, f32_to_pcm16_into, mix_to_mono, pcm16_to_f32, resample_linear_into,
};
use crate::pipeline::{CaptureBuffer, ChunkReader, ChunkWriter, PlaybackControl, Router};
use crate::session::SessionState;
use crate::{LiveAudioError, SessionEvent};

/// Initial scratch capacity; covers common device buffer sizes without
/// reallocating in the callback.
const SCRATCH_CAPACITY: usize = 8192;

/// Upper bound on how often the bridge polls the ring.
const MAX_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Log a progress line every this many chunks.
const PROGRESS_LOG_INTERVAL: u64 = 50;

type ChunkHandler = Box<dyn FnMut(&[f32]) + Send>;

/// Format of the audio handed to a [`CaptureInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputFormat {
    /// Sample rate of incoming frames in Hz.
    pub sample_rate: u32,
    /// Interleaved channel count of incoming frames.
    pub channels: u16,
}

/// Feeds microphone frames into the capture pipeline.
///
/// Owned by whatever delivers input frames: the CPAL input callback in
/// device mode, or application code in manual mode (see
/// [`LiveSession::take_capture_input`](crate::LiveSession::take_capture_input)).
/// No method allocates once the scratch buffers have grown to the
/// callback's frame size, and none blocks.
pub struct CaptureInput {
    buffer: CaptureBuffer<ChunkHandler>,
    format: InputFormat,
    target_sample_rate: u32,
    state: Arc<SessionState>,
    interleaved: Vec<f32>,
    mono: Vec<f32>,
    resampled: Vec<f32>,
    flushed: bool,
}

impl CaptureInput {
    /// Creates a capture input writing PCM16 chunks into `producer`.
    pub(crate) fn new(
        mut writer: ChunkWriter,
        format: InputFormat,
        target_sample_rate: u32,
        chunk_size: usize,
        state: Arc<SessionState>,
    ) -> Result<Self, LiveAudioError> {
        let mut pcm = vec![0i16; chunk_size];
        let handler_state = Arc::clone(&state);
        let handler: ChunkHandler = Box::new(move |chunk: &[f32]| {
            let n = f32_to_pcm16_into(chunk, &mut pcm);
            // Whole chunks only: a partial push would shift every later chunk boundary
            let counter = if writer.push_chunk(&pcm[..n]) {
                &handler_state.samples_captured
            } else {
                &handler_state.capture_overflow_samples
            };
            counter.fetch_add(n as u64, Ordering::Relaxed);
        });

        let growth = target_sample_rate.div_ceil(format.sample_rate.max(1)).max(1) as usize;

        Ok(Self {
            buffer: CaptureBuffer::new(chunk_size, handler)?,
            format,
            target_sample_rate,
            state,
            interleaved: Vec::with_capacity(SCRATCH_CAPACITY),
            mono: Vec::with_capacity(SCRATCH_CAPACITY),
            resampled: Vec::with_capacity(SCRATCH_CAPACITY * growth),
            flushed: false,
        })
    }

    /// Pushes interleaved f32 samples in the input format.
    ///
    /// Returns the number of chunks completed by this call.
    pub fn push_interleaved(&mut self, data: &[f32]) -> usize {
        if self.flushed {
            return 0;
        }
        mix_to_mono(data, self.format.channels, &mut self.mono);
        let emitted = self.push_mono_scratch();
        self.check_flush();
        emitted
    }

    /// Pushes interleaved i16 samples in the input format.
    pub fn push_interleaved_i16(&mut self, data: &[i16]) -> usize {
        if self.flushed {
            return 0;
        }
        self.interleaved.clear();
        self.interleaved.extend(data.iter().map(|&s| pcm16_to_f32(s)));
        mix_to_mono(&self.interleaved, self.format.channels, &mut self.mono);
        let emitted = self.push_mono_scratch();
        self.check_flush();
        emitted
    }

    fn push_mono_scratch(&mut self) -> usize {
        let (from, to) = (self.format.sample_rate, self.target_sample_rate);
        if from > to {
            downsample_average(&self.mono, from, to, &mut self.resampled);
        } else {
            // Slow microphones (8kHz headsets) must be stretched to the wire rate
            resample_linear_into(&self.mono, from, to, &mut self.resampled);
        }
        self.buffer.on_input_frame(&self.resampled)
    }

    /// Flushes the buffered remainder as a final short chunk.
    ///
    /// Further input is ignored. Called automatically on the next push
    /// once the session has asked for a flush.
    pub fn finish(&mut self) {
        if self.flushed {
            return;
        }
        self.buffer.drain_partial();
        self.flushed = true;
        self.state.capture_flushed.store(true, Ordering::Release);
    }

    fn check_flush(&mut self) {
        if self.state.flush_requested.load(Ordering::Acquire) {
            self.finish();
        }
    }

    /// Samples waiting for a full chunk.
    pub fn pending(&self) -> usize {
        self.buffer.pending()
    }

    /// Format this input expects.
    pub fn format(&self) -> InputFormat {
        self.format
    }
}

impl Drop for CaptureInput {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Reads chunks from the capture ring and forwards them to the router.
///
/// Also polls the callback-side counters and reports changes as events,
/// since nothing may be reported from inside an audio callback.
pub struct CaptureBridge {
    reader: ChunkReader,
    router: Router,
    state: Arc<SessionState>,
    playback: Option<PlaybackControl>,
    event_callback: Option<EventCallback>,
    poll_interval: Duration,
    last_capture_overflow: u64,
    last_playback_overflow: u64,
    last_underruns: u64,
    last_interrupts: u64,
}

/// Command sent to the bridge task.
#[derive(Debug)]
pub enum BridgeCommand {
    /// Drain remaining audio, stop transports and exit.
    Stop,
}

impl CaptureBridge {
    /// Creates a new capture bridge.
    pub fn new(
        reader: ChunkReader,
        router: Router,
        state: Arc<SessionState>,
        playback: Option<PlaybackControl>,
        event_callback: Option<EventCallback>,
        chunk_duration: Duration,
    ) -> Self {
        // Poll at half the chunk duration for responsiveness
        let poll_interval = (chunk_duration / 2).clamp(Duration::from_millis(1), MAX_POLL_INTERVAL);

        tracing::info!(
            ?chunk_duration,
            ?poll_interval,
            playback = playback.is_some(),
            "capture bridge starting"
        );

        Self {
            reader,
            router,
            state,
            playback,
            event_callback,
            poll_interval,
            last_capture_overflow: 0,
            last_playback_overflow: 0,
            last_underruns: 0,
            last_interrupts: 0,
        }
    }

    /// Runs the bridge until a stop command arrives or the command channel
    /// closes, then drains the ring and stops transports.
    pub async fn run(mut self, mut cmd_rx: mpsc::Receiver<BridgeCommand>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.forward_ready_chunks().await;
                    self.poll_counters();
                }
                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(BridgeCommand::Stop) | None => break,
                    }
                }
            }
        }

        self.drain_remaining().await;
        self.poll_counters();
        self.router.stop_transports().await;
        tracing::info!(
            chunks = self.state.chunks_sent.load(Ordering::Relaxed),
            open_transports = self.router.open_transports(),
            "capture bridge stopped"
        );
    }

    async fn forward_ready_chunks(&mut self) {
        while let Some(chunk) = self.reader.try_read_chunk() {
            self.router.send_chunk(&chunk).await;
            self.record_sent(chunk.sequence, chunk.len());
        }
    }

    async fn drain_remaining(&mut self) {
        for chunk in self.reader.drain() {
            self.router.send_chunk(&chunk).await;
            self.record_sent(chunk.sequence, chunk.len());
        }
    }

    fn record_sent(&self, sequence: u64, len: usize) {
        let sent = self.state.chunks_sent.fetch_add(1, Ordering::Relaxed);
        if sent % PROGRESS_LOG_INTERVAL == 0 {
            tracing::debug!(sequence, samples = len, "sent capture chunk");
        }
    }

    /// Turns counter deltas into events.
    fn poll_counters(&mut self) {
        let capture_overflow = self.state.capture_overflow_samples.load(Ordering::Relaxed);
        if capture_overflow > self.last_capture_overflow {
            let dropped_samples = capture_overflow - self.last_capture_overflow;
            tracing::warn!(dropped_samples, "capture ring full, chunks dropped");
            self.emit_event(SessionEvent::CaptureOverflow { dropped_samples });
            self.last_capture_overflow = capture_overflow;
        }

        let Some(stats) = self.playback.as_ref().map(PlaybackControl::stats) else {
            return;
        };

        if stats.overflowed_samples > self.last_playback_overflow {
            let dropped_samples = stats.overflowed_samples - self.last_playback_overflow;
            tracing::warn!(dropped_samples, "playback queue full, audio rejected");
            self.emit_event(SessionEvent::PlaybackOverflow { dropped_samples });
            self.last_playback_overflow = stats.overflowed_samples;
        }
        if stats.underruns > self.last_underruns {
            tracing::debug!(total = stats.underruns, "playback underrun");
            self.emit_event(SessionEvent::PlaybackUnderrun {
                total: stats.underruns,
            });
            self.last_underruns = stats.underruns;
        }
        if stats.interrupts > self.last_interrupts {
            self.emit_event(SessionEvent::PlaybackInterrupted);
            self.last_interrupts = stats.interrupts;
        }
    }

    fn emit_event(&self, event: SessionEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }
}
