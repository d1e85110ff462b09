//! Jitter-tolerant playback queue between the network and the output callback.
//!
//! ```text
//! network task ──on_chunk_received──▶ [ SPSC ring ] ──render_into──▶ output callback
//!                                          ▲
//!                     PlaybackControl ─────┘ interrupt / volume / stats
//! ```
//!
//! The producer half is the only writer and the consumer half the only
//! reader, so the ring needs no lock. Appends that do not fit are rejected
//! whole and drains remove whole frames (or the whole short remainder), so
//! the queue length only moves by complete operations.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;

use crate::config::UnderrunPolicy;
use crate::LiveAudioError;

/// Counters shared between both halves and any [`PlaybackControl`].
struct PlaybackShared {
    policy: UnderrunPolicy,
    capacity: usize,
    /// Gain as `f32` bits.
    volume: AtomicU32,
    /// Samples ever accepted by the producer.
    pushed: AtomicU64,
    /// Samples ever removed by the consumer (rendered or discarded).
    popped: AtomicU64,
    /// Everything pushed before this mark is discarded on the next render.
    interrupt_mark: AtomicU64,
    interrupts: AtomicU64,
    rendered: AtomicU64,
    underruns: AtomicU64,
    overflowed: AtomicU64,
}

impl PlaybackShared {
    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }
}

/// Snapshot of playback buffer counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackStats {
    /// Samples currently queued.
    pub queued_samples: u64,
    /// Real samples delivered to the output (excludes silence padding).
    pub rendered_samples: u64,
    /// Starvation episodes: renders that came up short while audio was playing.
    pub underruns: u64,
    /// Samples rejected because the queue was full.
    pub overflowed_samples: u64,
    /// Number of interrupts requested.
    pub interrupts: u64,
}

/// Result of a single render request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOutcome {
    /// Queued samples written to the front of the frame.
    pub delivered: usize,
    /// Zeros written after them.
    pub padded: usize,
}

impl RenderOutcome {
    /// Returns `true` if the frame was not filled with real audio.
    pub fn is_underrun(&self) -> bool {
        self.padded > 0
    }
}

/// Creates a playback buffer holding up to `capacity` samples.
///
/// Returns the producer (for the network receive path), the consumer (for
/// the output callback) and a cloneable control handle.
///
/// # Errors
///
/// Returns [`LiveAudioError::InvalidConfig`] if `capacity` is zero or
/// `volume` is outside [0.0, 1.0].
pub fn playback_buffer(
    capacity: usize,
    policy: UnderrunPolicy,
    volume: f32,
) -> Result<(PlaybackProducer, PlaybackConsumer, PlaybackControl), LiveAudioError> {
    if capacity == 0 {
        return Err(LiveAudioError::invalid_config(
            "playback_buffer_duration",
            "must hold at least one sample",
        ));
    }
    if !(0.0..=1.0).contains(&volume) {
        return Err(LiveAudioError::invalid_config(
            "initial_volume",
            format!("{volume} is outside [0.0, 1.0]"),
        ));
    }

    let shared = Arc::new(PlaybackShared {
        policy,
        capacity,
        volume: AtomicU32::new(volume.to_bits()),
        pushed: AtomicU64::new(0),
        popped: AtomicU64::new(0),
        interrupt_mark: AtomicU64::new(0),
        interrupts: AtomicU64::new(0),
        rendered: AtomicU64::new(0),
        underruns: AtomicU64::new(0),
        overflowed: AtomicU64::new(0),
    });

    let (producer, consumer) = HeapRb::<f32>::new(capacity).split();

    Ok((
        PlaybackProducer {
            producer,
            shared: Arc::clone(&shared),
        },
        PlaybackConsumer {
            consumer,
            shared: Arc::clone(&shared),
            was_playing: false,
            starved: false,
        },
        PlaybackControl { shared },
    ))
}

/// Writer half of the playback buffer. Owned by the network receive path.
pub struct PlaybackProducer {
    producer: ringbuf::HeapProd<f32>,
    shared: Arc<PlaybackShared>,
}

impl PlaybackProducer {
    /// Appends a decoded chunk to the tail of the queue.
    ///
    /// Never blocks. If the chunk does not fit in the free space it is
    /// rejected whole, counted as overflow, and `false` is returned.
    pub fn on_chunk_received(&mut self, chunk: &[f32]) -> bool {
        if chunk.is_empty() {
            return true;
        }
        if self.producer.vacant_len() < chunk.len() {
            self.shared
                .overflowed
                .fetch_add(chunk.len() as u64, Ordering::Relaxed);
            return false;
        }

        let pushed = self.producer.push_slice(chunk);
        debug_assert_eq!(pushed, chunk.len());
        self.shared
            .pushed
            .fetch_add(pushed as u64, Ordering::Release);
        true
    }

    /// Free space in samples.
    pub fn vacant(&self) -> usize {
        self.producer.vacant_len()
    }

    /// Samples currently queued.
    pub fn queued(&self) -> usize {
        self.producer.occupied_len()
    }

    /// Returns a control handle for this buffer.
    pub fn control(&self) -> PlaybackControl {
        PlaybackControl {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// Reader half of the playback buffer. Owned by the output callback.
pub struct PlaybackConsumer {
    consumer: ringbuf::HeapCons<f32>,
    shared: Arc<PlaybackShared>,
    was_playing: bool,
    /// Set while a starvation episode is in progress.
    starved: bool,
}

impl PlaybackConsumer {
    /// Fills `frame` from the queue without allocating.
    ///
    /// With at least `frame.len()` samples queued, the first `frame.len()`
    /// are removed in FIFO order. Otherwise the frame is completed with
    /// silence according to the [`UnderrunPolicy`]. Never blocks.
    pub fn render_into(&mut self, frame: &mut [f32]) -> RenderOutcome {
        self.apply_interrupt();

        let wanted = frame.len();
        let available = self.consumer.occupied_len();

        let delivered = if available >= wanted {
            self.consumer.pop_slice(frame)
        } else {
            match self.shared.policy {
                UnderrunPolicy::PadWithSilence => self.consumer.pop_slice(&mut frame[..available]),
                UnderrunPolicy::HoldForFullFrame => 0,
            }
        };
        frame[delivered..].fill(0.0);

        let gain = self.shared.volume();
        if gain < 1.0 {
            for sample in &mut frame[..delivered] {
                *sample *= gain;
            }
        }

        let short = delivered < wanted;
        if short && (available > 0 || self.was_playing) {
            if !self.starved {
                self.shared.underruns.fetch_add(1, Ordering::Relaxed);
            }
            self.starved = true;
        } else if !short && wanted > 0 {
            self.starved = false;
        }
        self.was_playing = wanted > 0 && !short;

        self.shared
            .popped
            .fetch_add(delivered as u64, Ordering::Release);
        self.shared
            .rendered
            .fetch_add(delivered as u64, Ordering::Relaxed);

        RenderOutcome {
            delivered,
            padded: wanted - delivered,
        }
    }

    /// Returns a frame of `frame_size` samples.
    ///
    /// Allocating convenience over [`render_into`](Self::render_into); the
    /// output callback should use `render_into` with its own buffer.
    pub fn on_render_request(&mut self, frame_size: usize) -> Vec<f32> {
        let mut frame = vec![0.0; frame_size];
        self.render_into(&mut frame);
        frame
    }

    /// Samples currently queued.
    pub fn queued(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Discards everything pushed before the latest interrupt mark.
    fn apply_interrupt(&mut self) {
        let mark = self.shared.interrupt_mark.load(Ordering::Acquire);
        let popped = self.shared.popped.load(Ordering::Relaxed);
        if mark <= popped {
            return;
        }
        let stale = usize::try_from(mark - popped).unwrap_or(usize::MAX);
        let skipped = self.consumer.skip(stale.min(self.consumer.occupied_len()));
        self.shared
            .popped
            .fetch_add(skipped as u64, Ordering::Release);
        self.was_playing = false;
        self.starved = false;
    }
}

/// Cloneable handle for controlling a playback buffer from any thread.
#[derive(Clone)]
pub struct PlaybackControl {
    shared: Arc<PlaybackShared>,
}

impl PlaybackControl {
    /// Discards all audio queued so far.
    ///
    /// The consumer performs the discard at the start of its next render,
    /// keeping the ring single-consumer. Audio pushed after this call is
    /// kept.
    pub fn interrupt(&self) {
        let pushed = self.shared.pushed.load(Ordering::Acquire);
        self.shared
            .interrupt_mark
            .fetch_max(pushed, Ordering::Release);
        self.shared.interrupts.fetch_add(1, Ordering::Relaxed);
    }

    /// Sets the output gain, clamped to [0.0, 1.0]. NaN is treated as 0.
    pub fn set_volume(&self, volume: f32) {
        let volume = if volume.is_nan() {
            0.0
        } else {
            volume.clamp(0.0, 1.0)
        };
        self.shared
            .volume
            .store(volume.to_bits(), Ordering::Relaxed);
    }

    /// Current output gain.
    pub fn volume(&self) -> f32 {
        self.shared.volume()
    }

    /// Under-run policy the buffer was created with.
    pub fn policy(&self) -> UnderrunPolicy {
        self.shared.policy
    }

    /// Queue capacity in samples.
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> PlaybackStats {
        let pushed = self.shared.pushed.load(Ordering::Acquire);
        let popped = self.shared.popped.load(Ordering::Acquire);
        PlaybackStats {
            queued_samples: pushed.saturating_sub(popped),
            rendered_samples: self.shared.rendered.load(Ordering::Relaxed),
            underruns: self.shared.underruns.load(Ordering::Relaxed),
            overflowed_samples: self.shared.overflowed.load(Ordering::Relaxed),
            interrupts: self.shared.interrupts.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for PlaybackControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackControl")
            .field("policy", &self.shared.policy)
            .field("capacity", &self.shared.capacity)
            .field("volume", &self.shared.volume())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32 / 100_000.0).collect()
    }

    fn buffer(
        capacity: usize,
        policy: UnderrunPolicy,
    ) -> (PlaybackProducer, PlaybackConsumer, PlaybackControl) {
        playback_buffer(capacity, policy, 1.0).unwrap()
    }

    #[test]
    fn test_invalid_construction() {
        assert!(playback_buffer(0, UnderrunPolicy::default(), 1.0).is_err());
        assert!(playback_buffer(16, UnderrunPolicy::default(), -0.1).is_err());
    }

    #[test]
    fn test_full_frame_fifo() {
        let (mut tx, mut rx, _) = buffer(1024, UnderrunPolicy::PadWithSilence);
        assert!(tx.on_chunk_received(&ramp(0, 300)));

        let frame = rx.on_render_request(256);
        assert_eq!(frame, ramp(0, 256));
        assert_eq!(rx.queued(), 44);

        let mut rest = [0.0f32; 44];
        let outcome = rx.render_into(&mut rest);
        assert_eq!(outcome.delivered, 44);
        assert!(!outcome.is_underrun());
        assert_eq!(rest.to_vec(), ramp(256, 44));
    }

    #[test]
    fn test_underrun_pads_with_silence() {
        let (mut tx, mut rx, control) = buffer(1024, UnderrunPolicy::PadWithSilence);
        tx.on_chunk_received(&vec![0.5; 100]);

        let mut frame = [1.0f32; 256];
        let outcome = rx.render_into(&mut frame);

        assert_eq!(outcome, RenderOutcome { delivered: 100, padded: 156 });
        assert!(frame[..100].iter().all(|&s| s == 0.5));
        assert!(frame[100..].iter().all(|&s| s == 0.0));
        assert_eq!(rx.queued(), 0);
        assert_eq!(control.stats().underruns, 1);
    }

    #[test]
    fn test_empty_queue_is_silence_without_counting_idle_frames() {
        let (_tx, mut rx, control) = buffer(64, UnderrunPolicy::PadWithSilence);
        for _ in 0..10 {
            let frame = rx.on_render_request(32);
            assert!(frame.iter().all(|&s| s == 0.0));
        }
        assert_eq!(control.stats().underruns, 0);
    }

    #[test]
    fn test_underrun_counted_once_per_episode() {
        let (mut tx, mut rx, control) = buffer(1024, UnderrunPolicy::PadWithSilence);
        tx.on_chunk_received(&vec![0.1; 64]);
        rx.on_render_request(32);
        rx.on_render_request(32);
        // Starved from here on
        rx.on_render_request(32);
        rx.on_render_request(32);
        assert_eq!(control.stats().underruns, 1);
    }

    #[test]
    fn test_hold_for_full_frame_keeps_short_queue() {
        let (mut tx, mut rx, _) = buffer(1024, UnderrunPolicy::HoldForFullFrame);
        tx.on_chunk_received(&ramp(0, 100));

        let mut frame = [1.0f32; 256];
        let outcome = rx.render_into(&mut frame);
        assert_eq!(outcome.delivered, 0);
        assert!(frame.iter().all(|&s| s == 0.0));
        assert_eq!(rx.queued(), 100);

        tx.on_chunk_received(&ramp(100, 156));
        assert_eq!(rx.on_render_request(256), ramp(0, 256));
    }

    #[test]
    fn test_overflow_rejects_whole_chunk() {
        let (mut tx, mut rx, control) = buffer(100, UnderrunPolicy::PadWithSilence);
        assert!(tx.on_chunk_received(&ramp(0, 80)));
        assert!(!tx.on_chunk_received(&ramp(80, 30)));
        assert_eq!(tx.queued(), 80);
        assert_eq!(control.stats().overflowed_samples, 30);

        assert!(tx.on_chunk_received(&ramp(80, 20)));
        assert_eq!(rx.on_render_request(100), ramp(0, 100));
    }

    #[test]
    fn test_fifo_across_irregular_chunks_and_frames() {
        let (mut tx, mut rx, _) = buffer(4096, UnderrunPolicy::PadWithSilence);
        let mut out = Vec::new();
        let mut fed = 0;
        let mut seed: u32 = 99;
        for _ in 0..200 {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let len = (seed >> 16) as usize % 300;
            tx.on_chunk_received(&ramp(fed, len));
            fed += len;
            while rx.queued() >= 128 {
                out.extend(rx.on_render_request(128));
            }
        }
        let tail = rx.queued();
        let mut last = vec![0.0; tail];
        rx.render_into(&mut last);
        out.extend(last);

        assert_eq!(out, ramp(0, fed));
    }

    #[test]
    fn test_interrupt_discards_queued_audio() {
        let (mut tx, mut rx, control) = buffer(1024, UnderrunPolicy::PadWithSilence);
        tx.on_chunk_received(&vec![0.9; 500]);
        control.interrupt();
        // Audio for the next turn arrives before the consumer runs
        tx.on_chunk_received(&ramp(0, 64));

        let frame = rx.on_render_request(64);
        assert_eq!(frame, ramp(0, 64));
        assert_eq!(rx.queued(), 0);
        let stats = control.stats();
        assert_eq!(stats.interrupts, 1);
        assert_eq!(stats.queued_samples, 0);
        assert_eq!(stats.rendered_samples, 64);
    }

    #[test]
    fn test_volume_scales_output() {
        let (mut tx, mut rx, control) = buffer(64, UnderrunPolicy::PadWithSilence);
        control.set_volume(0.5);
        tx.on_chunk_received(&[0.8, -0.4]);
        assert_eq!(rx.on_render_request(2), vec![0.4, -0.2]);
    }

    #[test]
    fn test_volume_clamped() {
        let (_tx, _rx, control) = buffer(8, UnderrunPolicy::PadWithSilence);
        control.set_volume(3.0);
        assert_eq!(control.volume(), 1.0);
        control.set_volume(f32::NAN);
        assert_eq!(control.volume(), 0.0);
    }

    #[test]
    fn test_zero_frame_request() {
        let (mut tx, mut rx, _) = buffer(8, UnderrunPolicy::PadWithSilence);
        tx.on_chunk_received(&[0.1]);
        assert!(rx.on_render_request(0).is_empty());
        assert_eq!(rx.queued(), 1);
    }

    #[test]
    fn test_held_trickle_counts_one_underrun() {
        let (mut tx, mut rx, control) = buffer(1024, UnderrunPolicy::HoldForFullFrame);
        tx.on_chunk_received(&ramp(0, 100));
        for _ in 0..5 {
            assert_eq!(rx.render_into(&mut [0.0; 256]).delivered, 0);
        }
        assert_eq!(control.stats().underruns, 1);

        // A full frame ends the episode
        tx.on_chunk_received(&ramp(100, 156));
        assert_eq!(rx.render_into(&mut [0.0; 256]).delivered, 256);
        assert_eq!(control.stats().underruns, 1);

        tx.on_chunk_received(&ramp(256, 10));
        rx.render_into(&mut [0.0; 256]);
        rx.render_into(&mut [0.0; 256]);
        assert_eq!(control.stats().underruns, 2);
    }

    #[test]
    fn test_padded_trickle_counts_one_underrun() {
        let (mut tx, mut rx, control) = buffer(1024, UnderrunPolicy::PadWithSilence);
        tx.on_chunk_received(&ramp(0, 512));
        rx.on_render_request(256);
        for i in 0..4 {
            tx.on_chunk_received(&ramp(512 + i * 50, 50));
            rx.on_render_request(256);
        }
        assert_eq!(control.stats().underruns, 1);
    }

    /// Sample values are their own index, exact in f32 below 2^24.
    fn index_ramp(start: usize, len: usize) -> Vec<f32> {
        (start..start + len).map(|i| i as f32).collect()
    }

    /// Pushes `samples` in LCG-sized pieces, spinning while the queue is full.
    fn push_irregular(tx: &mut PlaybackProducer, samples: &[f32], mut seed: u32) {
        let mut offset = 0;
        while offset < samples.len() {
            seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let len = ((seed >> 16) as usize % 700 + 1).min(samples.len() - offset);
            while !tx.on_chunk_received(&samples[offset..offset + len]) {
                std::thread::yield_now();
            }
            offset += len;
        }
    }

    #[test]
    fn test_concurrent_producer_and_renderer_preserve_order() {
        const TOTAL: usize = 200_000;
        let (mut tx, mut rx, control) = buffer(2048, UnderrunPolicy::PadWithSilence);

        let delivered = std::thread::scope(|scope| {
            scope.spawn(move || push_irregular(&mut tx, &index_ramp(0, TOTAL), 7));

            let renderer = scope.spawn(move || {
                let mut out = Vec::with_capacity(TOTAL);
                let mut frame = [0.0f32; 128];
                while out.len() < TOTAL {
                    let outcome = rx.render_into(&mut frame);
                    assert!(frame[outcome.delivered..].iter().all(|&s| s == 0.0));
                    out.extend_from_slice(&frame[..outcome.delivered]);
                    if outcome.delivered == 0 {
                        std::thread::yield_now();
                    }
                }
                out
            });
            renderer.join().unwrap()
        });

        assert_eq!(delivered, index_ramp(0, TOTAL));
        let stats = control.stats();
        assert_eq!(stats.rendered_samples, TOTAL as u64);
        assert_eq!(stats.queued_samples, 0);
    }

    #[test]
    fn test_interrupt_while_producer_and_renderer_run() {
        use std::sync::atomic::AtomicBool;
        use std::sync::mpsc;

        const FIRST: usize = 30_000;
        const SECOND: usize = 30_000;
        const SECOND_BASE: usize = 1_000_000;

        let (mut tx, mut rx, control) = buffer(65_536, UnderrunPolicy::PadWithSilence);
        let interrupted = AtomicBool::new(false);
        let (first_done_tx, first_done_rx) = mpsc::channel::<()>();
        let (resume_tx, resume_rx) = mpsc::channel::<()>();

        let out = std::thread::scope(|scope| {
            scope.spawn(move || {
                push_irregular(&mut tx, &index_ramp(0, FIRST), 3);
                first_done_tx.send(()).unwrap();
                resume_rx.recv().unwrap();
                push_irregular(&mut tx, &index_ramp(SECOND_BASE, SECOND), 11);
            });

            let flag = &interrupted;
            let renderer = scope.spawn(move || {
                let mut out = Vec::new();
                let mut frame = [0.0f32; 128];
                let mut second_seen = 0;
                while second_seen < SECOND {
                    let seen_interrupt = flag.load(Ordering::SeqCst);
                    let outcome = rx.render_into(&mut frame);
                    let audio = &frame[..outcome.delivered];
                    if seen_interrupt {
                        assert!(audio.iter().all(|&s| s >= SECOND_BASE as f32));
                    }
                    second_seen += audio.iter().filter(|&&s| s >= SECOND_BASE as f32).count();
                    out.extend_from_slice(audio);
                    if outcome.delivered == 0 {
                        std::thread::yield_now();
                    }
                }
                out
            });

            first_done_rx.recv().unwrap();
            control.interrupt();
            interrupted.store(true, Ordering::SeqCst);
            resume_tx.send(()).unwrap();

            renderer.join().unwrap()
        });

        // An unbroken prefix of the first turn, then the whole second turn
        let played_first = out.len() - SECOND;
        assert_eq!(out[..played_first], index_ramp(0, played_first)[..]);
        assert_eq!(out[played_first..], index_ramp(SECOND_BASE, SECOND)[..]);
        assert_eq!(control.stats().interrupts, 1);
    }

    #[test]
    fn test_halves_are_send() {
        fn assert_send<T: Send>() {}
        assert_send::<PlaybackProducer>();
        assert_send::<PlaybackConsumer>();
        assert_send::<PlaybackControl>();
    }
}
