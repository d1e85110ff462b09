//! Fixed-size chunking of microphone frames.

use crate::LiveAudioError;

/// Accumulates input frames and emits uniform chunks to a callback.
///
/// The host delivers one frame per rendering quantum (typically 128 or
/// 480 samples) while the transport wants fixed chunks (4096 samples by
/// default). `CaptureBuffer` bridges the two without reordering, dropping
/// or duplicating a single sample.
///
/// The accumulator is allocated once with exactly `chunk_size` slots and
/// never grows, so [`on_input_frame`](Self::on_input_frame) is safe to call
/// from a real-time audio callback as long as the chunk callback is.
///
/// # Example
///
/// ```
/// use live_audio::CaptureBuffer;
///
/// let mut chunks = Vec::new();
/// let mut buffer = CaptureBuffer::new(4, |chunk: &[f32]| chunks.push(chunk.to_vec())).unwrap();
///
/// assert_eq!(buffer.on_input_frame(&[0.1, 0.2, 0.3]), 0);
/// assert_eq!(buffer.on_input_frame(&[0.4, 0.5]), 1);
/// assert_eq!(buffer.pending(), 1);
/// drop(buffer);
///
/// assert_eq!(chunks, vec![vec![0.1, 0.2, 0.3, 0.4]]);
/// ```
pub struct CaptureBuffer<F>
where
    F: FnMut(&[f32]),
{
    accumulator: Vec<f32>,
    chunk_size: usize,
    on_chunk: F,
    chunks_emitted: u64,
}

impl<F> CaptureBuffer<F>
where
    F: FnMut(&[f32]),
{
    /// Creates a capture buffer that hands every `chunk_size` samples to
    /// `on_chunk`.
    ///
    /// # Errors
    ///
    /// Returns [`LiveAudioError::InvalidConfig`] if `chunk_size` is zero.
    pub fn new(chunk_size: usize, on_chunk: F) -> Result<Self, LiveAudioError> {
        if chunk_size == 0 {
            return Err(LiveAudioError::invalid_config(
                "capture_chunk_size",
                "must be non-zero",
            ));
        }
        Ok(Self {
            accumulator: Vec::with_capacity(chunk_size),
            chunk_size,
            on_chunk,
            chunks_emitted: 0,
        })
    }

    /// Appends one input frame, emitting every chunk it completes.
    ///
    /// Returns the number of chunks emitted by this call. A frame shorter
    /// than the remaining space only accumulates; a frame longer than a
    /// chunk may emit several chunks. On return fewer than `chunk_size`
    /// samples remain buffered.
    pub fn on_input_frame(&mut self, frame: &[f32]) -> usize {
        let mut emitted = 0;
        let mut rest = frame;

        while !rest.is_empty() {
            if self.accumulator.is_empty() && rest.len() >= self.chunk_size {
                // Aligned: emit straight from the input, no copy
                let (chunk, tail) = rest.split_at(self.chunk_size);
                (self.on_chunk)(chunk);
                emitted += 1;
                rest = tail;
                continue;
            }

            let space = self.chunk_size - self.accumulator.len();
            let take = space.min(rest.len());
            self.accumulator.extend_from_slice(&rest[..take]);
            rest = &rest[take..];

            if self.accumulator.len() == self.chunk_size {
                (self.on_chunk)(&self.accumulator);
                self.accumulator.clear();
                emitted += 1;
            }
        }

        self.chunks_emitted += emitted as u64;
        emitted
    }

    /// Hands the buffered remainder to the callback as a short final chunk.
    ///
    /// Used at session teardown so the tail of an utterance is not lost.
    /// Returns `false` if nothing was buffered.
    pub fn drain_partial(&mut self) -> bool {
        if self.accumulator.is_empty() {
            return false;
        }
        (self.on_chunk)(&self.accumulator);
        self.accumulator.clear();
        self.chunks_emitted += 1;
        true
    }

    /// Discards the buffered remainder without emitting it.
    pub fn reset(&mut self) {
        self.accumulator.clear();
    }

    /// Number of samples waiting for a full chunk.
    pub fn pending(&self) -> usize {
        self.accumulator.len()
    }

    /// The configured chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Total chunks emitted, including partial chunks from
    /// [`drain_partial`](Self::drain_partial).
    pub fn chunks_emitted(&self) -> u64 {
        self.chunks_emitted
    }
}

impl<F> std::fmt::Debug for CaptureBuffer<F>
where
    F: FnMut(&[f32]),
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureBuffer")
            .field("chunk_size", &self.chunk_size)
            .field("pending", &self.accumulator.len())
            .field("chunks_emitted", &self.chunks_emitted)
            .finish_non_exhaustive()
    }
}
