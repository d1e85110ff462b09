//! Capture ring between the input callback and the transport bridge.
//!
//! Chunks rejected on overflow never enter the ring. The writer records
//! where each run of dropped audio sat in a small side ring, so the reader
//! can keep timestamps anchored to the start of the session.

use ringbuf::traits::{Consumer, Observer, Producer, Split};
use ringbuf::HeapRb;
use std::time::Duration;

use crate::EncodedChunk;

/// Samples from ring position `at` onward follow `dropped_total` samples
/// that were rejected before reaching the ring.
#[derive(Debug, Clone, Copy)]
struct Gap {
    at: u64,
    dropped_total: u64,
}

/// Writes whole PCM16 chunks into the capture ring. Owned by the input callback.
pub struct ChunkWriter {
    producer: ringbuf::HeapProd<i16>,
    gaps: ringbuf::HeapProd<Gap>,
    written: u64,
    dropped: u64,
    announced: u64,
}

impl ChunkWriter {
    /// Pushes `chunk` if it fits entirely; otherwise drops it and returns `false`.
    ///
    /// Never blocks or allocates.
    pub fn push_chunk(&mut self, chunk: &[i16]) -> bool {
        if self.producer.vacant_len() < chunk.len() {
            self.dropped += chunk.len() as u64;
            return false;
        }
        if self.dropped != self.announced {
            let gap = Gap {
                at: self.written,
                dropped_total: self.dropped,
            };
            // A full side ring only delays the correction to a later chunk
            if self.gaps.try_push(gap).is_ok() {
                self.announced = self.dropped;
            }
        }
        let pushed = self.producer.push_slice(chunk);
        self.written += pushed as u64;
        true
    }

    /// Free space in samples.
    pub fn vacant(&self) -> usize {
        self.producer.vacant_len()
    }
}

/// Reads fixed-size [`EncodedChunk`]s from the capture ring.
///
/// The input callback pushes whole PCM16 chunks; this side slices them
/// back out, numbering and timestamping each one. Timestamps count dropped
/// audio too, so they stay offsets from the start of the session.
pub struct ChunkReader {
    consumer: ringbuf::HeapCons<i16>,
    gaps: ringbuf::HeapCons<Gap>,
    sample_rate: u32,
    chunk_size: usize,
    samples_read: u64,
    dropped: u64,
    sequence: u64,
}

impl ChunkReader {
    fn new(
        consumer: ringbuf::HeapCons<i16>,
        gaps: ringbuf::HeapCons<Gap>,
        sample_rate: u32,
        chunk_size: usize,
    ) -> Self {
        Self {
            consumer,
            gaps,
            sample_rate,
            chunk_size,
            samples_read: 0,
            dropped: 0,
            sequence: 0,
        }
    }

    /// Attempts to read a complete chunk from the ring.
    ///
    /// Returns `None` if not enough samples are available.
    pub fn try_read_chunk(&mut self) -> Option<EncodedChunk> {
        if self.chunk_size == 0 || self.consumer.occupied_len() < self.chunk_size {
            return None;
        }
        self.read_up_to(self.chunk_size)
    }

    /// Returns the number of samples currently in the ring.
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }

    /// Returns true if enough samples are available for a complete chunk.
    pub fn has_chunk(&self) -> bool {
        self.chunk_size > 0 && self.available() >= self.chunk_size
    }

    /// Drains all remaining samples from the ring.
    ///
    /// Returns chunks until the ring is empty. The last chunk may be
    /// smaller than the configured chunk size.
    pub fn drain(&mut self) -> Vec<EncodedChunk> {
        let mut chunks = Vec::new();

        while let Some(chunk) = self.try_read_chunk() {
            chunks.push(chunk);
        }

        let remaining = self.available();
        if remaining > 0 {
            if let Some(chunk) = self.read_up_to(remaining) {
                chunks.push(chunk);
            }
        }

        chunks
    }

    fn read_up_to(&mut self, count: usize) -> Option<EncodedChunk> {
        let mut samples = vec![0i16; count];
        let read = self.consumer.pop_slice(&mut samples);
        if read == 0 {
            return None;
        }
        samples.truncate(read);

        while self
            .gaps
            .try_peek()
            .is_some_and(|gap| gap.at <= self.samples_read)
        {
            if let Some(gap) = self.gaps.try_pop() {
                self.dropped = gap.dropped_total;
            }
        }
        let timestamp = samples_to_duration(self.samples_read + self.dropped, self.sample_rate);
        self.samples_read += read as u64;

        let chunk = EncodedChunk::new(samples, self.sequence, timestamp, self.sample_rate);
        self.sequence += 1;
        Some(chunk)
    }
}

/// Exact offset of sample `index`, so timestamps do not drift over a long session.
fn samples_to_duration(index: u64, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let nanos = u128::from(index) * 1_000_000_000 / u128::from(sample_rate);
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

/// Creates a capture ring holding `capacity` PCM16 samples.
///
/// Returns the [`ChunkWriter`] (for the input callback) and a
/// [`ChunkReader`] (for the transport bridge).
pub fn capture_ring(
    capacity: usize,
    sample_rate: u32,
    chunk_size: usize,
) -> (ChunkWriter, ChunkReader) {
    let capacity = capacity.max(1);
    let (producer, consumer) = HeapRb::<i16>::new(capacity).split();
    // Each unread gap sits in front of a chunk still in the ring, plus the flushed tail
    let gap_capacity = capacity / chunk_size.max(1) + 2;
    let (gap_producer, gap_consumer) = HeapRb::<Gap>::new(gap_capacity).split();

    let writer = ChunkWriter {
        producer,
        gaps: gap_producer,
        written: 0,
        dropped: 0,
        announced: 0,
    };
    let reader = ChunkReader::new(consumer, gap_consumer, sample_rate, chunk_size);
    (writer, reader)
}
