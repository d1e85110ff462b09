//! Mock audio source for testing without hardware.

use std::time::Duration;

use crate::pipeline::{CaptureInput, InputFormat};

/// A mock audio source that generates synthetic audio for testing.
///
/// Samples are interleaved f32, as an input device would deliver them.
/// [`feed`](MockSource::feed) pushes them into a [`CaptureInput`] in
/// callback-sized pieces, which exercises the full capture pipeline without
/// audio hardware.
///
/// # Example
///
/// ```
/// use live_audio::MockSource;
///
/// let mut mock = MockSource::new(16000, 1);
///
/// // Generate 100ms of silence
/// mock.generate_silence(100);
///
/// // Generate 100ms of a 440Hz sine wave
/// mock.generate_sine(440.0, 100);
///
/// assert_eq!(mock.samples().len(), 3200);
/// ```
pub struct MockSource {
    sample_rate: u32,
    channels: u16,
    samples: Vec<f32>,
    seed: u32,
}

impl MockSource {
    /// Creates a new mock source with the given format.
    pub fn new(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            samples: Vec::new(),
            seed: 12345,
        }
    }

    /// Creates a mock source at the default capture format (16kHz mono).
    pub fn voice() -> Self {
        Self::new(16000, 1)
    }

    /// Returns the sample rate.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns the channel count.
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Returns the format to create a matching [`CaptureInput`] with.
    pub fn format(&self) -> InputFormat {
        InputFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Generates silence for the given duration in milliseconds.
    pub fn generate_silence(&mut self, duration_ms: u64) {
        let num_samples = self.samples_for_duration(duration_ms);
        self.samples.resize(self.samples.len() + num_samples, 0.0);
    }

    /// Generates a full-scale sine wave at the given frequency.
    pub fn generate_sine(&mut self, frequency: f64, duration_ms: u64) {
        let num_frames = self.samples_for_duration(duration_ms) / self.channels as usize;
        let sample_rate = f64::from(self.sample_rate);

        for i in 0..num_frames {
            let t = i as f64 / sample_rate;
            let sample = (2.0 * std::f64::consts::PI * frequency * t).sin() as f32;

            // Write same sample to all channels
            for _ in 0..self.channels {
                self.samples.push(sample);
            }
        }
    }

    /// Generates white noise in [-amplitude, amplitude].
    pub fn generate_noise(&mut self, duration_ms: u64, amplitude: f32) {
        let num_samples = self.samples_for_duration(duration_ms);

        // Simple LCG for deterministic "random" noise
        for _ in 0..num_samples {
            self.seed = self.seed.wrapping_mul(1_103_515_245).wrapping_add(12345);
            let unit = f32::from((self.seed >> 16) as u16) / 32767.5 - 1.0;
            self.samples.push(unit * amplitude);
        }
    }

    /// Adds raw interleaved samples directly.
    pub fn add_samples(&mut self, samples: &[f32]) {
        self.samples.extend_from_slice(samples);
    }

    /// Takes all accumulated samples, clearing the internal buffer.
    pub fn take_samples(&mut self) -> Vec<f32> {
        std::mem::take(&mut self.samples)
    }

    /// Returns a reference to the accumulated samples.
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Returns the duration of accumulated samples.
    pub fn duration(&self) -> Duration {
        let frames = (self.samples.len() / self.channels as usize) as u64;
        Duration::from_micros(frames * 1_000_000 / u64::from(self.sample_rate.max(1)))
    }

    /// Splits the accumulated samples into callback-sized frames of
    /// `frames_per_callback` frames each. The last one may be shorter.
    pub fn callback_frames(&self, frames_per_callback: usize) -> impl Iterator<Item = &[f32]> {
        let step = frames_per_callback.max(1) * self.channels as usize;
        self.samples.chunks(step)
    }

    /// Pushes all accumulated samples into `input`, `frames_per_callback`
    /// frames at a time, then clears them.
    ///
    /// Returns the number of chunks completed.
    pub fn feed(&mut self, input: &mut CaptureInput, frames_per_callback: usize) -> usize {
        let emitted = self
            .callback_frames(frames_per_callback)
            .map(|frame| input.push_interleaved(frame))
            .sum::<usize>();
        self.samples.clear();
        emitted
    }

    fn samples_for_duration(&self, duration_ms: u64) -> usize {
        let frames = (u64::from(self.sample_rate) * duration_ms / 1000) as usize;
        frames * self.channels as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_source_silence() {
        let mut mock = MockSource::new(16000, 1);
        mock.generate_silence(100);

        let samples = mock.take_samples();
        assert_eq!(samples.len(), 1600); // 16000 * 0.1 = 1600
        assert!(samples.iter().all(|&s| s == 0.0));
        assert!(mock.samples().is_empty());
    }

    #[test]
    fn test_mock_source_sine() {
        let mut mock = MockSource::new(16000, 1);
        mock.generate_sine(440.0, 100);

        let samples = mock.take_samples();
        assert_eq!(samples.len(), 1600);

        // Sine wave should have positive and negative values
        assert!(samples.iter().any(|&s| s > 0.0));
        assert!(samples.iter().any(|&s| s < 0.0));
        assert!(samples.iter().all(|s| s.abs() <= 1.0));
    }

    #[test]
    fn test_mock_source_noise_in_range() {
        let mut mock = MockSource::voice();
        mock.generate_noise(50, 0.25);

        assert_eq!(mock.samples().len(), 800);
        assert!(mock.samples().iter().all(|s| s.abs() <= 0.25 + f32::EPSILON));
        assert!(mock.samples().iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_mock_source_stereo() {
        let mut mock = MockSource::new(48000, 2);
        mock.generate_silence(100);

        // 48000 * 0.1 * 2 channels = 9600
        assert_eq!(mock.samples().len(), 9600);
        assert_eq!(mock.duration(), Duration::from_millis(100));
    }

    #[test]
    fn test_mock_source_duration() {
        let mut mock = MockSource::voice();
        mock.generate_silence(500);

        assert_eq!(mock.duration(), Duration::from_millis(500));
    }

    #[test]
    fn test_callback_frames() {
        let mut mock = MockSource::new(16000, 2);
        mock.add_samples(&[0.0; 10]);

        let sizes: Vec<usize> = mock.callback_frames(2).map(<[f32]>::len).collect();
        assert_eq!(sizes, vec![4, 4, 2]);
    }
}
