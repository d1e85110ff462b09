//! Sample format and channel conversion.
//!
//! PCM16 scaling is asymmetric: negative samples scale by 32768 and
//! non-negative samples by 32767, so -1.0 and 1.0 land exactly on
//! `i16::MIN` and `i16::MAX`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Scale applied to negative samples (`0x8000`).
const NEGATIVE_SCALE: f32 = 32768.0;

/// Scale applied to non-negative samples (`0x7FFF`).
const POSITIVE_SCALE: f32 = 32767.0;

/// Converts an f32 sample to signed 16-bit PCM.
///
/// Input is clamped to [-1.0, 1.0] and the scaled value truncated toward
/// zero. NaN maps to 0.
///
/// ```
/// use live_audio::format::f32_to_pcm16;
///
/// assert_eq!(f32_to_pcm16(-1.0), -32768);
/// assert_eq!(f32_to_pcm16(1.0), 32767);
/// assert_eq!(f32_to_pcm16(0.5), 16383);
/// ```
#[inline]
pub fn f32_to_pcm16(sample: f32) -> i16 {
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * NEGATIVE_SCALE) as i16
    } else {
        // `as` saturates and maps NaN to 0
        (s * POSITIVE_SCALE) as i16
    }
}

/// Converts a signed 16-bit PCM sample back to f32.
///
/// Inverse of [`f32_to_pcm16`]: negative values divide by 32768,
/// non-negative by 32767. Output is re-clamped to [-1.0, 1.0].
#[inline]
pub fn pcm16_to_f32(sample: i16) -> f32 {
    let s = f32::from(sample);
    let out = if sample < 0 {
        s / NEGATIVE_SCALE
    } else {
        s / POSITIVE_SCALE
    };
    out.clamp(-1.0, 1.0)
}

/// Converts f32 samples into a caller-provided PCM16 buffer.
///
/// Converts `min(input.len(), output.len())` samples and returns that count.
/// Does not allocate, so it is safe to call from an audio callback.
pub fn f32_to_pcm16_into(input: &[f32], output: &mut [i16]) -> usize {
    let n = input.len().min(output.len());
    for (dst, &src) in output[..n].iter_mut().zip(&input[..n]) {
        *dst = f32_to_pcm16(src);
    }
    n
}

/// Batch converts f32 samples to PCM16.
pub fn f32_slice_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples.iter().map(|&s| f32_to_pcm16(s)).collect()
}

/// Batch converts PCM16 samples to f32.
pub fn pcm16_slice_to_f32(samples: &[i16]) -> Vec<f32> {
    samples.iter().map(|&s| pcm16_to_f32(s)).collect()
}

/// Packs PCM16 samples as little-endian bytes, the layout the wire expects.
pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// Unpacks little-endian bytes into PCM16 samples.
///
/// A trailing odd byte is ignored.
pub fn pcm16_from_le_bytes(bytes: &[u8]) -> Vec<i16> {
    bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

/// Encodes PCM16 samples as base64 over their little-endian bytes.
pub fn pcm16_to_base64(samples: &[i16]) -> String {
    STANDARD.encode(pcm16_to_le_bytes(samples))
}

/// Decodes base64 little-endian PCM16 into samples.
///
/// # Errors
///
/// Returns the decoder error if `encoded` is not valid base64.
pub fn pcm16_from_base64(encoded: &str) -> Result<Vec<i16>, base64::DecodeError> {
    STANDARD
        .decode(encoded)
        .map(|bytes| pcm16_from_le_bytes(&bytes))
}

/// Mixes interleaved multi-channel audio down to mono by averaging.
///
/// Writes into `output` (cleared first) so the buffer can be reused across
/// callbacks. A trailing partial frame is ignored. `channels == 1` copies.
pub fn mix_to_mono(interleaved: &[f32], channels: u16, output: &mut Vec<f32>) {
    output.clear();
    let channels = usize::from(channels.max(1));
    if channels == 1 {
        output.extend_from_slice(interleaved);
        return;
    }
    let scale = 1.0 / channels as f32;
    output.extend(
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() * scale),
    );
}

/// Duplicates mono samples into every channel of an interleaved buffer.
///
/// Fills `min(mono.len(), output.len() / channels)` frames and returns that
/// count. Remaining output slots are left untouched.
pub fn fan_out_mono(mono: &[f32], channels: u16, output: &mut [f32]) -> usize {
    let channels = usize::from(channels.max(1));
    let mut frames = 0;
    for (frame, &sample) in output.chunks_exact_mut(channels).zip(mono) {
        frame.fill(sample);
        frames += 1;
    }
    frames
}
