//! Audio format conversion utilities.
//!
//! This module provides utilities for converting between audio formats:
//! - Sample format conversion (f32 ↔ PCM16, little-endian bytes, base64)
//! - Channel conversion (interleaved ↔ mono)
//! - Sample rate conversion (block-average downsampling, linear resampling)

mod convert;
mod resample;

pub use convert::{
    f32_slice_to_pcm16, f32_to_pcm16, f32_to_pcm16_into, fan_out_mono, mix_to_mono,
    pcm16_from_base64, pcm16_from_le_bytes, pcm16_slice_to_f32, pcm16_to_base64, pcm16_to_f32,
    pcm16_to_le_bytes,
};
pub use resample::{downsample_average, resample_linear, resample_linear_into};
