//! Sample rate conversion.
//!
//! Two strategies are provided:
//! - [`downsample_average`] decimates by averaging blocks of input samples.
//!   It is used on the capture path, where the microphone usually runs
//!   faster than the 16kHz wire rate.
//! - [`resample_linear`] uses linear interpolation in either direction. It is
//!   used on the playback path to adapt 24kHz wire audio to the device rate,
//!   and (as [`resample_linear_into`]) on the capture path when the
//!   microphone runs slower than the wire rate.
//!
//! Both operate on mono f32 samples. Neither keeps state between calls, so
//! block boundaries are treated independently.

/// Downsamples by block averaging, writing into `output`.
///
/// `output` is cleared first so a pre-reserved buffer can be reused from an
/// audio callback without reallocating. This function never raises the rate:
/// when `to_rate >= from_rate` (or either rate is zero) the input is copied
/// through unchanged, and callers that may see a slower source use
/// [`resample_linear_into`] for that case.
pub fn downsample_average(input: &[f32], from_rate: u32, to_rate: u32, output: &mut Vec<f32>) {
    output.clear();
    if to_rate == 0 || from_rate == 0 || to_rate >= from_rate {
        output.extend_from_slice(input);
        return;
    }

    let ratio = f64::from(from_rate) / f64::from(to_rate);
    let out_len = (input.len() as f64 / ratio).round() as usize;

    let mut start = 0usize;
    for i in 0..out_len {
        let end = (((i + 1) as f64 * ratio).round() as usize).min(input.len());
        let block = &input[start.min(end)..end];
        let sample = if block.is_empty() {
            // Ratio rounding can leave the final block empty
            output.last().copied().unwrap_or(0.0)
        } else {
            block.iter().sum::<f32>() / block.len() as f32
        };
        output.push(sample);
        start = end;
    }
}

/// Resamples mono audio using linear interpolation.
///
/// Fast but not band-limited; adequate for speech.
///
/// # Arguments
///
/// * `samples` - Input samples (mono)
/// * `from_rate` - Source sample rate in Hz
/// * `to_rate` - Target sample rate in Hz
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    let mut output = Vec::new();
    resample_linear_into(samples, from_rate, to_rate, &mut output);
    output
}

/// [`resample_linear`] writing into a reusable buffer.
///
/// `output` is cleared first; it only grows if it has less capacity than
/// the converted block needs.
pub fn resample_linear_into(samples: &[f32], from_rate: u32, to_rate: u32, output: &mut Vec<f32>) {
    output.clear();
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        output.extend_from_slice(samples);
        return;
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let output_len = (samples.len() as f64 * ratio).ceil() as usize;

    for i in 0..output_len {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = match (samples.get(src_idx), samples.get(src_idx + 1)) {
            (Some(&s1), Some(&s2)) => s1 + (s2 - s1) * frac,
            (Some(&s1), None) => s1,
            _ => samples.last().copied().unwrap_or(0.0),
        };

        output.push(sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downsample_48k_to_16k_averages_triples() {
        let input = [0.3f32, 0.3, 0.3, -0.6, 0.0, 0.0];
        let mut out = Vec::new();
        downsample_average(&input, 48000, 16000, &mut out);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 0.3).abs() < 1e-6);
        assert!((out[1] + 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_downsample_length_for_quantum() {
        // 128-sample render quantum at 48kHz -> ~43 samples at 16kHz
        let input = vec![0.1f32; 128];
        let mut out = Vec::new();
        downsample_average(&input, 48000, 16000, &mut out);
        assert_eq!(out.len(), 43);
        assert!(out.iter().all(|s| (s - 0.1).abs() < 1e-6));
    }

    #[test]
    fn test_downsample_same_rate_passthrough() {
        let mut out = vec![1.0; 3];
        downsample_average(&[0.1, 0.2], 16000, 16000, &mut out);
        assert_eq!(out, vec![0.1, 0.2]);
    }

    #[test]
    fn test_downsample_upward_request_passthrough() {
        let mut out = Vec::new();
        downsample_average(&[0.1, 0.2], 16000, 48000, &mut out);
        assert_eq!(out, vec![0.1, 0.2]);
    }

    #[test]
    fn test_downsample_empty() {
        let mut out = vec![1.0];
        downsample_average(&[], 48000, 16000, &mut out);
        assert!(out.is_empty());
    }

    #[test]
    fn test_resample_same_rate() {
        let samples = vec![0.1f32, 0.2, 0.3];
        assert_eq!(resample_linear(&samples, 24000, 24000), samples);
    }

    #[test]
    fn test_resample_empty() {
        assert!(resample_linear(&[], 24000, 48000).is_empty());
    }

    #[test]
    fn test_resample_upsample_24k_to_48k() {
        let samples = vec![0.0f32, 0.5, 1.0];
        let out = resample_linear(&samples, 24000, 48000);
        assert_eq!(out.len(), 6);
        assert_eq!(out[0], 0.0);
        assert!((out[1] - 0.25).abs() < 1e-6);
        assert_eq!(out[2], 0.5);
        assert_eq!(out[4], 1.0);
        // Past the last input sample, hold the last value
        assert_eq!(out[5], 1.0);
    }

    #[test]
    fn test_resample_downsample_length() {
        let samples = vec![0.0f32; 480];
        assert_eq!(resample_linear(&samples, 48000, 16000).len(), 160);
    }

    #[test]
    fn test_resample_zero_to_rate() {
        assert!(resample_linear(&[0.1, 0.2], 16000, 0).is_empty());
    }

    #[test]
    fn test_resample_into_reuses_buffer() {
        let mut out = Vec::with_capacity(512);
        out.push(9.0);
        resample_linear_into(&[0.0, 0.5, 1.0, 1.0], 8000, 16000, &mut out);
        assert_eq!(out.len(), 8);
        assert!((out[1] - 0.25).abs() < 1e-6);
        assert_eq!(out.capacity(), 512);

        resample_linear_into(&[0.3; 3], 16000, 16000, &mut out);
        assert_eq!(out, vec![0.3; 3]);
    }

    #[test]
    fn test_resample_zero_from_rate_passthrough() {
        assert_eq!(resample_linear(&[0.1], 0, 16000), vec![0.1]);
    }
}
