//! Audio output: CPAL playback device.
//!
//! The output callback only ever copies from the
//! [`PlaybackConsumer`](crate::PlaybackConsumer); decoding and rate
//! conversion happen on the receive side.

mod device;

pub use device::{OutputDevice, OutputFormat, PlaybackStream};

use cpal::traits::{DeviceTrait, HostTrait};

/// Lists all available output devices.
///
/// # Errors
///
/// Returns an error if the audio host cannot be accessed.
pub fn list_output_devices() -> Result<Vec<String>, crate::LiveAudioError> {
    let host = cpal::default_host();
    let devices = host
        .output_devices()
        .map_err(|e| crate::LiveAudioError::BackendError(e.to_string()))?;

    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Gets the name of the default output device, if any.
pub fn default_output_device_name() -> Option<String> {
    cpal::default_host()
        .default_output_device()
        .and_then(|d| d.name().ok())
}
