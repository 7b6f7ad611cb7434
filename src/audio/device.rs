//! Audio device lookup

use cpal::traits::{DeviceTrait, HostTrait};

use crate::error::AudioError;

/// Get the default input device together with a printable name
pub fn default_input_device() -> Result<(cpal::Device, String), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceNotFound("No default input device".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    Ok((device, name))
}

/// Get the default output device together with a printable name
pub fn default_output_device() -> Result<(cpal::Device, String), AudioError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceNotFound("No default output device".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    Ok((device, name))
}

/// Build a stream config for the feed parameters
pub fn stream_config(channels: u16, sample_rate: u32) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    }
}
