//! Audio device enumeration and selection

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::Device;

use super::host::HostError;

/// Information about an audio device
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub is_default: bool,
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_default {
            write!(f, "{} (default)", self.name)
        } else {
            write!(f, "{}", self.name)
        }
    }
}

/// List all available input (microphone) devices
pub fn list_input_devices() -> Result<Vec<DeviceInfo>, HostError> {
    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    let devices = host
        .input_devices()
        .map_err(|e| HostError::Enumerate(e.to_string()))?;
    Ok(describe(devices, default_name))
}

/// List all available output devices
pub fn list_output_devices() -> Result<Vec<DeviceInfo>, HostError> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());
    let devices = host
        .output_devices()
        .map_err(|e| HostError::Enumerate(e.to_string()))?;
    Ok(describe(devices, default_name))
}

fn describe(devices: impl Iterator<Item = Device>, default_name: Option<String>) -> Vec<DeviceInfo> {
    devices
        .filter_map(|device| {
            device.name().ok().map(|name| {
                let is_default = default_name.as_ref() == Some(&name);
                DeviceInfo { name, is_default }
            })
        })
        .collect()
}

/// Input device by name, or the default one
pub fn find_input_device(name: Option<&str>) -> Result<Device, HostError> {
    let host = cpal::default_host();
    match name {
        None => host.default_input_device().ok_or(HostError::NoDevice),
        Some(name) => host
            .input_devices()
            .map_err(|e| HostError::Enumerate(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| HostError::DeviceNotFound(name.to_string())),
    }
}

/// Output device by name, or the default one
pub fn find_output_device(name: Option<&str>) -> Result<Device, HostError> {
    let host = cpal::default_host();
    match name {
        None => host.default_output_device().ok_or(HostError::NoDevice),
        Some(name) => host
            .output_devices()
            .map_err(|e| HostError::Enumerate(e.to_string()))?
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| HostError::DeviceNotFound(name.to_string())),
    }
}
