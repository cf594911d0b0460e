//! Camera device discovery and selection.

use super::platform::Platform;
use super::types::{DeviceInfo, DeviceType, Position};
use super::CameraError;

/// Device types considered during discovery, in order of preference.
pub const DISCOVERY_TYPES: [DeviceType; 3] = [
    DeviceType::TrueDepth,
    DeviceType::DualCamera,
    DeviceType::WideAngle,
];

/// List every camera the platform exposes, regardless of position.
pub fn list_devices(platform: &dyn Platform) -> Vec<DeviceInfo> {
    platform.discover_devices(&DISCOVERY_TYPES, Position::Unspecified)
}

/// Pick the device for `position` from a discovered list.
///
/// An exact position match wins; otherwise the first device is used.
/// An empty list yields [`CameraError::CameraUnavailable`].
pub fn choose_device(devices: &[DeviceInfo], position: Position) -> Result<DeviceInfo, CameraError> {
    devices
        .iter()
        .find(|d| d.position == position)
        .or_else(|| devices.first())
        .cloned()
        .ok_or(CameraError::CameraUnavailable)
}

/// Discover devices and choose the one for `position`.
pub fn select_device(platform: &dyn Platform, position: Position) -> Result<DeviceInfo, CameraError> {
    let devices = list_devices(platform);
    let chosen = choose_device(&devices, position);
    match &chosen {
        Ok(device) if device.position != position => log::info!(
            "No {} camera among {} device(s), falling back to {}",
            position,
            devices.len(),
            device.name
        ),
        Ok(device) => log::debug!("Selected {}", device),
        Err(_) => log::warn!("No camera devices discovered"),
    }
    chosen
}
