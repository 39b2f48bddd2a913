//! Hot-pluggable device list.

use std::collections::HashMap;

use parking_lot::RwLock;

use cappie_core::models::device::{DeviceDescriptor, DevicePosition, DeviceType, MediaKind};
use cappie_core::traits::device_provider::DeviceProvider;

use crate::device::{camera, microphone, VirtualDevice};

/// A `DeviceProvider` whose devices are plugged and unplugged by hand.
#[derive(Default)]
pub struct VirtualDeviceProvider {
    devices: RwLock<Vec<DeviceDescriptor>>,
    defaults: RwLock<HashMap<MediaKind, String>>,
}

impl VirtualDeviceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// A laptop's worth of devices: built-in camera (the video default), a
    /// USB webcam, and a built-in microphone (the audio default).
    pub fn with_builtin_devices() -> Self {
        let provider = Self::new();
        provider.plug(camera(
            "FaceTime HD Camera",
            "builtin-camera",
            DeviceType::BuiltInWideAngleCamera,
            DevicePosition::Front,
            VirtualDevice::webcam_formats(),
        ));
        provider.plug(camera(
            "USB Video Device",
            "usb-camera",
            DeviceType::ExternalUnknown,
            DevicePosition::Unspecified,
            VirtualDevice::webcam_formats(),
        ));
        provider.plug(microphone("MacBook Pro Microphone", "builtin-microphone"));
        provider.set_default(MediaKind::Video, "builtin-camera");
        provider.set_default(MediaKind::Audio, "builtin-microphone");
        provider
    }

    pub fn plug(&self, device: DeviceDescriptor) {
        log::info!("Device connected: {} ({})", device.display_name(), device.unique_id());
        self.devices.write().push(device);
    }

    /// Returns whether a device was removed.
    pub fn unplug(&self, unique_id: &str) -> bool {
        let mut devices = self.devices.write();
        let before = devices.len();
        devices.retain(|d| d.unique_id() != unique_id);
        let removed = devices.len() != before;
        if removed {
            log::info!("Device disconnected: {}", unique_id);
        }
        removed
    }

    pub fn set_default(&self, kind: MediaKind, unique_id: &str) {
        self.defaults.write().insert(kind, unique_id.to_string());
    }
}

impl DeviceProvider for VirtualDeviceProvider {
    fn enumerate(&self, kind: MediaKind) -> Vec<DeviceDescriptor> {
        self.devices.read().iter().filter(|d| d.kind() == kind).cloned().collect()
    }

    fn default_device(&self, kind: MediaKind) -> Option<DeviceDescriptor> {
        let defaults = self.defaults.read();
        let id = defaults.get(&kind)?;
        self.devices
            .read()
            .iter()
            .find(|d| d.kind() == kind && d.unique_id() == id)
            .cloned()
    }
}
