//! Synthetic capture devices.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use cappie_core::models::device::{
    DeviceDescriptor, DeviceHandle, DevicePosition, DeviceType, FrameRateRange, MediaKind, Resolution, VideoFormat,
};
use cappie_core::models::error::CaptureError;
use cappie_core::traits::capture_device::CaptureDevice;

#[derive(Default)]
struct ConfigState {
    active: Option<(VideoFormat, f64)>,
    locked: bool,
}

/// An in-process capture device with a fixed format list.
///
/// The configuration lock is exclusive; `set_contended` simulates another
/// client holding it.
pub struct VirtualDevice {
    unique_id: String,
    formats: Vec<VideoFormat>,
    state: Mutex<ConfigState>,
    contended: AtomicBool,
}

impl VirtualDevice {
    pub fn new(unique_id: impl Into<String>, formats: Vec<VideoFormat>) -> Self {
        Self {
            unique_id: unique_id.into(),
            formats,
            state: Mutex::new(ConfigState::default()),
            contended: AtomicBool::new(false),
        }
    }

    /// Formats of a typical webcam: VGA, 720p up to 60 fps, 1080p up to 30 fps.
    pub fn webcam_formats() -> Vec<VideoFormat> {
        vec![
            VideoFormat::new(Resolution::new(640, 480), vec![FrameRateRange::new(1.0, 30.0)]),
            VideoFormat::new(
                Resolution::new(1280, 720),
                vec![FrameRateRange::new(1.0, 30.0), FrameRateRange::new(50.0, 60.0)],
            ),
            VideoFormat::new(Resolution::new(1920, 1080), vec![FrameRateRange::new(1.0, 30.0)]),
        ]
    }

    pub fn set_contended(&self, contended: bool) {
        self.contended.store(contended, Ordering::SeqCst);
    }

    pub fn is_locked(&self) -> bool {
        self.state.lock().locked
    }
}

impl CaptureDevice for VirtualDevice {
    fn unique_id(&self) -> &str {
        &self.unique_id
    }

    fn formats(&self) -> Vec<VideoFormat> {
        self.formats.clone()
    }

    fn active_format(&self) -> Option<VideoFormat> {
        self.state.lock().active.as_ref().map(|(format, _)| format.clone())
    }

    fn active_frame_rate(&self) -> Option<f64> {
        self.state.lock().active.as_ref().map(|(_, rate)| *rate)
    }

    fn lock_for_configuration(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if state.locked || self.contended.load(Ordering::SeqCst) {
            return Err(CaptureError::ConfigurationLocked(self.unique_id.clone()));
        }
        state.locked = true;
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.state.lock().locked = false;
    }

    fn set_active_format(&self, format: &VideoFormat, frame_rate: f64) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if !state.locked {
            return Err(CaptureError::ConfigurationFailed(format!(
                "{} is not locked for configuration",
                self.unique_id
            )));
        }
        if !self.formats.contains(format) || !format.frame_rate_ranges.iter().any(|r| r.contains(frame_rate)) {
            return Err(CaptureError::UnsupportedFrameRate {
                frame_rate,
                resolution: Some(format.resolution),
            });
        }
        state.active = Some((format.clone(), frame_rate));
        Ok(())
    }
}

/// Descriptor for a virtual camera.
pub fn camera(
    name: &str,
    unique_id: &str,
    device_type: DeviceType,
    position: DevicePosition,
    formats: Vec<VideoFormat>,
) -> DeviceDescriptor {
    DeviceDescriptor::new(
        name,
        MediaKind::Video,
        [device_type],
        position,
        DeviceHandle::new(Arc::new(VirtualDevice::new(unique_id, formats))),
    )
}

/// Descriptor for a virtual microphone.
pub fn microphone(name: &str, unique_id: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(
        name,
        MediaKind::Audio,
        [DeviceType::BuiltInMicrophone],
        DevicePosition::Unspecified,
        DeviceHandle::new(Arc::new(VirtualDevice::new(unique_id, Vec::new()))),
    )
}
