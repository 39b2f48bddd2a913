use crate::models::device::VideoFormat;
use crate::models::error::CaptureError;

/// The platform object behind a `DeviceHandle`.
///
/// Format changes follow the platform protocol: take the exclusive
/// configuration lock, mutate, release. `ConfigurationGuard` wraps that.
pub trait CaptureDevice: Send + Sync {
    /// Stable identifier, unique among connected devices.
    fn unique_id(&self) -> &str;

    /// Formats this device can be switched to, in platform order.
    fn formats(&self) -> Vec<VideoFormat>;

    /// Currently active format, if the device has one (audio devices do not).
    fn active_format(&self) -> Option<VideoFormat>;

    /// Currently active frame rate, if any.
    fn active_frame_rate(&self) -> Option<f64>;

    /// Acquire the exclusive configuration lock.
    ///
    /// Fails with `CaptureError::ConfigurationLocked` when another client holds it.
    fn lock_for_configuration(&self) -> Result<(), CaptureError>;

    /// Release the configuration lock.
    fn unlock_for_configuration(&self);

    /// Switch the active format and frame rate. Callers must hold the lock.
    fn set_active_format(&self, format: &VideoFormat, frame_rate: f64) -> Result<(), CaptureError>;
}

/// Holds a device's configuration lock and releases it on drop.
pub struct ConfigurationGuard<'a> {
    device: &'a dyn CaptureDevice,
}

impl<'a> ConfigurationGuard<'a> {
    pub fn acquire(device: &'a dyn CaptureDevice) -> Result<Self, CaptureError> {
        device.lock_for_configuration()?;
        Ok(Self { device })
    }

    pub fn set_active_format(&self, format: &VideoFormat, frame_rate: f64) -> Result<(), CaptureError> {
        self.device.set_active_format(format, frame_rate)
    }
}

impl Drop for ConfigurationGuard<'_> {
    fn drop(&mut self) {
        self.device.unlock_for_configuration();
    }
}
