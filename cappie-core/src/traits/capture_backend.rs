use std::sync::Arc;

use crate::models::device::DeviceDescriptor;
use crate::models::error::CaptureError;
use crate::models::output::{OutputRole, VideoCodec};
use crate::models::sample::SampleBuffer;

/// Callback invoked for every sample the running pipeline produces.
///
/// Fires on the backend's capture thread; keep processing minimal.
pub type SampleBufferCallback = Arc<dyn Fn(&SampleBuffer) + Send + Sync + 'static>;

/// The platform capture pipeline a `CaptureSession` drives.
///
/// The session keeps the authoritative list of inputs and outputs and only
/// consults the backend for the platform's half of each admission check and
/// for wiring devices into frame production.
pub trait CaptureBackend: Send + Sync + 'static {
    /// Platform half of the input admission check.
    fn can_add_input(&self, device: &DeviceDescriptor) -> bool;

    /// Platform half of the output admission check.
    fn can_add_output(&self, role: OutputRole) -> bool;

    /// Wire a device into the pipeline.
    fn attach_input(&self, device: &DeviceDescriptor) -> Result<(), CaptureError>;

    /// Unwire a device. Unknown devices are ignored.
    fn detach_input(&self, device: &DeviceDescriptor);

    /// Codecs the platform can encode a record output with.
    fn available_video_codecs(&self) -> Vec<VideoCodec>;

    /// Begin producing samples from the attached inputs.
    fn start_running(&self, callback: SampleBufferCallback) -> Result<(), CaptureError>;

    /// Stop producing samples. Must not return while a callback is still executing.
    fn stop_running(&self) -> Result<(), CaptureError>;

    fn is_running(&self) -> bool;

    /// Play forwarded audio on the output device `device_id`.
    fn render_audio(&self, device_id: &str, sample: &SampleBuffer);
}
