//! Frame-rate negotiation for video devices.

use crate::models::device::{Resolution, VideoFormat};
use crate::models::error::CaptureError;
use crate::traits::capture_device::{CaptureDevice, ConfigurationGuard};

/// Default frame rate requested from video devices.
pub const DEFAULT_FRAME_RATE: f64 = 30.0;

/// What to ask a video device for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRateRequest {
    pub frame_rate: f64,
    /// When set, only formats of exactly this size qualify.
    pub resolution: Option<Resolution>,
}

impl FrameRateRequest {
    pub fn new(frame_rate: f64) -> Self {
        Self {
            frame_rate,
            resolution: None,
        }
    }

    pub fn at(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }

    fn unsupported(&self) -> CaptureError {
        CaptureError::UnsupportedFrameRate {
            frame_rate: self.frame_rate,
            resolution: self.resolution,
        }
    }
}

impl Default for FrameRateRequest {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_RATE)
    }
}

/// First format, in device order, that reaches the requested rate and, if a
/// resolution is requested, has exactly that size.
pub fn select_format<'a>(formats: &'a [VideoFormat], request: &FrameRateRequest) -> Option<&'a VideoFormat> {
    formats.iter().find(|format| {
        let fast_enough = format
            .frame_rate_ranges
            .iter()
            .any(|range| range.max_frame_rate >= request.frame_rate);
        let right_size = request.resolution.map_or(true, |r| format.resolution == r);
        fast_enough && right_size
    })
}

/// Switch `device` to the format `select_format` picks.
///
/// The change happens under the device's exclusive configuration lock. When
/// the lock is held elsewhere or no format qualifies, the device keeps its
/// current format and the error says why.
pub fn negotiate(device: &dyn CaptureDevice, request: &FrameRateRequest) -> Result<VideoFormat, CaptureError> {
    let formats = device.formats();
    let format = select_format(&formats, request).ok_or_else(|| request.unsupported())?;

    let guard = ConfigurationGuard::acquire(device)?;
    guard.set_active_format(format, request.frame_rate)?;
    drop(guard);

    log::debug!(
        "Device {} now at {} {} fps",
        device.unique_id(),
        format.resolution,
        request.frame_rate
    );
    Ok(format.clone())
}
