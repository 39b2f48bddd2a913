use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::traits::capture_device::CaptureDevice;

/// Media kind a device captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Video => f.write_str("video"),
            Self::Audio => f.write_str("audio"),
        }
    }
}

/// Platform device category used to narrow discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceType {
    BuiltInWideAngleCamera,
    BuiltInMicrophone,
    ExternalUnknown,
    DeskViewCamera,
    ContinuityCamera,
}

/// Physical position of a capture device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePosition {
    Front,
    Back,
    #[default]
    Unspecified,
}

/// Video frame dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A continuous range of frame rates a format supports, in frames per second.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameRateRange {
    pub min_frame_rate: f64,
    pub max_frame_rate: f64,
}

impl FrameRateRange {
    pub fn new(min_frame_rate: f64, max_frame_rate: f64) -> Self {
        Self {
            min_frame_rate,
            max_frame_rate,
        }
    }

    pub fn contains(&self, frame_rate: f64) -> bool {
        frame_rate >= self.min_frame_rate && frame_rate <= self.max_frame_rate
    }
}

/// One capture format a video device can be switched to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoFormat {
    pub resolution: Resolution,
    pub frame_rate_ranges: Vec<FrameRateRange>,
}

impl VideoFormat {
    pub fn new(resolution: Resolution, frame_rate_ranges: Vec<FrameRateRange>) -> Self {
        Self {
            resolution,
            frame_rate_ranges,
        }
    }

    /// Highest frame rate any of this format's ranges reaches.
    pub fn max_frame_rate(&self) -> Option<f64> {
        self.frame_rate_ranges
            .iter()
            .map(|r| r.max_frame_rate)
            .fold(None, |acc, rate| match acc {
                Some(best) if best >= rate => Some(best),
                _ => Some(rate),
            })
    }
}

/// Opaque token owning the platform device object behind a descriptor.
#[derive(Clone)]
pub struct DeviceHandle(Arc<dyn CaptureDevice>);

impl DeviceHandle {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self(device)
    }

    pub fn device(&self) -> &dyn CaptureDevice {
        self.0.as_ref()
    }
}

impl fmt::Debug for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DeviceHandle").field(&self.0.unique_id()).finish()
    }
}

/// A capture device as seen by everything above the platform layer.
///
/// Built by a `DeviceProvider` and never mutated afterwards. Cloning is cheap:
/// the native handle is reference counted and shared, not duplicated.
#[derive(Debug, Clone)]
pub struct DeviceDescriptor {
    display_name: String,
    kind: MediaKind,
    device_types: BTreeSet<DeviceType>,
    position: DevicePosition,
    handle: DeviceHandle,
}

impl DeviceDescriptor {
    pub fn new(
        display_name: impl Into<String>,
        kind: MediaKind,
        device_types: impl IntoIterator<Item = DeviceType>,
        position: DevicePosition,
        handle: DeviceHandle,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            kind,
            device_types: device_types.into_iter().collect(),
            position,
            handle,
        }
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn device_types(&self) -> &BTreeSet<DeviceType> {
        &self.device_types
    }

    pub fn position(&self) -> DevicePosition {
        self.position
    }

    pub fn handle(&self) -> &DeviceHandle {
        &self.handle
    }

    pub fn device(&self) -> &dyn CaptureDevice {
        self.handle.device()
    }

    /// Stable platform identifier of the underlying device.
    pub fn unique_id(&self) -> &str {
        self.handle.device().unique_id()
    }
}

impl PartialEq for DeviceDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.unique_id() == other.unique_id()
    }
}

impl Eq for DeviceDescriptor {}

/// Serializable snapshot of a descriptor for UI layers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    pub unique_id: String,
    pub display_name: String,
    pub kind: MediaKind,
    pub device_types: Vec<DeviceType>,
    pub position: DevicePosition,
}

impl From<&DeviceDescriptor> for DeviceInfo {
    fn from(d: &DeviceDescriptor) -> Self {
        Self {
            unique_id: d.unique_id().to_string(),
            display_name: d.display_name.clone(),
            kind: d.kind,
            device_types: d.device_types.iter().copied().collect(),
            position: d.position,
        }
    }
}

/// Filter applied when enumerating devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryQuery {
    pub kind: MediaKind,
    pub device_types: BTreeSet<DeviceType>,
    /// `Unspecified` matches every position.
    pub position: DevicePosition,
}

impl DiscoveryQuery {
    pub fn new(kind: MediaKind) -> Self {
        Self {
            kind,
            device_types: [
                DeviceType::ExternalUnknown,
                DeviceType::BuiltInMicrophone,
                DeviceType::BuiltInWideAngleCamera,
            ]
            .into_iter()
            .collect(),
            position: DevicePosition::Unspecified,
        }
    }

    pub fn with_device_types(mut self, device_types: impl IntoIterator<Item = DeviceType>) -> Self {
        self.device_types = device_types.into_iter().collect();
        self
    }

    pub fn with_position(mut self, position: DevicePosition) -> Self {
        self.position = position;
        self
    }

    pub fn matches(&self, descriptor: &DeviceDescriptor) -> bool {
        if descriptor.kind() != self.kind {
            return false;
        }
        if self.position != DevicePosition::Unspecified && descriptor.position() != self.position {
            return false;
        }
        descriptor
            .device_types()
            .iter()
            .any(|t| self.device_types.contains(t))
    }
}
