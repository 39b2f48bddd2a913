use std::fmt;

use super::device::{MediaKind, VideoFormat};
use super::error::CaptureError;
use super::output::{OutputHandle, OutputRole};

/// What the session refused to attach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionTarget {
    Input { device_id: String, kind: MediaKind },
    Output { role: OutputRole },
}

/// Why an admission check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionReason {
    /// The device already feeds the session.
    DuplicateDevice,
    /// The per-kind input limit is reached.
    KindAtCapacity,
    /// A singleton role is already occupied.
    RoleOccupied,
    /// The platform pipeline rejected it.
    BackendRejected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionRefusal {
    pub target: AdmissionTarget,
    pub reason: AdmissionReason,
}

impl fmt::Display for AdmissionRefusal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.target {
            AdmissionTarget::Input { device_id, kind } => {
                write!(f, "{kind} input {device_id}")?;
            }
            AdmissionTarget::Output { role } => {
                write!(f, "{role} output")?;
            }
        }
        write!(f, " ({:?})", self.reason)
    }
}

/// Observable session events, delivered to a `SessionDelegate`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    InputAttached { device_id: String, kind: MediaKind },
    InputDetached { device_id: String, kind: MediaKind },
    OutputAttached { role: OutputRole, handle: OutputHandle },
    OutputDetached { role: OutputRole, handle: OutputHandle },
    /// An add was refused and silently skipped.
    AdmissionRefused(AdmissionRefusal),
    /// A `configure` request no-opped, e.g. because permission was denied.
    ConfigurationSkipped { device_id: String, error: CaptureError },
    FormatNegotiated { device_id: String, format: VideoFormat, frame_rate: f64 },
    FormatNegotiationFailed { device_id: String, error: CaptureError },
    RunningChanged(bool),
}
