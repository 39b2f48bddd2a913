use thiserror::Error;

use super::device::{MediaKind, Resolution};
use super::event::AdmissionRefusal;

/// Errors surfaced by the capture session, its controllers and collaborators.
///
/// Nothing here is fatal to the process. Every failure leaves the session in
/// the state it had before the failing call.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CaptureError {
    #[error("no {kind} device matches {query:?} and no default device exists")]
    DeviceNotFound { kind: MediaKind, query: String },

    #[error("{0} capture permission denied")]
    PermissionDenied(MediaKind),

    #[error("{0} capture permission restricted by system policy")]
    PermissionRestricted(MediaKind),

    #[error("device {0} is locked for configuration by another client")]
    ConfigurationLocked(String),

    #[error("no format supports {frame_rate} fps{}", resolution_suffix(.resolution))]
    UnsupportedFrameRate {
        frame_rate: f64,
        resolution: Option<Resolution>,
    },

    #[error("session has no video connection")]
    NoVideoConnection,

    #[error("session refused to admit {0}")]
    AdmissionRefused(AdmissionRefusal),

    #[error("a recording is already in progress")]
    AlreadyRecording,

    #[error("configuration transaction is still open")]
    TransactionOpen,

    #[error("session work queue is closed")]
    QueueClosed,

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    #[error("storage error: {0}")]
    StorageError(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

fn resolution_suffix(resolution: &Option<Resolution>) -> String {
    resolution.map(|r| format!(" at {r}")).unwrap_or_default()
}

impl CaptureError {
    /// Soft failures are logged and reported as events but never abort the session.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied(_)
                | Self::PermissionRestricted(_)
                | Self::ConfigurationLocked(_)
                | Self::UnsupportedFrameRate { .. }
                | Self::AdmissionRefused(_)
        )
    }
}
