//! # cappie-core
//!
//! Platform-agnostic capture session lifecycle core.
//!
//! Discovers capture devices, gates access on per-kind authorization,
//! serializes every pipeline reconfiguration on one work queue, negotiates
//! video frame rates, and toggles movie recording and audio monitoring.
//! Platform backends implement the traits in `traits/` and plug into the
//! generic `SessionManager`.
//!
//! ## Architecture
//!
//! ```text
//! cappie-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureDevice, DeviceProvider, AuthorizationProvider,
//! │                   MovieMuxer, DestinationChooser, SessionDelegate, RecordingDelegate
//! ├── models/       ← CaptureError, SessionConfiguration, DeviceDescriptor, SessionEvent, etc.
//! ├── catalog/      ← DeviceCatalog
//! ├── permission/   ← PermissionGate
//! ├── session/      ← SessionManager, CaptureSession, outputs, frame-rate negotiation
//! ├── recording/    ← RecordingController
//! └── audio/        ← AudioLevelController
//! ```

pub mod audio;
pub mod catalog;
pub mod models;
pub mod permission;
pub mod recording;
pub mod session;
pub mod traits;

#[cfg(test)]
mod testing;

// Re-export key types at crate root for convenience.
pub use audio::AudioLevelController;
pub use catalog::DeviceCatalog;
pub use models::config::SessionConfiguration;
pub use models::device::{
    DeviceDescriptor, DeviceHandle, DeviceInfo, DevicePosition, DeviceType, DiscoveryQuery, FrameRateRange, MediaKind,
    Resolution, VideoFormat,
};
pub use models::error::CaptureError;
pub use models::event::{AdmissionReason, AdmissionRefusal, AdmissionTarget, SessionEvent};
pub use models::output::{OutputHandle, OutputRole, VideoCodec};
pub use models::permission::PermissionState;
pub use models::recording::{FinishedMovie, RecordingResult, RecordingState};
pub use models::sample::{SampleBuffer, SamplePayload};
pub use permission::{AuthorizationTicket, PermissionGate};
pub use recording::{generate_file_name, RecordingController};
pub use session::{CaptureSession, SessionManager};
pub use traits::authorization_provider::{AccessCallback, AuthorizationProvider};
pub use traits::capture_backend::{CaptureBackend, SampleBufferCallback};
pub use traits::capture_delegate::{RecordingDelegate, SessionDelegate};
pub use traits::capture_device::{CaptureDevice, ConfigurationGuard};
pub use traits::destination_chooser::{DestinationChooser, DestinationReply};
pub use traits::device_provider::DeviceProvider;
pub use traits::movie_muxer::{MovieMuxer, MovieSink, WriteRequest};
