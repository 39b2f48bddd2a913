use std::path::Path;

use crate::models::error::CaptureError;
use crate::models::event::SessionEvent;
use crate::models::output::OutputHandle;

/// Receives session events.
///
/// Called from the session work queue or the backend's capture thread, never
/// the UI thread. Implementations must not call back into the session
/// synchronously; marshal to another thread if needed.
pub trait SessionDelegate: Send + Sync {
    fn on_event(&self, event: &SessionEvent);
}

/// Recording completion delegate.
///
/// Called from the session work queue or the backend's capture thread, never
/// the UI thread. Implementations must not call back into the session
/// synchronously; marshal to another thread if needed.
pub trait RecordingDelegate: Send + Sync {
    /// Writing to `path` has begun.
    fn on_recording_started(&self, handle: OutputHandle, path: &Path) {
        let _ = (handle, path);
    }

    /// The movie file at `path` was finalized, successfully or with `error`.
    fn on_recording_finished(&self, handle: OutputHandle, path: &Path, error: Option<&CaptureError>);

    /// A recording never began, e.g. the session lost its video connection
    /// while the destination was being chosen.
    fn on_recording_aborted(&self, error: &CaptureError) {
        let _ = error;
    }
}
