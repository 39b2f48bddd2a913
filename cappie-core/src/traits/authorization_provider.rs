use crate::models::device::MediaKind;
use crate::models::permission::PermissionState;

/// Delivers the outcome of a platform authorization prompt: `true` if granted.
pub type AccessCallback = Box<dyn FnOnce(bool) + Send + 'static>;

/// Platform capture-authorization API.
pub trait AuthorizationProvider: Send + Sync {
    /// Current authorization. Must not block.
    fn authorization_status(&self, kind: MediaKind) -> PermissionState;

    /// Show the user-facing prompt for `kind`.
    ///
    /// `callback` fires at most once, on a thread of the platform's choosing.
    /// It may never fire at all.
    fn request_access(&self, kind: MediaKind, callback: AccessCallback);
}
