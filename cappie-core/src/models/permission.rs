use serde::{Deserialize, Serialize};

/// Capture authorization for one media kind.
///
/// ```text
/// undetermined ──prompt──→ authorized
///              └─────────→ denied
/// restricted   (system policy, never changes)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Undetermined,
    Authorized,
    Restricted,
    Denied,
}

impl PermissionState {
    pub fn is_authorized(&self) -> bool {
        matches!(self, Self::Authorized)
    }

    /// Restricted and denied do not change for the lifetime of the process.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Restricted | Self::Denied)
    }
}
