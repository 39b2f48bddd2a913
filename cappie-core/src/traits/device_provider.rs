use crate::models::device::{DeviceDescriptor, MediaKind};

/// Platform device discovery.
///
/// Every call enumerates afresh; devices come and go while the process runs.
pub trait DeviceProvider: Send + Sync {
    /// Connected devices of `kind`, in platform enumeration order.
    fn enumerate(&self, kind: MediaKind) -> Vec<DeviceDescriptor>;

    /// The system default device for `kind`, if there is one.
    fn default_device(&self, kind: MediaKind) -> Option<DeviceDescriptor>;
}
