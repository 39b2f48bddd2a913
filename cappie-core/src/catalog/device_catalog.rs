use std::sync::Arc;

use crate::models::device::{DeviceDescriptor, DiscoveryQuery, MediaKind};
use crate::models::error::CaptureError;
use crate::traits::device_provider::DeviceProvider;

/// Lists and looks up capture devices.
///
/// Holds no device state of its own: every query goes back to the provider,
/// so hot-plugged devices show up on the next call.
pub struct DeviceCatalog<P: DeviceProvider> {
    provider: Arc<P>,
}

impl<P: DeviceProvider> Clone for DeviceCatalog<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
        }
    }
}

impl<P: DeviceProvider> DeviceCatalog<P> {
    pub fn new(provider: Arc<P>) -> Self {
        Self { provider }
    }

    /// All connected devices of `kind`, in enumeration order.
    pub fn list_devices(&self, kind: MediaKind) -> Vec<DeviceDescriptor> {
        self.provider.enumerate(kind)
    }

    /// Devices matching `query`, in enumeration order.
    pub fn discover(&self, query: &DiscoveryQuery) -> Vec<DeviceDescriptor> {
        self.provider
            .enumerate(query.kind)
            .into_iter()
            .filter(|d| query.matches(d))
            .collect()
    }

    /// Devices of `kind` sorted by display name, descending (menu order).
    pub fn list_sorted(&self, kind: MediaKind) -> Vec<DeviceDescriptor> {
        let mut devices = self.discover(&DiscoveryQuery::new(kind));
        devices.sort_by(|a, b| b.display_name().cmp(a.display_name()));
        devices
    }

    pub fn default_device(&self, kind: MediaKind) -> Option<DeviceDescriptor> {
        self.provider.default_device(kind)
    }

    /// First device of `kind` whose display name contains `name` (case-sensitive),
    /// falling back to the platform default.
    pub fn find_device(&self, kind: MediaKind, name: &str) -> Result<DeviceDescriptor, CaptureError> {
        self.find_matching(&DiscoveryQuery::new(kind), name)
    }

    /// Like `find_device`, restricted to devices matching `query`.
    pub fn find_matching(&self, query: &DiscoveryQuery, name: &str) -> Result<DeviceDescriptor, CaptureError> {
        if let Some(found) = self
            .discover(query)
            .into_iter()
            .find(|d| d.display_name().contains(name))
        {
            return Ok(found);
        }

        match self.provider.default_device(query.kind) {
            Some(fallback) => {
                log::debug!(
                    "No {} device matches {:?}, using default {:?}",
                    query.kind,
                    name,
                    fallback.display_name()
                );
                Ok(fallback)
            }
            None => Err(CaptureError::DeviceNotFound {
                kind: query.kind,
                query: name.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::device::{DevicePosition, DeviceType};
    use crate::testing::{audio_device, video_device, video_device_with, FakeProvider};

    fn catalog(provider: FakeProvider) -> DeviceCatalog<FakeProvider> {
        DeviceCatalog::new(Arc::new(provider))
    }

    #[test]
    fn find_by_substring_returns_first_match() {
        let provider = FakeProvider::new(vec![
            video_device("FaceTime HD Camera", "cam-0", vec![]),
            video_device("USB Video Device", "usb-1", vec![]),
        ]);

        let found = catalog(provider).find_device(MediaKind::Video, "USB").unwrap();
        assert_eq!(found.display_name(), "USB Video Device");
    }

    #[test]
    fn find_is_case_sensitive_and_first_match_wins() {
        let provider = FakeProvider::new(vec![
            video_device("USB Video Device", "usb-1", vec![]),
            video_device("USB Video Device 2", "usb-2", vec![]),
        ]);
        let catalog = catalog(provider);

        assert_eq!(catalog.find_device(MediaKind::Video, "USB").unwrap().unique_id(), "usb-1");
        assert!(catalog.find_device(MediaKind::Video, "usb").is_err());
    }

    #[test]
    fn find_falls_back_to_default() {
        let default = video_device("FaceTime HD Camera", "cam-0", vec![]);
        let provider = FakeProvider::new(vec![
            default.clone(),
            video_device("USB Video Device", "usb-1", vec![]),
        ])
        .with_default(default);

        let found = catalog(provider).find_device(MediaKind::Video, "Zzz").unwrap();
        assert_eq!(found.display_name(), "FaceTime HD Camera");
    }

    #[test]
    fn find_without_default_fails() {
        let provider = FakeProvider::new(vec![video_device("USB Video Device", "usb-1", vec![])]);

        let err = catalog(provider).find_device(MediaKind::Video, "Zzz").unwrap_err();
        assert_eq!(
            err,
            CaptureError::DeviceNotFound {
                kind: MediaKind::Video,
                query: "Zzz".into()
            }
        );
    }

    #[test]
    fn list_enumerates_afresh() {
        let provider = Arc::new(FakeProvider::new(vec![video_device("FaceTime HD Camera", "cam-0", vec![])]));
        let catalog = DeviceCatalog::new(Arc::clone(&provider));
        assert_eq!(catalog.list_devices(MediaKind::Video).len(), 1);

        provider.plug(video_device("USB Video Device", "usb-1", vec![]));
        assert_eq!(catalog.list_devices(MediaKind::Video).len(), 2);

        provider.unplug("cam-0");
        let names: Vec<_> = catalog
            .list_devices(MediaKind::Video)
            .iter()
            .map(|d| d.display_name().to_string())
            .collect();
        assert_eq!(names, vec!["USB Video Device"]);
    }

    #[test]
    fn list_filters_by_kind() {
        let provider = FakeProvider::new(vec![
            video_device("FaceTime HD Camera", "cam-0", vec![]),
            audio_device("MacBook Pro Microphone", "mic-0"),
        ]);
        let catalog = catalog(provider);

        assert_eq!(catalog.list_devices(MediaKind::Audio).len(), 1);
        assert!(catalog.find_device(MediaKind::Audio, "FaceTime").is_err());
    }

    #[test]
    fn discover_honors_type_and_position() {
        let provider = FakeProvider::new(vec![
            video_device_with("Front Camera", "front", DeviceType::BuiltInWideAngleCamera, DevicePosition::Front),
            video_device_with("Desk View", "desk", DeviceType::DeskViewCamera, DevicePosition::Unspecified),
            video_device_with("Back Camera", "back", DeviceType::BuiltInWideAngleCamera, DevicePosition::Back),
        ]);
        let catalog = catalog(provider);

        let default_query: Vec<_> = catalog
            .discover(&DiscoveryQuery::new(MediaKind::Video))
            .iter()
            .map(|d| d.unique_id().to_string())
            .collect();
        assert_eq!(default_query, vec!["front", "back"]);

        let back_only = catalog.discover(&DiscoveryQuery::new(MediaKind::Video).with_position(DevicePosition::Back));
        assert_eq!(back_only.len(), 1);
        assert_eq!(back_only[0].unique_id(), "back");

        let desk = catalog.discover(&DiscoveryQuery::new(MediaKind::Video).with_device_types([DeviceType::DeskViewCamera]));
        assert_eq!(desk[0].display_name(), "Desk View");
    }

    #[test]
    fn list_sorted_is_descending_by_name() {
        let provider = FakeProvider::new(vec![
            video_device("FaceTime HD Camera", "cam-0", vec![]),
            video_device("USB Video Device", "usb-1", vec![]),
            video_device("Capture Card", "cc-2", vec![]),
        ]);

        let names: Vec<_> = catalog(provider)
            .list_sorted(MediaKind::Video)
            .iter()
            .map(|d| d.display_name().to_string())
            .collect();
        assert_eq!(names, vec!["USB Video Device", "FaceTime HD Camera", "Capture Card"]);
    }
}
