//! JSON sidecar describing a finished movie.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use cappie_core::models::device::{DeviceDescriptor, DeviceInfo};
use cappie_core::models::error::CaptureError;
use cappie_core::models::recording::RecordingResult;

use crate::muxer;

/// Contents of `<movie>.metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovieSidecar {
    #[serde(flatten)]
    pub recording: RecordingResult,
    /// Devices feeding the session when the recording finished.
    pub sources: Vec<DeviceInfo>,
    /// Counts read back from the container header.
    pub container_video_frames: u64,
    pub container_audio_chunks: u64,
}

pub fn sidecar_path(movie: &Path) -> PathBuf {
    movie.with_extension("metadata.json")
}

/// Write the sidecar next to `result.file_path`.
///
/// The movie must already be finalized; its header counts are copied in so
/// the sidecar can be checked against the file without parsing it again.
pub fn write_metadata(result: &RecordingResult, sources: &[DeviceDescriptor]) -> Result<MovieSidecar, CaptureError> {
    let header = muxer::read_header(&result.file_path)?;
    let sidecar = MovieSidecar {
        recording: result.clone(),
        sources: sources.iter().map(DeviceInfo::from).collect(),
        container_video_frames: header.video_frames,
        container_audio_chunks: header.audio_chunks,
    };
    if header.video_frames != result.frames_written {
        log::warn!(
            "{} reports {} frames but the session counted {}",
            result.file_path.display(),
            header.video_frames,
            result.frames_written
        );
    }

    let json = serde_json::to_string_pretty(&sidecar)
        .map_err(|e| CaptureError::StorageError(format!("failed to serialize metadata: {}", e)))?;
    fs::write(sidecar_path(&result.file_path), json)
        .map_err(|e| CaptureError::StorageError(format!("failed to write metadata: {}", e)))?;
    Ok(sidecar)
}

pub fn read_metadata(movie: &Path) -> Result<MovieSidecar, CaptureError> {
    let json = fs::read_to_string(sidecar_path(movie))
        .map_err(|e| CaptureError::StorageError(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json).map_err(|e| CaptureError::StorageError(format!("failed to parse metadata: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    use cappie_core::models::device::MediaKind;
    use cappie_core::models::output::{OutputHandle, VideoCodec};
    use cappie_core::traits::movie_muxer::{MovieMuxer, WriteRequest};

    use crate::muxer::FileMuxer;
    use crate::provider::VirtualDeviceProvider;
    use cappie_core::traits::device_provider::DeviceProvider;

    #[test]
    fn sidecar_lists_sources_and_container_counts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("take.mov");
        let handle = OutputHandle::new();
        let request = WriteRequest {
            handle,
            path: path.clone(),
            codec: VideoCodec::H264,
        };
        let finished = FileMuxer::new().start_writing(&request).unwrap().finish().unwrap();
        let result = RecordingResult {
            handle,
            file_path: path.clone(),
            codec: VideoCodec::H264,
            frames_written: 0,
            bytes_written: finished.bytes_written,
            duration_secs: 0.0,
            started_at: "2026-01-01T00:00:00+00:00".into(),
            checksum: finished.checksum,
        };
        let provider = VirtualDeviceProvider::with_builtin_devices();
        let camera = provider.default_device(MediaKind::Video).unwrap();

        write_metadata(&result, &[camera]).unwrap();
        let sidecar = read_metadata(&path).unwrap();

        assert_eq!(sidecar.recording.handle, handle);
        assert_eq!(sidecar.recording.checksum, result.checksum);
        assert_eq!(sidecar.sources.len(), 1);
        assert_eq!(sidecar.sources[0].unique_id, "builtin-camera");
        assert_eq!(sidecar.container_video_frames, 0);
        assert!(sidecar_path(&path).ends_with("take.metadata.json"));
    }

    #[test]
    fn missing_movie_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.mov");
        assert!(matches!(read_metadata(&path), Err(CaptureError::StorageError(_))));
    }
}
