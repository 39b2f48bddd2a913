use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::output::{OutputHandle, VideoCodec};

/// Public state of the recording toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingState {
    Idle,
    Recording { handle: OutputHandle, path: PathBuf },
}

impl RecordingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }
}

/// What the muxer reports once a movie file is finalized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinishedMovie {
    pub bytes_written: u64,
    /// Hex SHA-256 of the finished file, when the muxer computes one.
    pub checksum: Option<String>,
}

/// Summary of a finished recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingResult {
    pub handle: OutputHandle,
    pub file_path: PathBuf,
    pub codec: VideoCodec,
    pub frames_written: u64,
    pub bytes_written: u64,
    pub duration_secs: f64,
    pub started_at: String,
    pub checksum: Option<String>,
}
