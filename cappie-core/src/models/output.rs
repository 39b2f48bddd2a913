use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role an output plays in the session. At most one Preview and one Record
/// output exist at a time; audio forwarding is one output per audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OutputRole {
    Preview,
    Record,
    AudioForward,
}

impl fmt::Display for OutputRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preview => f.write_str("preview"),
            Self::Record => f.write_str("record"),
            Self::AudioForward => f.write_str("audio-forward"),
        }
    }
}

/// Identity of one attached output, stable for as long as it stays attached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutputHandle(Uuid);

impl OutputHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OutputHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OutputHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Video codec applied to a record output's video connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
    ProRes422,
    Jpeg,
}

impl VideoCodec {
    /// Four-character code written into movie containers.
    pub fn fourcc(&self) -> [u8; 4] {
        match self {
            Self::H264 => *b"avc1",
            Self::Hevc => *b"hvc1",
            Self::ProRes422 => *b"apcn",
            Self::Jpeg => *b"jpeg",
        }
    }

    /// Pick the first preferred codec the platform offers, else the first
    /// offered codec, else H.264.
    pub fn negotiate(preferred: &[VideoCodec], available: &[VideoCodec]) -> VideoCodec {
        preferred
            .iter()
            .find(|c| available.contains(c))
            .or_else(|| available.first())
            .copied()
            .unwrap_or(VideoCodec::H264)
    }
}
