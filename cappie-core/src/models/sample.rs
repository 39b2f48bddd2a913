use std::time::Duration;

use super::device::{MediaKind, Resolution};

/// Payload of one captured sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplePayload {
    /// One video frame, packed pixel data.
    Video { resolution: Resolution, data: Vec<u8> },
    /// Interleaved f32 audio samples.
    Audio {
        samples: Vec<f32>,
        sample_rate: f64,
        channels: u16,
    },
}

/// A timestamped sample delivered by the capture backend to the session's outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Unique id of the input device that produced the sample.
    pub source_id: String,
    pub presentation_time: Duration,
    pub payload: SamplePayload,
}

impl SampleBuffer {
    pub fn kind(&self) -> MediaKind {
        match self.payload {
            SamplePayload::Video { .. } => MediaKind::Video,
            SamplePayload::Audio { .. } => MediaKind::Audio,
        }
    }

    /// Size of the payload in bytes as it would be written to a container.
    pub fn byte_len(&self) -> usize {
        match &self.payload {
            SamplePayload::Video { data, .. } => data.len(),
            SamplePayload::Audio { samples, .. } => samples.len() * std::mem::size_of::<f32>(),
        }
    }

    /// Copy of this sample with audio scaled by `gain`. Video is returned unchanged.
    pub fn with_gain(&self, gain: f32) -> SampleBuffer {
        let payload = match &self.payload {
            SamplePayload::Audio {
                samples,
                sample_rate,
                channels,
            } => SamplePayload::Audio {
                samples: samples.iter().map(|s| s * gain).collect(),
                sample_rate: *sample_rate,
                channels: *channels,
            },
            video => video.clone(),
        };
        SampleBuffer {
            source_id: self.source_id.clone(),
            presentation_time: self.presentation_time,
            payload,
        }
    }
}
