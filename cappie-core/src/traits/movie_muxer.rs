use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::output::{OutputHandle, VideoCodec};
use crate::models::recording::FinishedMovie;
use crate::models::sample::SampleBuffer;

/// Parameters of one movie file write.
#[derive(Debug, Clone, PartialEq)]
pub struct WriteRequest {
    pub handle: OutputHandle,
    pub path: PathBuf,
    pub codec: VideoCodec,
}

/// External movie muxing and encoding collaborator.
pub trait MovieMuxer: Send + Sync {
    /// Create the file at `request.path` and return a sink for its samples.
    fn start_writing(&self, request: &WriteRequest) -> Result<Box<dyn MovieSink>, CaptureError>;
}

/// An open movie file.
pub trait MovieSink: Send {
    fn append(&mut self, sample: &SampleBuffer) -> Result<(), CaptureError>;

    /// Finalize the container. The sink is consumed either way.
    fn finish(self: Box<Self>) -> Result<FinishedMovie, CaptureError>;

    fn path(&self) -> &Path;
}
