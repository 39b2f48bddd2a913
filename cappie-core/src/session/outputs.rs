use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use crate::models::device::MediaKind;
use crate::models::error::CaptureError;
use crate::models::event::AdmissionReason;
use crate::models::output::{OutputHandle, OutputRole, VideoCodec};
use crate::models::recording::RecordingResult;
use crate::models::sample::SampleBuffer;
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::capture_delegate::RecordingDelegate;
use crate::traits::movie_muxer::MovieSink;

/// Receives every video sample reaching the preview output.
pub type PreviewCallback = Arc<dyn Fn(&SampleBuffer) + Send + Sync + 'static>;

/// Live on-screen preview.
pub struct PreviewOutput {
    handle: OutputHandle,
    callback: Option<PreviewCallback>,
    frames_delivered: u64,
}

impl PreviewOutput {
    pub fn new(callback: Option<PreviewCallback>) -> Self {
        Self {
            handle: OutputHandle::new(),
            callback,
            frames_delivered: 0,
        }
    }

    pub fn handle(&self) -> OutputHandle {
        self.handle
    }

    pub fn frames_delivered(&self) -> u64 {
        self.frames_delivered
    }
}

/// Forwards captured audio to an output device at an adjustable volume.
///
/// `mute` snapshots the current volume and `unmute` restores that snapshot,
/// so any number of mute/unmute pairs round-trips the level it had before muting.
pub struct AudioPreviewOutput {
    handle: OutputHandle,
    device_id: String,
    volume: f32,
    saved_volume: f32,
    muted: bool,
    buffers_rendered: u64,
}

impl AudioPreviewOutput {
    pub fn new(device_id: impl Into<String>, volume: f32) -> Self {
        let volume = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            log::debug!("Ignoring non-finite initial volume {}, using 1.0", volume);
            1.0
        };
        Self {
            handle: OutputHandle::new(),
            device_id: device_id.into(),
            volume,
            saved_volume: 1.0,
            muted: false,
            buffers_rendered: 0,
        }
    }

    pub fn handle(&self) -> OutputHandle {
        self.handle
    }

    /// Unique id of the device audio is forwarded to.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Clamp to 0.0–1.0. Non-finite values are ignored.
    pub fn set_volume(&mut self, volume: f32) {
        if !volume.is_finite() {
            log::debug!("Ignoring non-finite volume {} for {}", volume, self.device_id);
            return;
        }
        self.volume = volume.clamp(0.0, 1.0);
        self.muted = false;
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn mute(&mut self) {
        if self.muted {
            return;
        }
        self.saved_volume = self.volume;
        self.volume = 0.0;
        self.muted = true;
    }

    pub fn unmute(&mut self) {
        if self.muted || self.volume == 0.0 {
            self.volume = self.saved_volume;
        }
        self.muted = false;
    }

    pub fn buffers_rendered(&self) -> u64 {
        self.buffers_rendered
    }
}

struct ActiveWrite {
    path: PathBuf,
    codec: VideoCodec,
    sink: Box<dyn MovieSink>,
    started: Instant,
    started_at: String,
    frames_written: u64,
    write_error: Option<CaptureError>,
}

/// Writes the session's samples to a movie file.
///
/// Attached first, writing later: the output can sit in the session while a
/// destination is being chosen, dropping nothing once writing starts.
pub struct MovieFileOutput {
    handle: OutputHandle,
    delegate: Option<Arc<dyn RecordingDelegate>>,
    writing: Option<ActiveWrite>,
}

impl MovieFileOutput {
    pub fn new(delegate: Option<Arc<dyn RecordingDelegate>>) -> Self {
        Self {
            handle: OutputHandle::new(),
            delegate,
            writing: None,
        }
    }

    pub fn handle(&self) -> OutputHandle {
        self.handle
    }

    pub fn is_writing(&self) -> bool {
        self.writing.is_some()
    }

    pub fn destination(&self) -> Option<&Path> {
        self.writing.as_ref().map(|w| w.path.as_path())
    }

    pub fn codec(&self) -> Option<VideoCodec> {
        self.writing.as_ref().map(|w| w.codec)
    }

    /// Video frames appended since writing began.
    pub fn frames_written(&self) -> u64 {
        self.writing.as_ref().map(|w| w.frames_written).unwrap_or(0)
    }

    pub fn start_writing(&mut self, sink: Box<dyn MovieSink>, codec: VideoCodec) -> Result<(), CaptureError> {
        if self.writing.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }
        let path = sink.path().to_path_buf();
        log::info!("Recording {} to {} ({:?})", self.handle, path.display(), codec);

        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_started(self.handle, &path);
        }
        self.writing = Some(ActiveWrite {
            path,
            codec,
            sink,
            started: Instant::now(),
            started_at: chrono::Utc::now().to_rfc3339(),
            frames_written: 0,
            write_error: None,
        });
        Ok(())
    }

    fn append(&mut self, sample: &SampleBuffer) {
        let Some(ref mut write) = self.writing else {
            return;
        };
        if write.write_error.is_some() {
            return;
        }
        match write.sink.append(sample) {
            Ok(()) => {
                if sample.kind() == MediaKind::Video {
                    write.frames_written += 1;
                }
            }
            Err(e) => {
                log::error!("Failed to append sample to {}: {}", write.path.display(), e);
                write.write_error = Some(e);
            }
        }
    }

    /// Finalize the file, notify the delegate, and return the result.
    ///
    /// Returns None when nothing was being written.
    pub fn finish_writing(&mut self) -> Option<RecordingResult> {
        let write = self.writing.take()?;
        let duration_secs = write.started.elapsed().as_secs_f64();
        let frames_written = write.frames_written;
        let path = write.path;

        let finished = match write.write_error {
            Some(e) => {
                let _ = write.sink.finish();
                Err(e)
            }
            None => write.sink.finish(),
        };

        let (bytes_written, checksum, error) = match finished {
            Ok(movie) => (movie.bytes_written, movie.checksum, None),
            Err(e) => {
                log::error!("Recording to {} finished with error: {}", path.display(), e);
                (0, None, Some(e))
            }
        };

        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_finished(self.handle, &path, error.as_ref());
        }
        log::info!("Recording {} finished: {} frames in {:.2}s", self.handle, frames_written, duration_secs);

        Some(RecordingResult {
            handle: self.handle,
            file_path: path,
            codec: write.codec,
            frames_written,
            bytes_written,
            duration_secs,
            started_at: write.started_at,
            checksum,
        })
    }
}

/// Any output attached to the session.
pub enum Output {
    Preview(PreviewOutput),
    Record(MovieFileOutput),
    AudioForward(AudioPreviewOutput),
}

impl Output {
    pub fn role(&self) -> OutputRole {
        match self {
            Self::Preview(_) => OutputRole::Preview,
            Self::Record(_) => OutputRole::Record,
            Self::AudioForward(_) => OutputRole::AudioForward,
        }
    }

    pub fn handle(&self) -> OutputHandle {
        match self {
            Self::Preview(o) => o.handle(),
            Self::Record(o) => o.handle(),
            Self::AudioForward(o) => o.handle(),
        }
    }
}

/// The session's outputs, keyed by role.
///
/// Typed accessors replace "first output of type X" lookups; `order` keeps
/// attach order for listing.
#[derive(Default)]
pub struct OutputRegistry {
    preview: Option<PreviewOutput>,
    record: Option<MovieFileOutput>,
    audio_forward: Vec<AudioPreviewOutput>,
    order: Vec<(OutputRole, OutputHandle)>,
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Roles of the attached outputs, in attach order.
    pub fn roles(&self) -> Vec<OutputRole> {
        self.order.iter().map(|(role, _)| *role).collect()
    }

    pub fn contains(&self, handle: OutputHandle) -> bool {
        self.order.iter().any(|(_, h)| *h == handle)
    }

    /// Session half of the output admission check.
    pub fn admits(&self, output: &Output) -> Result<(), AdmissionReason> {
        match output {
            Output::Preview(_) if self.preview.is_some() => Err(AdmissionReason::RoleOccupied),
            Output::Record(_) if self.record.is_some() => Err(AdmissionReason::RoleOccupied),
            Output::AudioForward(o) if self.audio_forward.iter().any(|a| a.device_id == o.device_id) => {
                Err(AdmissionReason::DuplicateDevice)
            }
            _ => Ok(()),
        }
    }

    /// Insert an admitted output. Callers check `admits` first.
    pub(crate) fn insert(&mut self, output: Output) -> OutputHandle {
        let role = output.role();
        let handle = output.handle();
        match output {
            Output::Preview(o) => self.preview = Some(o),
            Output::Record(o) => self.record = Some(o),
            Output::AudioForward(o) => self.audio_forward.push(o),
        }
        self.order.push((role, handle));
        handle
    }

    pub(crate) fn remove(&mut self, handle: OutputHandle) -> Option<Output> {
        let index = self.order.iter().position(|(_, h)| *h == handle)?;
        let (role, _) = self.order.remove(index);
        match role {
            OutputRole::Preview => self.preview.take().map(Output::Preview),
            OutputRole::Record => self.record.take().map(Output::Record),
            OutputRole::AudioForward => {
                let i = self.audio_forward.iter().position(|o| o.handle == handle)?;
                Some(Output::AudioForward(self.audio_forward.remove(i)))
            }
        }
    }

    /// Remove every output, returned in attach order.
    pub(crate) fn drain(&mut self) -> Vec<Output> {
        let handles: Vec<_> = self.order.iter().map(|(_, h)| *h).collect();
        handles.into_iter().filter_map(|h| self.remove(h)).collect()
    }

    pub fn preview(&self) -> Option<&PreviewOutput> {
        self.preview.as_ref()
    }

    pub fn record(&self) -> Option<&MovieFileOutput> {
        self.record.as_ref()
    }

    pub fn record_mut(&mut self) -> Option<&mut MovieFileOutput> {
        self.record.as_mut()
    }

    /// First audio-forward output, by attach order.
    pub fn audio_forward(&self) -> Option<&AudioPreviewOutput> {
        self.audio_forward.first()
    }

    pub fn audio_forward_mut(&mut self) -> Option<&mut AudioPreviewOutput> {
        self.audio_forward.first_mut()
    }

    /// Route one sample to every output that consumes it.
    pub fn dispatch(&mut self, sample: &SampleBuffer, backend: &dyn CaptureBackend) {
        match sample.kind() {
            MediaKind::Video => {
                if let Some(ref mut preview) = self.preview {
                    preview.frames_delivered += 1;
                    if let Some(ref callback) = preview.callback {
                        callback(sample);
                    }
                }
            }
            MediaKind::Audio => {
                for forward in &mut self.audio_forward {
                    backend.render_audio(&forward.device_id, &sample.with_gain(forward.volume));
                    forward.buffers_rendered += 1;
                }
            }
        }

        if let Some(ref mut record) = self.record {
            record.append(sample);
        }
    }
}
