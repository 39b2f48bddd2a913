//! In-memory stand-ins for the platform traits, shared by the unit tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::device::{
    DeviceDescriptor, DeviceHandle, DevicePosition, DeviceType, MediaKind, Resolution, VideoFormat,
};
use crate::models::error::CaptureError;
use crate::models::event::{AdmissionRefusal, SessionEvent};
use crate::models::output::{OutputHandle, OutputRole, VideoCodec};
use crate::models::permission::PermissionState;
use crate::models::recording::FinishedMovie;
use crate::models::sample::{SampleBuffer, SamplePayload};
use crate::traits::authorization_provider::{AccessCallback, AuthorizationProvider};
use crate::traits::capture_backend::{CaptureBackend, SampleBufferCallback};
use crate::traits::capture_delegate::{RecordingDelegate, SessionDelegate};
use crate::traits::capture_device::CaptureDevice;
use crate::traits::destination_chooser::{DestinationChooser, DestinationReply};
use crate::traits::device_provider::DeviceProvider;
use crate::traits::movie_muxer::{MovieMuxer, MovieSink, WriteRequest};

// --- Devices ---

pub struct FakeDevice {
    id: String,
    formats: Vec<VideoFormat>,
    active: Mutex<Option<(VideoFormat, f64)>>,
    locked: AtomicBool,
    lock_attempts: AtomicUsize,
    held_elsewhere: AtomicBool,
    fail_next_set: AtomicBool,
}

impl FakeDevice {
    pub fn video(id: &str, formats: Vec<VideoFormat>) -> Self {
        Self {
            id: id.to_string(),
            formats,
            active: Mutex::new(None),
            locked: AtomicBool::new(false),
            lock_attempts: AtomicUsize::new(0),
            held_elsewhere: AtomicBool::new(false),
            fail_next_set: AtomicBool::new(false),
        }
    }

    pub fn audio(id: &str) -> Self {
        Self::video(id, Vec::new())
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    pub fn lock_attempts(&self) -> usize {
        self.lock_attempts.load(Ordering::SeqCst)
    }

    pub fn hold_lock_elsewhere(&self, held: bool) {
        self.held_elsewhere.store(held, Ordering::SeqCst);
    }

    pub fn fail_next_set(&self) {
        self.fail_next_set.store(true, Ordering::SeqCst);
    }
}

impl CaptureDevice for FakeDevice {
    fn unique_id(&self) -> &str {
        &self.id
    }

    fn formats(&self) -> Vec<VideoFormat> {
        self.formats.clone()
    }

    fn active_format(&self) -> Option<VideoFormat> {
        self.active.lock().as_ref().map(|(f, _)| f.clone())
    }

    fn active_frame_rate(&self) -> Option<f64> {
        self.active.lock().as_ref().map(|(_, rate)| *rate)
    }

    fn lock_for_configuration(&self) -> Result<(), CaptureError> {
        self.lock_attempts.fetch_add(1, Ordering::SeqCst);
        if self.held_elsewhere.load(Ordering::SeqCst) {
            return Err(CaptureError::ConfigurationLocked(self.id.clone()));
        }
        self.locked.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn unlock_for_configuration(&self) {
        self.locked.store(false, Ordering::SeqCst);
    }

    fn set_active_format(&self, format: &VideoFormat, frame_rate: f64) -> Result<(), CaptureError> {
        assert!(self.is_locked(), "format changed without the configuration lock");
        if self.fail_next_set.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::Unknown("device rejected format".into()));
        }
        *self.active.lock() = Some((format.clone(), frame_rate));
        Ok(())
    }
}

pub fn video_device(name: &str, id: &str, formats: Vec<VideoFormat>) -> DeviceDescriptor {
    DeviceDescriptor::new(
        name,
        MediaKind::Video,
        [DeviceType::BuiltInWideAngleCamera],
        DevicePosition::Unspecified,
        DeviceHandle::new(Arc::new(FakeDevice::video(id, formats))),
    )
}

pub fn video_device_with(name: &str, id: &str, device_type: DeviceType, position: DevicePosition) -> DeviceDescriptor {
    DeviceDescriptor::new(
        name,
        MediaKind::Video,
        [device_type],
        position,
        DeviceHandle::new(Arc::new(FakeDevice::video(id, Vec::new()))),
    )
}

pub fn audio_device(name: &str, id: &str) -> DeviceDescriptor {
    DeviceDescriptor::new(
        name,
        MediaKind::Audio,
        [DeviceType::BuiltInMicrophone],
        DevicePosition::Unspecified,
        DeviceHandle::new(Arc::new(FakeDevice::audio(id))),
    )
}

pub struct FakeProvider {
    devices: Mutex<Vec<DeviceDescriptor>>,
    default: Option<DeviceDescriptor>,
}

impl FakeProvider {
    pub fn new(devices: Vec<DeviceDescriptor>) -> Self {
        Self {
            devices: Mutex::new(devices),
            default: None,
        }
    }

    pub fn with_default(mut self, device: DeviceDescriptor) -> Self {
        self.default = Some(device);
        self
    }

    pub fn plug(&self, device: DeviceDescriptor) {
        self.devices.lock().push(device);
    }

    pub fn unplug(&self, unique_id: &str) {
        self.devices.lock().retain(|d| d.unique_id() != unique_id);
    }
}

impl DeviceProvider for FakeProvider {
    fn enumerate(&self, kind: MediaKind) -> Vec<DeviceDescriptor> {
        self.devices.lock().iter().filter(|d| d.kind() == kind).cloned().collect()
    }

    fn default_device(&self, kind: MediaKind) -> Option<DeviceDescriptor> {
        self.default.clone().filter(|d| d.kind() == kind)
    }
}

// --- Authorization ---

#[derive(Default)]
pub struct FakeAuthorizer {
    statuses: Mutex<HashMap<MediaKind, PermissionState>>,
    prompts: Mutex<HashMap<MediaKind, usize>>,
    callbacks: Mutex<HashMap<MediaKind, Vec<AccessCallback>>>,
}

impl FakeAuthorizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn authorized() -> Self {
        let authorizer = Self::new();
        authorizer.set_status(MediaKind::Video, PermissionState::Authorized);
        authorizer.set_status(MediaKind::Audio, PermissionState::Authorized);
        authorizer
    }

    pub fn set_status(&self, kind: MediaKind, state: PermissionState) {
        self.statuses.lock().insert(kind, state);
    }

    pub fn prompt_count(&self, kind: MediaKind) -> usize {
        self.prompts.lock().get(&kind).copied().unwrap_or(0)
    }

    /// Simulate the user answering every open prompt for `kind`.
    pub fn answer(&self, kind: MediaKind, granted: bool) {
        let state = if granted { PermissionState::Authorized } else { PermissionState::Denied };
        self.set_status(kind, state);
        let callbacks = self.callbacks.lock().remove(&kind).unwrap_or_default();
        for callback in callbacks {
            callback(granted);
        }
    }

    /// Simulate the platform dropping its callbacks without answering.
    pub fn dismiss(&self, kind: MediaKind) {
        let callbacks = self.callbacks.lock().remove(&kind);
        drop(callbacks);
    }
}

impl AuthorizationProvider for FakeAuthorizer {
    fn authorization_status(&self, kind: MediaKind) -> PermissionState {
        self.statuses.lock().get(&kind).copied().unwrap_or(PermissionState::Undetermined)
    }

    fn request_access(&self, kind: MediaKind, callback: AccessCallback) {
        *self.prompts.lock().entry(kind).or_default() += 1;
        self.callbacks.lock().entry(kind).or_default().push(callback);
    }
}

// --- Backend ---

pub fn video_frame(source_id: &str, index: u64) -> SampleBuffer {
    SampleBuffer {
        source_id: source_id.to_string(),
        presentation_time: Duration::from_millis(index * 33),
        payload: SamplePayload::Video {
            resolution: Resolution::new(2, 2),
            data: vec![index as u8; 4],
        },
    }
}

pub fn audio_chunk(source_id: &str, samples: Vec<f32>) -> SampleBuffer {
    SampleBuffer {
        source_id: source_id.to_string(),
        presentation_time: Duration::ZERO,
        payload: SamplePayload::Audio {
            samples,
            sample_rate: 48_000.0,
            channels: 1,
        },
    }
}

pub struct FakeBackend {
    running: AtomicBool,
    start_count: AtomicUsize,
    callback: Mutex<Option<SampleBufferCallback>>,
    inputs: Mutex<Vec<String>>,
    reject_inputs: AtomicBool,
    rejected_roles: Mutex<Vec<OutputRole>>,
    codecs: Mutex<Vec<VideoCodec>>,
    rendered: Mutex<Vec<(String, SampleBuffer)>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
            start_count: AtomicUsize::new(0),
            callback: Mutex::new(None),
            inputs: Mutex::new(Vec::new()),
            reject_inputs: AtomicBool::new(false),
            rejected_roles: Mutex::new(Vec::new()),
            codecs: Mutex::new(vec![VideoCodec::H264, VideoCodec::Hevc]),
            rendered: Mutex::new(Vec::new()),
        }
    }

    pub fn reject_inputs(&self, reject: bool) {
        self.reject_inputs.store(reject, Ordering::SeqCst);
    }

    pub fn reject_output(&self, role: OutputRole) {
        self.rejected_roles.lock().push(role);
    }

    pub fn set_codecs(&self, codecs: Vec<VideoCodec>) {
        *self.codecs.lock() = codecs;
    }

    pub fn attached_inputs(&self) -> Vec<String> {
        self.inputs.lock().clone()
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn rendered(&self) -> Vec<(String, SampleBuffer)> {
        self.rendered.lock().clone()
    }

    fn deliver(&self, sample: &SampleBuffer) {
        let callback = self.callback.lock().clone();
        if let Some(callback) = callback {
            callback(sample);
        }
    }

    /// Push `count` video frames through the pipeline if it is running.
    pub fn emit_video(&self, source_id: &str, count: u64) {
        for index in 0..count {
            self.deliver(&video_frame(source_id, index));
        }
    }

    pub fn emit_audio(&self, source_id: &str, samples: Vec<f32>) {
        self.deliver(&audio_chunk(source_id, samples));
    }
}

impl CaptureBackend for FakeBackend {
    fn can_add_input(&self, _device: &DeviceDescriptor) -> bool {
        !self.reject_inputs.load(Ordering::SeqCst)
    }

    fn can_add_output(&self, role: OutputRole) -> bool {
        !self.rejected_roles.lock().contains(&role)
    }

    fn attach_input(&self, device: &DeviceDescriptor) -> Result<(), CaptureError> {
        self.inputs.lock().push(device.unique_id().to_string());
        Ok(())
    }

    fn detach_input(&self, device: &DeviceDescriptor) {
        self.inputs.lock().retain(|id| id != device.unique_id());
    }

    fn available_video_codecs(&self) -> Vec<VideoCodec> {
        self.codecs.lock().clone()
    }

    fn start_running(&self, callback: SampleBufferCallback) -> Result<(), CaptureError> {
        *self.callback.lock() = Some(callback);
        self.running.store(true, Ordering::SeqCst);
        self.start_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop_running(&self) -> Result<(), CaptureError> {
        self.callback.lock().take();
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn render_audio(&self, device_id: &str, sample: &SampleBuffer) {
        self.rendered.lock().push((device_id.to_string(), sample.clone()));
    }
}

// --- Muxer ---

#[derive(Default)]
struct MuxLog {
    started: Vec<WriteRequest>,
    finished: Vec<PathBuf>,
    appended: usize,
}

#[derive(Default)]
pub struct FakeMuxer {
    log: Arc<Mutex<MuxLog>>,
    fail_start: AtomicBool,
}

impl FakeMuxer {
    pub fn fail_start(&self, fail: bool) {
        self.fail_start.store(fail, Ordering::SeqCst);
    }

    pub fn started(&self) -> Vec<WriteRequest> {
        self.log.lock().started.clone()
    }

    pub fn started_paths(&self) -> Vec<PathBuf> {
        self.log.lock().started.iter().map(|r| r.path.clone()).collect()
    }

    pub fn finished_paths(&self) -> Vec<PathBuf> {
        self.log.lock().finished.clone()
    }

    pub fn appended(&self) -> usize {
        self.log.lock().appended
    }
}

impl MovieMuxer for FakeMuxer {
    fn start_writing(&self, request: &WriteRequest) -> Result<Box<dyn MovieSink>, CaptureError> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(CaptureError::StorageError(format!("cannot create {}", request.path.display())));
        }
        self.log.lock().started.push(request.clone());
        Ok(Box::new(FakeSink {
            path: request.path.clone(),
            bytes: 0,
            log: Arc::clone(&self.log),
        }))
    }
}

struct FakeSink {
    path: PathBuf,
    bytes: u64,
    log: Arc<Mutex<MuxLog>>,
}

impl MovieSink for FakeSink {
    fn append(&mut self, sample: &SampleBuffer) -> Result<(), CaptureError> {
        self.bytes += sample.byte_len() as u64;
        self.log.lock().appended += 1;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<FinishedMovie, CaptureError> {
        self.log.lock().finished.push(self.path.clone());
        Ok(FinishedMovie {
            bytes_written: self.bytes,
            checksum: None,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

// --- Chooser ---

/// Holds each reply until the test decides what the "user" does with it.
#[derive(Default)]
pub struct HeldChooser {
    suggested: Mutex<Vec<String>>,
    pending: Mutex<Option<DestinationReply>>,
}

impl HeldChooser {
    pub fn suggested(&self) -> Vec<String> {
        self.suggested.lock().clone()
    }

    pub fn reply(&self, path: Option<PathBuf>) {
        let reply = self.pending.lock().take();
        if let Some(reply) = reply {
            reply(path);
        }
    }

    pub fn drop_reply(&self) {
        let reply = self.pending.lock().take();
        drop(reply);
    }
}

impl DestinationChooser for HeldChooser {
    fn choose(&self, suggested_name: &str, reply: DestinationReply) {
        self.suggested.lock().push(suggested_name.to_string());
        *self.pending.lock() = Some(reply);
    }
}

// --- Delegates ---

#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<SessionEvent>>,
}

impl EventLog {
    pub fn events(&self) -> Vec<SessionEvent> {
        self.events.lock().clone()
    }

    pub fn refusals(&self) -> Vec<AdmissionRefusal> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::AdmissionRefused(refusal) => Some(refusal.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn skipped(&self) -> Vec<CaptureError> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SessionEvent::ConfigurationSkipped { error, .. } => Some(error.clone()),
                _ => None,
            })
            .collect()
    }
}

impl SessionDelegate for EventLog {
    fn on_event(&self, event: &SessionEvent) {
        self.events.lock().push(event.clone());
    }
}

#[derive(Default)]
pub struct RecordingLog {
    pub started: Mutex<Vec<(OutputHandle, PathBuf)>>,
    pub finished: Mutex<Vec<(OutputHandle, PathBuf, Option<CaptureError>)>>,
    pub aborted: Mutex<Vec<CaptureError>>,
}

impl RecordingDelegate for RecordingLog {
    fn on_recording_started(&self, handle: OutputHandle, path: &Path) {
        self.started.lock().push((handle, path.to_path_buf()));
    }

    fn on_recording_finished(&self, handle: OutputHandle, path: &Path, error: Option<&CaptureError>) {
        self.finished.lock().push((handle, path.to_path_buf(), error.cloned()));
    }

    fn on_recording_aborted(&self, error: &CaptureError) {
        self.aborted.lock().push(error.clone());
    }
}
