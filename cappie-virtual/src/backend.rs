//! In-process capture pipeline producing synthetic frames.

use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{select, Sender};
use parking_lot::{Mutex, RwLock};

use cappie_core::models::device::{DeviceDescriptor, MediaKind, Resolution};
use cappie_core::models::error::CaptureError;
use cappie_core::models::output::{OutputRole, VideoCodec};
use cappie_core::models::sample::{SampleBuffer, SamplePayload};
use cappie_core::traits::capture_backend::{CaptureBackend, SampleBufferCallback};

const AUDIO_SAMPLE_RATE: f64 = 48_000.0;
const AUDIO_CHUNK_FRAMES: usize = 480;
const TONE_HZ: f32 = 440.0;
const DEFAULT_RESOLUTION: Resolution = Resolution::new(1280, 720);
const FRAME_PAYLOAD_BYTES: usize = 64;

/// Totals for audio forwarded to one output device.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RenderedAudio {
    pub buffers: u64,
    pub samples: u64,
    /// Highest absolute sample value seen.
    pub peak: f32,
}

struct Clock {
    stop: Sender<()>,
    handle: thread::JoinHandle<()>,
}

/// A `CaptureBackend` that turns attached devices into synthetic samples.
///
/// Frames are produced on demand by `emit_frames`, or at a steady rate by
/// the clock thread from `start_clock`. Each round yields one video frame
/// per attached camera and a 10 ms 440 Hz tone chunk per microphone.
pub struct VirtualBackend {
    inputs: Mutex<Vec<DeviceDescriptor>>,
    callback: RwLock<Option<SampleBufferCallback>>,
    running: AtomicBool,
    round: AtomicU64,
    frame_interval: Mutex<Duration>,
    clock: Mutex<Option<Clock>>,
    codecs: Vec<VideoCodec>,
    reject_inputs: AtomicBool,
    rejected_outputs: Mutex<Vec<OutputRole>>,
    rendered: Mutex<HashMap<String, RenderedAudio>>,
}

impl Default for VirtualBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualBackend {
    pub fn new() -> Self {
        Self::with_codecs(vec![VideoCodec::H264, VideoCodec::Hevc, VideoCodec::Jpeg])
    }

    pub fn with_codecs(codecs: Vec<VideoCodec>) -> Self {
        Self {
            inputs: Mutex::new(Vec::new()),
            callback: RwLock::new(None),
            running: AtomicBool::new(false),
            round: AtomicU64::new(0),
            frame_interval: Mutex::new(Duration::from_secs_f64(1.0 / 30.0)),
            clock: Mutex::new(None),
            codecs,
            reject_inputs: AtomicBool::new(false),
            rejected_outputs: Mutex::new(Vec::new()),
            rendered: Mutex::new(HashMap::new()),
        }
    }

    /// Make the platform refuse every input.
    pub fn reject_inputs(&self, reject: bool) {
        self.reject_inputs.store(reject, Ordering::SeqCst);
    }

    /// Make the platform refuse outputs of `role`.
    pub fn reject_output(&self, role: OutputRole) {
        self.rejected_outputs.lock().push(role);
    }

    /// Unique ids of the wired inputs.
    pub fn input_ids(&self) -> Vec<String> {
        self.inputs.lock().iter().map(|d| d.unique_id().to_string()).collect()
    }

    /// Audio rendered to `device_id` so far.
    pub fn rendered_audio(&self, device_id: &str) -> RenderedAudio {
        self.rendered.lock().get(device_id).copied().unwrap_or_default()
    }

    /// Produce `rounds` rounds of samples. Returns the number of samples
    /// delivered, 0 when not running.
    pub fn emit_frames(&self, rounds: u64) -> usize {
        (0..rounds).map(|_| self.emit_round()).sum()
    }

    /// Produce rounds at `fps` on a background thread until the pipeline stops.
    pub fn start_clock(self: &Arc<Self>, fps: f64) -> Result<(), CaptureError> {
        if !(fps > 0.0) {
            return Err(CaptureError::ConfigurationFailed(format!("invalid clock rate {}", fps)));
        }
        self.stop_clock();

        let interval = Duration::from_secs_f64(1.0 / fps);
        *self.frame_interval.lock() = interval;

        let (stop, stopped) = crossbeam_channel::bounded::<()>(0);
        let ticker = crossbeam_channel::tick(interval);
        let backend: Weak<Self> = Arc::downgrade(self);
        let handle = thread::Builder::new()
            .name("cappie-virtual-clock".into())
            .spawn(move || {
                let mut ticking = true;
                while ticking {
                    select! {
                        recv(ticker) -> _ => ticking = tick(&backend),
                        recv(stopped) -> _ => ticking = false,
                    }
                }
            })
            .map_err(|e| CaptureError::Unknown(format!("failed to spawn clock thread: {}", e)))?;

        log::debug!("Virtual clock running at {} fps", fps);
        *self.clock.lock() = Some(Clock { stop, handle });
        Ok(())
    }

    fn stop_clock(&self) {
        let Some(clock) = self.clock.lock().take() else {
            return;
        };
        drop(clock.stop);
        if clock.handle.thread().id() == thread::current().id() {
            return;
        }
        if clock.handle.join().is_err() {
            log::error!("Virtual clock thread panicked");
        }
    }

    fn emit_round(&self) -> usize {
        let callback = self.callback.read();
        let Some(ref callback) = *callback else {
            return 0;
        };

        let round = self.round.fetch_add(1, Ordering::SeqCst);
        let presentation_time = *self.frame_interval.lock() * round as u32;
        let inputs = self.inputs.lock().clone();

        for device in &inputs {
            callback(&synthesize(device, round, presentation_time));
        }
        inputs.len()
    }
}

/// One clock tick. False once the backend is gone.
fn tick(backend: &Weak<VirtualBackend>) -> bool {
    match backend.upgrade() {
        Some(backend) => {
            backend.emit_round();
            true
        }
        None => false,
    }
}

fn synthesize(device: &DeviceDescriptor, round: u64, presentation_time: Duration) -> SampleBuffer {
    let payload = match device.kind() {
        MediaKind::Video => SamplePayload::Video {
            resolution: device
                .device()
                .active_format()
                .map(|f| f.resolution)
                .unwrap_or(DEFAULT_RESOLUTION),
            data: vec![(round % 256) as u8; FRAME_PAYLOAD_BYTES],
        },
        MediaKind::Audio => {
            let offset = round as usize * AUDIO_CHUNK_FRAMES;
            let samples = (0..AUDIO_CHUNK_FRAMES)
                .map(|i| {
                    let t = (offset + i) as f32 / AUDIO_SAMPLE_RATE as f32;
                    0.25 * (TAU * TONE_HZ * t).sin()
                })
                .collect();
            SamplePayload::Audio {
                samples,
                sample_rate: AUDIO_SAMPLE_RATE,
                channels: 1,
            }
        }
    };
    SampleBuffer {
        source_id: device.unique_id().to_string(),
        presentation_time,
        payload,
    }
}

impl CaptureBackend for VirtualBackend {
    fn can_add_input(&self, device: &DeviceDescriptor) -> bool {
        !self.reject_inputs.load(Ordering::SeqCst) && !self.inputs.lock().contains(device)
    }

    fn can_add_output(&self, role: OutputRole) -> bool {
        !self.rejected_outputs.lock().contains(&role)
    }

    fn attach_input(&self, device: &DeviceDescriptor) -> Result<(), CaptureError> {
        let mut inputs = self.inputs.lock();
        if inputs.contains(device) {
            return Err(CaptureError::ConfigurationFailed(format!(
                "{} is already wired",
                device.unique_id()
            )));
        }
        inputs.push(device.clone());
        Ok(())
    }

    fn detach_input(&self, device: &DeviceDescriptor) {
        self.inputs.lock().retain(|d| d != device);
    }

    fn available_video_codecs(&self) -> Vec<VideoCodec> {
        self.codecs.clone()
    }

    fn start_running(&self, callback: SampleBufferCallback) -> Result<(), CaptureError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        *self.callback.write() = Some(callback);
        log::debug!("Virtual pipeline started");
        Ok(())
    }

    fn stop_running(&self) -> Result<(), CaptureError> {
        self.stop_clock();
        // Waits for any round still delivering.
        self.callback.write().take();
        if self.running.swap(false, Ordering::SeqCst) {
            log::debug!("Virtual pipeline stopped");
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn render_audio(&self, device_id: &str, sample: &SampleBuffer) {
        let SamplePayload::Audio { ref samples, .. } = sample.payload else {
            return;
        };
        let mut rendered = self.rendered.lock();
        let totals = rendered.entry(device_id.to_string()).or_default();
        totals.buffers += 1;
        totals.samples += samples.len() as u64;
        totals.peak = samples.iter().fold(totals.peak, |peak, s| peak.max(s.abs()));
    }
}
