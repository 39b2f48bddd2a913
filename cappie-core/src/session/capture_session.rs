use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::models::device::{DeviceDescriptor, MediaKind};
use crate::models::error::CaptureError;
use crate::models::event::{AdmissionReason, AdmissionRefusal, AdmissionTarget, SessionEvent};
use crate::models::output::{OutputHandle, OutputRole, VideoCodec};
use crate::models::recording::RecordingResult;
use crate::session::frame_rate::{self, FrameRateRequest};
use crate::session::outputs::{AudioPreviewOutput, Output, OutputRegistry};
use crate::traits::capture_backend::{CaptureBackend, SampleBufferCallback};
use crate::traits::capture_delegate::SessionDelegate;
use crate::traits::movie_muxer::{MovieMuxer, WriteRequest};

/// The live pipeline: inputs feeding outputs through a platform backend.
///
/// Inputs and outputs only change inside a configuration transaction. A
/// mutation made while no transaction is open runs in an implicit one that
/// commits as soon as the mutation is done. `start_running` requires the
/// transaction to be closed.
pub struct CaptureSession<B: CaptureBackend> {
    backend: Arc<B>,
    inputs: Vec<DeviceDescriptor>,
    outputs: Arc<Mutex<OutputRegistry>>,
    transaction_open: bool,
    running: bool,
    max_inputs_per_kind: usize,
    delegate: Option<Arc<dyn SessionDelegate>>,
}

impl<B: CaptureBackend> CaptureSession<B> {
    pub fn new(backend: Arc<B>, max_inputs_per_kind: usize) -> Self {
        Self {
            backend,
            inputs: Vec::new(),
            outputs: Arc::new(Mutex::new(OutputRegistry::new())),
            transaction_open: false,
            running: false,
            max_inputs_per_kind,
            delegate: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Option<Arc<dyn SessionDelegate>>) {
        self.delegate = delegate;
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Shared handle to the output registry, for controllers and the sample path.
    pub fn outputs(&self) -> &Arc<Mutex<OutputRegistry>> {
        &self.outputs
    }

    pub fn inputs(&self) -> &[DeviceDescriptor] {
        &self.inputs
    }

    pub fn is_configuring(&self) -> bool {
        self.transaction_open
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// A record output can only encode video while a video input feeds the session.
    pub fn has_video_connection(&self) -> bool {
        self.inputs.iter().any(|d| d.kind() == MediaKind::Video)
    }

    /// Open a configuration transaction. Returns false if one was already open.
    pub fn begin_configuration(&mut self) -> bool {
        if self.transaction_open {
            return false;
        }
        log::debug!("Begin session configuration");
        self.transaction_open = true;
        true
    }

    /// Close the configuration transaction. Returns false if none was open.
    pub fn commit_configuration(&mut self) -> bool {
        if !self.transaction_open {
            return false;
        }
        log::debug!(
            "Commit session configuration: {} input(s), {} output(s)",
            self.inputs.len(),
            self.outputs.lock().len()
        );
        self.transaction_open = false;
        true
    }

    fn in_transaction<R>(&mut self, mutate: impl FnOnce(&mut Self) -> R) -> R {
        let implicit = self.begin_configuration();
        let result = mutate(self);
        if implicit {
            self.commit_configuration();
        }
        result
    }

    /// Admission check for an input.
    pub fn can_add_input(&self, device: &DeviceDescriptor) -> Result<(), AdmissionReason> {
        if self.inputs.iter().any(|d| d.unique_id() == device.unique_id()) {
            return Err(AdmissionReason::DuplicateDevice);
        }
        let same_kind = self.inputs.iter().filter(|d| d.kind() == device.kind()).count();
        if same_kind >= self.max_inputs_per_kind {
            return Err(AdmissionReason::KindAtCapacity);
        }
        if !self.backend.can_add_input(device) {
            return Err(AdmissionReason::BackendRejected);
        }
        Ok(())
    }

    /// Admission check for an output.
    pub fn can_add_output(&self, output: &Output) -> Result<(), AdmissionReason> {
        self.outputs.lock().admits(output)?;
        if !self.backend.can_add_output(output.role()) {
            return Err(AdmissionReason::BackendRejected);
        }
        Ok(())
    }

    /// Attach `device` if admitted. A refusal is a silent no-op apart from
    /// the `AdmissionRefused` event. Returns whether the input was attached.
    pub fn add_input(&mut self, device: &DeviceDescriptor) -> bool {
        self.in_transaction(|session| {
            if let Err(reason) = session.can_add_input(device) {
                session.refuse(AdmissionTarget::Input {
                    device_id: device.unique_id().to_string(),
                    kind: device.kind(),
                }, reason);
                return false;
            }
            if let Err(e) = session.backend.attach_input(device) {
                log::warn!("Backend failed to attach {}: {}", device.display_name(), e);
                session.refuse(AdmissionTarget::Input {
                    device_id: device.unique_id().to_string(),
                    kind: device.kind(),
                }, AdmissionReason::BackendRejected);
                return false;
            }

            log::info!("Attached {} input {:?}", device.kind(), device.display_name());
            session.inputs.push(device.clone());
            session.emit(SessionEvent::InputAttached {
                device_id: device.unique_id().to_string(),
                kind: device.kind(),
            });
            true
        })
    }

    /// Detach every input. Idempotent.
    pub fn reset_inputs(&mut self) {
        self.in_transaction(|session| {
            for device in std::mem::take(&mut session.inputs) {
                session.backend.detach_input(&device);
                log::debug!("Detached {} input {:?}", device.kind(), device.display_name());
                session.emit(SessionEvent::InputDetached {
                    device_id: device.unique_id().to_string(),
                    kind: device.kind(),
                });
            }
        })
    }

    /// Attach `output` if admitted, returning its handle. A refusal is a
    /// silent no-op apart from the `AdmissionRefused` event.
    pub fn add_output(&mut self, output: Output) -> Option<OutputHandle> {
        self.try_add_output(output).ok()
    }

    /// Like `add_output`, but reports why the output was refused.
    pub fn try_add_output(&mut self, output: Output) -> Result<OutputHandle, AdmissionRefusal> {
        self.in_transaction(|session| {
            let role = output.role();
            if let Err(reason) = session.can_add_output(&output) {
                return Err(session.refuse(AdmissionTarget::Output { role }, reason));
            }

            let handle = session.outputs.lock().insert(output);
            log::debug!("Attached {} output {}", role, handle);
            session.emit(SessionEvent::OutputAttached { role, handle });
            Ok(handle)
        })
    }

    /// Detach one output. A record output that is writing is finalized first.
    pub fn remove_output(&mut self, handle: OutputHandle) -> Option<Output> {
        self.in_transaction(|session| {
            let removed = session.outputs.lock().remove(handle);
            removed.map(|output| session.finish_detached(output))
        })
    }

    /// Detach every output, finalizing any movie being written. Idempotent.
    pub fn reset_outputs(&mut self) -> Vec<Output> {
        self.in_transaction(|session| {
            let drained = session.outputs.lock().drain();
            drained
                .into_iter()
                .map(|output| session.finish_detached(output))
                .collect()
        })
    }

    fn finish_detached(&self, mut output: Output) -> Output {
        if let Output::Record(ref mut record) = output {
            if record.is_writing() {
                log::info!("Finalizing recording {} on detach", record.handle());
                record.finish_writing();
            }
        }
        self.emit(SessionEvent::OutputDetached {
            role: output.role(),
            handle: output.handle(),
        });
        output
    }

    /// Attach a permitted device: its input, then format negotiation for video
    /// or an audio-forward output for audio.
    pub fn attach_device(&mut self, device: &DeviceDescriptor, request: &FrameRateRequest, initial_volume: f32) {
        self.in_transaction(|session| {
            if !session.add_input(device) {
                return;
            }
            match device.kind() {
                MediaKind::Video => match frame_rate::negotiate(device.device(), request) {
                    Ok(format) => session.emit(SessionEvent::FormatNegotiated {
                        device_id: device.unique_id().to_string(),
                        format,
                        frame_rate: request.frame_rate,
                    }),
                    Err(error) => {
                        log::warn!("Keeping current format of {:?}: {}", device.display_name(), error);
                        session.emit(SessionEvent::FormatNegotiationFailed {
                            device_id: device.unique_id().to_string(),
                            error,
                        });
                    }
                },
                MediaKind::Audio => {
                    let forward = AudioPreviewOutput::new(device.unique_id(), initial_volume);
                    session.add_output(Output::AudioForward(forward));
                }
            }
        })
    }

    /// Begin writing the attached record output `handle` to `path`.
    pub fn begin_recording(
        &mut self,
        handle: OutputHandle,
        path: PathBuf,
        muxer: &dyn MovieMuxer,
        preferred_codecs: &[VideoCodec],
    ) -> Result<VideoCodec, CaptureError> {
        if !self.has_video_connection() {
            return Err(CaptureError::NoVideoConnection);
        }
        let mut outputs = self.outputs.lock();
        let record = outputs
            .record_mut()
            .filter(|r| r.handle() == handle)
            .ok_or_else(|| CaptureError::Unknown(format!("record output {} is not attached", handle)))?;
        if record.is_writing() {
            return Err(CaptureError::AlreadyRecording);
        }

        let codec = VideoCodec::negotiate(preferred_codecs, &self.backend.available_video_codecs());
        let sink = muxer.start_writing(&WriteRequest { handle, path, codec })?;
        record.start_writing(sink, codec)?;
        Ok(codec)
    }

    /// Detach the record output `handle`, returning the finished recording if
    /// it was writing.
    pub fn end_recording(&mut self, handle: OutputHandle) -> Option<RecordingResult> {
        self.in_transaction(|session| {
            let removed = session.outputs.lock().remove(handle);
            let Some(mut output) = removed else {
                log::warn!("Record output {} was already detached", handle);
                return None;
            };
            let result = match output {
                Output::Record(ref mut record) => record.finish_writing(),
                _ => None,
            };
            session.emit(SessionEvent::OutputDetached {
                role: OutputRole::Record,
                handle,
            });
            result
        })
    }

    /// Start producing samples. No-op if already running.
    pub fn start_running(&mut self) -> Result<(), CaptureError> {
        if self.transaction_open {
            return Err(CaptureError::TransactionOpen);
        }
        if self.running {
            return Ok(());
        }

        let outputs = Arc::downgrade(&self.outputs);
        let backend = Arc::downgrade(&self.backend);
        let callback: SampleBufferCallback = Arc::new(move |sample| {
            let (Some(outputs), Some(backend)) = (outputs.upgrade(), backend.upgrade()) else {
                return;
            };
            outputs.lock().dispatch(sample, &*backend);
        });

        self.backend.start_running(callback)?;
        self.running = true;
        log::info!("Capture session running with {} input(s)", self.inputs.len());
        self.emit(SessionEvent::RunningChanged(true));
        Ok(())
    }

    /// Stop producing samples. No-op if not running.
    pub fn stop_running(&mut self) -> Result<(), CaptureError> {
        if !self.running {
            return Ok(());
        }
        self.backend.stop_running()?;
        self.running = false;
        log::info!("Capture session stopped");
        self.emit(SessionEvent::RunningChanged(false));
        Ok(())
    }

    fn refuse(&self, target: AdmissionTarget, reason: AdmissionReason) -> AdmissionRefusal {
        let refusal = AdmissionRefusal { target, reason };
        log::warn!("Session refused {}", refusal);
        self.emit(SessionEvent::AdmissionRefused(refusal.clone()));
        refusal
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        if let Some(ref delegate) = self.delegate {
            delegate.on_event(&event);
        }
    }
}
