use std::path::PathBuf;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::config::SessionConfiguration;
use crate::models::device::DeviceDescriptor;
use crate::models::error::CaptureError;
use crate::models::event::SessionEvent;
use crate::models::output::{OutputHandle, OutputRole, VideoCodec};
use crate::models::permission::PermissionState;
use crate::models::recording::RecordingResult;
use crate::permission::gate::PermissionGate;
use crate::session::capture_session::CaptureSession;
use crate::session::frame_rate::FrameRateRequest;
use crate::session::outputs::{MovieFileOutput, Output, OutputRegistry, PreviewCallback, PreviewOutput};
use crate::session::queue::SerialQueue;
use crate::traits::authorization_provider::AuthorizationProvider;
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::capture_delegate::{RecordingDelegate, SessionDelegate};
use crate::traits::movie_muxer::MovieMuxer;

struct Shared<B: CaptureBackend> {
    queue: SerialQueue,
    session: Mutex<CaptureSession<B>>,
    outputs: Arc<Mutex<OutputRegistry>>,
    gate: PermissionGate,
    config: SessionConfiguration,
}

/// Owns the capture session and serializes every change to it.
///
/// All pipeline mutations run on a dedicated work queue in submission order.
/// `configure` is asynchronous: it returns once the request is queued, and
/// the device is attached later, after any authorization prompt is answered.
/// The other mutating calls wait for their job (and everything queued before
/// it) to finish.
///
/// Handles are cheap to clone and all refer to the same session.
pub struct SessionManager<B: CaptureBackend> {
    shared: Arc<Shared<B>>,
}

impl<B: CaptureBackend> Clone for SessionManager<B> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<B: CaptureBackend> SessionManager<B> {
    pub fn new(
        backend: Arc<B>,
        authorizer: Arc<dyn AuthorizationProvider>,
        config: SessionConfiguration,
    ) -> Result<Self, CaptureError> {
        config.validate().map_err(CaptureError::ConfigurationFailed)?;

        let session = CaptureSession::new(backend, config.max_inputs_per_kind);
        let outputs = Arc::clone(session.outputs());
        let queue = SerialQueue::new("cappie-session-queue")?;

        log::info!(
            "Session manager ready: {} fps, resolution {}",
            config.frame_rate,
            config
                .resolution
                .map(|r| r.to_string())
                .unwrap_or_else(|| "any".into())
        );

        Ok(Self {
            shared: Arc::new(Shared {
                queue,
                session: Mutex::new(session),
                outputs,
                gate: PermissionGate::new(authorizer),
                config,
            }),
        })
    }

    pub fn config(&self) -> &SessionConfiguration {
        &self.shared.config
    }

    pub fn permission_gate(&self) -> &PermissionGate {
        &self.shared.gate
    }

    pub fn backend(&self) -> Arc<B> {
        Arc::clone(self.shared.session.lock().backend())
    }

    /// Weak reference to the output registry, for controllers that must not
    /// keep the session alive.
    pub fn outputs(&self) -> Weak<Mutex<OutputRegistry>> {
        Arc::downgrade(&self.shared.outputs)
    }

    pub fn set_delegate(&self, delegate: Option<Arc<dyn SessionDelegate>>) {
        self.shared.session.lock().set_delegate(delegate);
    }

    fn sync<R, F>(&self, job: F) -> Result<R, CaptureError>
    where
        R: Send + 'static,
        F: FnOnce(&mut CaptureSession<B>) -> R + Send + 'static,
    {
        let shared = Arc::clone(&self.shared);
        self.shared.queue.execute_sync(move || job(&mut shared.session.lock()))
    }

    /// Open a configuration transaction. No-op if one is open.
    pub fn open(&self) -> Result<(), CaptureError> {
        self.sync(|session| {
            session.begin_configuration();
        })
    }

    /// Commit the open configuration transaction. No-op if none is open.
    pub fn commit(&self) -> Result<(), CaptureError> {
        self.sync(|session| {
            session.commit_configuration();
        })
    }

    /// Queue attachment of `device`.
    ///
    /// Once its turn comes, the job checks authorization for the device's
    /// media kind. If undetermined it prompts, and the attachment is queued
    /// again only after the prompt is answered. Denied or restricted access
    /// skips the device and reports `ConfigurationSkipped`. Video devices
    /// are then negotiated to the configured frame rate; audio devices also
    /// get an audio-forward output.
    pub fn configure(&self, device: DeviceDescriptor) -> Result<(), CaptureError> {
        let weak = Arc::downgrade(&self.shared);
        self.shared.queue.execute(move || {
            if let Some(shared) = weak.upgrade() {
                configure_on_queue(&shared, device, false);
            }
        })
    }

    /// Detach every input. Idempotent.
    pub fn reset_inputs(&self) -> Result<(), CaptureError> {
        self.sync(|session| session.reset_inputs())
    }

    /// Detach every output, finalizing any movie being written. Idempotent.
    pub fn reset_outputs(&self) -> Result<(), CaptureError> {
        self.sync(|session| {
            session.reset_outputs();
        })
    }

    /// Start frame production. Fails while a transaction is open.
    pub fn start(&self) -> Result<(), CaptureError> {
        self.sync(|session| session.start_running())?
    }

    /// Tear down inputs and outputs and stop frame production. Safe to repeat.
    pub fn stop(&self) -> Result<(), CaptureError> {
        self.sync(|session| {
            session.reset_inputs();
            session.reset_outputs();
            session.stop_running()
        })?
    }

    /// Replace the session's devices and restart it.
    ///
    /// Either device may be omitted. Devices still waiting on authorization
    /// are attached to the running session once access is granted.
    pub fn reconfigure(&self, video: Option<DeviceDescriptor>, audio: Option<DeviceDescriptor>) -> Result<(), CaptureError> {
        self.sync(|session| {
            session.reset_inputs();
            session.reset_outputs();
            session.begin_configuration();
        })?;
        for device in video.into_iter().chain(audio) {
            self.configure(device)?;
        }
        self.commit()?;
        self.start()
    }

    /// Wait until every job queued so far has run.
    pub fn flush(&self) -> Result<(), CaptureError> {
        self.shared.queue.execute_sync(|| ())
    }

    /// Attach the preview output. None if the role is occupied or refused.
    pub fn attach_preview(&self, callback: Option<PreviewCallback>) -> Result<Option<OutputHandle>, CaptureError> {
        self.sync(move |session| session.add_output(Output::Preview(PreviewOutput::new(callback))))
    }

    /// Attach a record output that is not yet writing.
    pub fn attach_record_output(&self, delegate: Option<Arc<dyn RecordingDelegate>>) -> Result<OutputHandle, CaptureError> {
        self.sync(move |session| session.try_add_output(Output::Record(MovieFileOutput::new(delegate))))?
            .map_err(CaptureError::AdmissionRefused)
    }

    /// Detach an output. Returns whether it was attached.
    pub fn detach_output(&self, handle: OutputHandle) -> Result<bool, CaptureError> {
        self.sync(move |session| session.remove_output(handle).is_some())
    }

    /// Start the attached record output `handle` writing to `path`.
    pub fn begin_recording(
        &self,
        handle: OutputHandle,
        path: PathBuf,
        muxer: Arc<dyn MovieMuxer>,
    ) -> Result<VideoCodec, CaptureError> {
        let preferred = self.shared.config.preferred_codecs.clone();
        self.sync(move |session| session.begin_recording(handle, path, muxer.as_ref(), &preferred))?
    }

    /// Detach the record output `handle`, finalizing its movie.
    pub fn end_recording(&self, handle: OutputHandle) -> Result<Option<RecordingResult>, CaptureError> {
        self.sync(move |session| session.end_recording(handle))
    }

    pub fn inputs(&self) -> Vec<DeviceDescriptor> {
        self.shared.session.lock().inputs().to_vec()
    }

    pub fn output_roles(&self) -> Vec<OutputRole> {
        self.shared.outputs.lock().roles()
    }

    pub fn is_running(&self) -> bool {
        self.shared.session.lock().is_running()
    }

    pub fn is_configuring(&self) -> bool {
        self.shared.session.lock().is_configuring()
    }

    pub fn has_video_connection(&self) -> bool {
        self.shared.session.lock().has_video_connection()
    }

    /// Video frames the record output has written so far.
    pub fn frames_written(&self) -> u64 {
        self.shared
            .outputs
            .lock()
            .record()
            .map(MovieFileOutput::frames_written)
            .unwrap_or(0)
    }
}

fn configure_on_queue<B: CaptureBackend>(shared: &Arc<Shared<B>>, device: DeviceDescriptor, prompted: bool) {
    let kind = device.kind();
    match shared.gate.authorization_status(kind) {
        PermissionState::Authorized => {
            let mut request = FrameRateRequest::new(shared.config.frame_rate);
            request.resolution = shared.config.resolution;
            shared
                .session
                .lock()
                .attach_device(&device, &request, shared.config.initial_volume);
        }
        PermissionState::Undetermined if !prompted => {
            log::debug!("Deferring {:?} until {} access is answered", device.display_name(), kind);
            let weak = Arc::downgrade(shared);
            shared.gate.request_with(
                kind,
                Box::new(move |_state| {
                    let Some(shared) = weak.upgrade() else {
                        return;
                    };
                    let retry = Arc::downgrade(&shared);
                    let queued = shared.queue.execute(move || {
                        if let Some(shared) = retry.upgrade() {
                            configure_on_queue(&shared, device, true);
                        }
                    });
                    if let Err(e) = queued {
                        log::warn!("Dropping {} configuration after authorization: {}", kind, e);
                    }
                }),
            );
        }
        PermissionState::Undetermined | PermissionState::Denied => skip(shared, &device, CaptureError::PermissionDenied(kind)),
        PermissionState::Restricted => skip(shared, &device, CaptureError::PermissionRestricted(kind)),
    }
}

fn skip<B: CaptureBackend>(shared: &Shared<B>, device: &DeviceDescriptor, error: CaptureError) {
    log::warn!("Skipping {:?}: {}", device.display_name(), error);
    shared.session.lock().emit(SessionEvent::ConfigurationSkipped {
        device_id: device.unique_id().to_string(),
        error,
    });
}
