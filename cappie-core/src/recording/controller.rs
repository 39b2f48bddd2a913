use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::output::OutputHandle;
use crate::models::recording::{RecordingResult, RecordingState};
use crate::recording::file_name::generate_file_name;
use crate::session::manager::SessionManager;
use crate::traits::capture_backend::CaptureBackend;
use crate::traits::capture_delegate::RecordingDelegate;
use crate::traits::destination_chooser::DestinationChooser;
use crate::traits::movie_muxer::MovieMuxer;

enum Phase {
    Idle,
    /// Record output attached, waiting on the chooser.
    AwaitingDestination { handle: OutputHandle },
    Recording { handle: OutputHandle, path: PathBuf },
}

struct Inner<B: CaptureBackend> {
    manager: SessionManager<B>,
    muxer: Arc<dyn MovieMuxer>,
    delegate: Option<Arc<dyn RecordingDelegate>>,
    phase: Mutex<Phase>,
}

/// Toggles movie recording on a session: Idle -> Recording -> Idle.
///
/// The record output is attached before writing begins, so nothing is
/// dropped while a destination is being chosen. Any failure to begin
/// writing detaches the output again and leaves the controller Idle.
pub struct RecordingController<B: CaptureBackend> {
    inner: Arc<Inner<B>>,
}

impl<B: CaptureBackend> Clone for RecordingController<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: CaptureBackend> RecordingController<B> {
    pub fn new(
        manager: SessionManager<B>,
        muxer: Arc<dyn MovieMuxer>,
        delegate: Option<Arc<dyn RecordingDelegate>>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                manager,
                muxer,
                delegate,
                phase: Mutex::new(Phase::Idle),
            }),
        }
    }

    /// Start recording to `destination`, or to a generated file name in the
    /// configured output directory. Returns the path being written.
    pub fn start(&self, destination: Option<&Path>) -> Result<PathBuf, CaptureError> {
        let mut phase = self.inner.phase.lock();
        self.inner.forget_detached(&mut phase);
        if !matches!(*phase, Phase::Idle) {
            return Err(CaptureError::AlreadyRecording);
        }

        let path = match destination {
            Some(path) => path.to_path_buf(),
            None => self.inner.default_destination(),
        };
        let handle = self.inner.attach()?;
        self.inner.begin(handle, path.clone())?;

        *phase = Phase::Recording {
            handle,
            path: path.clone(),
        };
        Ok(path)
    }

    /// Attach the record output now and ask `chooser` where to write.
    ///
    /// Writing begins once a destination is confirmed. Cancelling, or the
    /// chooser dropping its reply unanswered, detaches the output again.
    pub fn start_with_chooser(&self, chooser: &dyn DestinationChooser) -> Result<(), CaptureError> {
        let handle = {
            let mut phase = self.inner.phase.lock();
            self.inner.forget_detached(&mut phase);
            if !matches!(*phase, Phase::Idle) {
                return Err(CaptureError::AlreadyRecording);
            }
            let handle = self.inner.attach()?;
            *phase = Phase::AwaitingDestination { handle };
            handle
        };

        let suggested = generate_file_name(&self.inner.manager.config().file_prefix);
        let mut pending = PendingDestination {
            inner: Arc::downgrade(&self.inner),
            handle,
            settled: false,
        };
        chooser.choose(&suggested, Box::new(move |choice| pending.settle(choice)));
        Ok(())
    }

    /// Stop writing and detach the record output. Returns the finished
    /// recording, or None when nothing was being written. Always ends Idle.
    pub fn stop(&self) -> Result<Option<RecordingResult>, CaptureError> {
        let previous = {
            let mut phase = self.inner.phase.lock();
            self.inner.forget_detached(&mut phase);
            std::mem::replace(&mut *phase, Phase::Idle)
        };
        match previous {
            Phase::Idle => Ok(None),
            Phase::AwaitingDestination { handle } => {
                self.inner.manager.detach_output(handle)?;
                Ok(None)
            }
            Phase::Recording { handle, path } => {
                log::info!("Stopping recording to {}", path.display());
                self.inner.manager.end_recording(handle)
            }
        }
    }

    pub fn state(&self) -> RecordingState {
        let mut phase = self.inner.phase.lock();
        self.inner.forget_detached(&mut phase);
        match &*phase {
            Phase::Recording { handle, path } => RecordingState::Recording {
                handle: *handle,
                path: path.clone(),
            },
            _ => RecordingState::Idle,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state().is_recording()
    }

    /// Whether a chooser is still deciding where to write.
    pub fn is_awaiting_destination(&self) -> bool {
        matches!(*self.inner.phase.lock(), Phase::AwaitingDestination { .. })
    }

    pub fn frames_written(&self) -> u64 {
        self.inner.manager.frames_written()
    }
}

impl<B: CaptureBackend> Inner<B> {
    fn default_destination(&self) -> PathBuf {
        let config = self.manager.config();
        config.output_directory.join(generate_file_name(&config.file_prefix))
    }

    fn attach(&self) -> Result<OutputHandle, CaptureError> {
        self.manager.attach_record_output(self.delegate.clone())
    }

    fn output_attached(&self, handle: OutputHandle) -> bool {
        self.manager
            .outputs()
            .upgrade()
            .map(|outputs| outputs.lock().contains(handle))
            .unwrap_or(false)
    }

    /// Fall back to Idle when the session has already detached the record
    /// output, e.g. because it was stopped or its outputs were reset. The
    /// session finalizes the movie itself in that case.
    fn forget_detached(&self, phase: &mut Phase) {
        let handle = match *phase {
            Phase::Idle => return,
            Phase::AwaitingDestination { handle } | Phase::Recording { handle, .. } => handle,
        };
        if !self.output_attached(handle) {
            log::debug!("Record output {} detached by the session", handle);
            *phase = Phase::Idle;
        }
    }

    /// Begin writing, detaching the output again on failure.
    fn begin(&self, handle: OutputHandle, path: PathBuf) -> Result<(), CaptureError> {
        match self.manager.begin_recording(handle, path, Arc::clone(&self.muxer)) {
            Ok(codec) => {
                log::debug!("Record output {} encoding {:?}", handle, codec);
                Ok(())
            }
            Err(e) => {
                log::warn!("Recording did not start: {}", e);
                if let Err(detach) = self.manager.detach_output(handle) {
                    log::error!("Failed to detach record output {}: {}", handle, detach);
                }
                Err(e)
            }
        }
    }

    fn settle(&self, handle: OutputHandle, choice: Option<PathBuf>) {
        let mut phase = self.phase.lock();
        match *phase {
            Phase::AwaitingDestination { handle: waiting } if waiting == handle => {}
            _ => {
                log::debug!("Ignoring stale destination reply for {}", handle);
                return;
            }
        }

        let Some(path) = choice else {
            log::info!("Destination choice cancelled, detaching record output");
            *phase = Phase::Idle;
            drop(phase);
            if let Err(e) = self.manager.detach_output(handle) {
                log::error!("Failed to detach record output {}: {}", handle, e);
            }
            return;
        };

        match self.begin(handle, path.clone()) {
            Ok(()) => *phase = Phase::Recording { handle, path },
            Err(e) => {
                *phase = Phase::Idle;
                drop(phase);
                if let Some(ref delegate) = self.delegate {
                    delegate.on_recording_aborted(&e);
                }
            }
        }
    }
}

/// Owned by the chooser's reply. Settles the waiting record output exactly
/// once, treating a reply dropped unanswered as a cancellation.
struct PendingDestination<B: CaptureBackend> {
    inner: Weak<Inner<B>>,
    handle: OutputHandle,
    settled: bool,
}

impl<B: CaptureBackend> PendingDestination<B> {
    fn settle(&mut self, choice: Option<PathBuf>) {
        self.settled = true;
        if let Some(inner) = self.inner.upgrade() {
            inner.settle(self.handle, choice);
        }
    }
}

impl<B: CaptureBackend> Drop for PendingDestination<B> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        log::warn!("Destination chooser dropped its reply without answering");
        self.settle(None);
    }
}
