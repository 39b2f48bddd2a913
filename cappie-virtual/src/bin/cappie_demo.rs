//! Runs a capture session against the virtual backend and records a movie.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use cappie_core::{
    AudioLevelController, CaptureError, DeviceCatalog, DeviceInfo, MediaKind, MovieMuxer, RecordingController,
    SessionConfiguration, SessionDelegate, SessionEvent, SessionManager,
};
use cappie_virtual::{FileMuxer, PresetChooser, PromptPolicy, VirtualAuthorizer, VirtualBackend, VirtualDeviceProvider};

#[derive(Parser)]
#[command(name = "cappie-demo")]
#[command(about = "Record a movie from virtual capture devices")]
#[command(version)]
struct Args {
    /// JSON session configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Camera name substring (falls back to the default camera)
    #[arg(long, default_value = "")]
    video: String,

    /// Microphone name substring (falls back to the default microphone)
    #[arg(long, default_value = "")]
    audio: String,

    /// Number of frames to record
    #[arg(short, long, default_value = "90")]
    frames: u64,

    /// Produce frames in real time at this rate instead of as fast as possible
    #[arg(long)]
    realtime: Option<f64>,

    /// Destination file (default: generated name in the configured directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Mute the audio monitor while recording
    #[arg(long)]
    mute: bool,
}

struct LogEvents;

impl SessionDelegate for LogEvents {
    fn on_event(&self, event: &SessionEvent) {
        log::info!("Session event: {:?}", event);
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("Demo failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), CaptureError> {
    let config = match args.config {
        Some(ref path) => SessionConfiguration::load(path)?,
        None => SessionConfiguration::default(),
    };

    let catalog = DeviceCatalog::new(Arc::new(VirtualDeviceProvider::with_builtin_devices()));
    for kind in [MediaKind::Video, MediaKind::Audio] {
        for device in catalog.list_sorted(kind) {
            let info = serde_json::to_string(&DeviceInfo::from(&device))
                .map_err(|e| CaptureError::Unknown(format!("failed to serialize device: {}", e)))?;
            println!("{}", info);
        }
    }
    let video = catalog.find_device(MediaKind::Video, &args.video)?;
    let audio = catalog.find_device(MediaKind::Audio, &args.audio)?;

    let backend = Arc::new(VirtualBackend::new());
    let manager = SessionManager::new(
        Arc::clone(&backend),
        Arc::new(VirtualAuthorizer::new(PromptPolicy::AutoGrant)),
        config,
    )?;
    manager.set_delegate(Some(Arc::new(LogEvents)));

    manager.reconfigure(Some(video), Some(audio))?;
    for kind in [MediaKind::Video, MediaKind::Audio] {
        let state = manager
            .permission_gate()
            .request_authorization(kind)
            .wait_timeout(Duration::from_secs(10));
        log::info!("{} access: {:?}", kind, state);
    }
    // Let the attachments queued by the answered prompts run.
    wait_until(|| manager.inputs().len() == 2, Duration::from_secs(10));
    manager.flush()?;

    let levels = AudioLevelController::new(manager.outputs());
    if args.mute {
        levels.mute();
    }

    let muxer: Arc<dyn MovieMuxer> = Arc::new(FileMuxer::new());
    let recorder = RecordingController::new(manager.clone(), muxer, None);
    match args.output {
        Some(path) => recorder.start_with_chooser(&PresetChooser::Confirm(path))?,
        None => {
            recorder.start(None)?;
        }
    }
    if !recorder.is_recording() {
        return Err(CaptureError::NoVideoConnection);
    }

    match args.realtime {
        Some(fps) => {
            backend.start_clock(fps)?;
            wait_until(|| recorder.frames_written() >= args.frames, Duration::from_secs_f64(args.frames as f64 / fps + 5.0));
        }
        None => {
            backend.emit_frames(args.frames);
        }
    }

    log::info!("Audio monitor at volume {:.2}", levels.volume());
    let sources = manager.inputs();
    let result = recorder.stop()?;
    manager.stop()?;

    if let Some(result) = result {
        let sidecar = cappie_virtual::metadata::write_metadata(&result, &sources)?;
        let summary = serde_json::to_string_pretty(&sidecar)
            .map_err(|e| CaptureError::Unknown(format!("failed to serialize result: {}", e)))?;
        println!("{}", summary);
    }
    Ok(())
}

fn wait_until(condition: impl Fn() -> bool, timeout: Duration) {
    let deadline = std::time::Instant::now() + timeout;
    while !condition() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(10));
    }
}
