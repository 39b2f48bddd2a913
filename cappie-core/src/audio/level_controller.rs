use std::sync::Weak;

use parking_lot::Mutex;

use crate::session::outputs::{AudioPreviewOutput, OutputRegistry};

/// Volume and mute control over the session's audio-forward output.
///
/// Holds only a weak reference to the outputs; with no audio-forward output
/// attached, reads report silence and every mutation is a no-op.
pub struct AudioLevelController {
    outputs: Weak<Mutex<OutputRegistry>>,
}

impl AudioLevelController {
    pub fn new(outputs: Weak<Mutex<OutputRegistry>>) -> Self {
        Self { outputs }
    }

    fn read<R>(&self, f: impl FnOnce(&AudioPreviewOutput) -> R) -> Option<R> {
        let outputs = self.outputs.upgrade()?;
        let registry = outputs.lock();
        registry.audio_forward().map(f)
    }

    fn update<R>(&self, f: impl FnOnce(&mut AudioPreviewOutput) -> R) -> Option<R> {
        let outputs = self.outputs.upgrade()?;
        let mut registry = outputs.lock();
        registry.audio_forward_mut().map(f)
    }

    /// Current volume, 0.0 when no audio-forward output is attached.
    pub fn volume(&self) -> f32 {
        self.read(AudioPreviewOutput::volume).unwrap_or(0.0)
    }

    pub fn set_volume(&self, volume: f32) {
        self.update(|output| output.set_volume(volume));
    }

    pub fn is_muted(&self) -> bool {
        self.read(AudioPreviewOutput::is_muted).unwrap_or(false)
    }

    pub fn mute(&self) {
        if self.update(AudioPreviewOutput::mute).is_none() {
            log::debug!("No audio-forward output to mute");
        }
    }

    pub fn unmute(&self) {
        if self.update(AudioPreviewOutput::unmute).is_none() {
            log::debug!("No audio-forward output to unmute");
        }
    }

    /// Mute if audible, unmute if silent. Returns whether audio is now audible.
    pub fn toggle_mute(&self) -> bool {
        self.update(|output| {
            if output.volume() == 0.0 {
                output.unmute();
            } else {
                output.mute();
            }
            output.volume() > 0.0
        })
        .unwrap_or(false)
    }
}
