use std::path::PathBuf;

/// Receives the chosen destination, or None when the user cancelled.
pub type DestinationReply = Box<dyn FnOnce(Option<PathBuf>) + Send + 'static>;

/// External file-chooser collaborator (a save panel, typically).
pub trait DestinationChooser: Send + Sync {
    /// Ask for a destination, suggesting `suggested_name`.
    ///
    /// `reply` is called at most once and may be dropped without ever being called.
    fn choose(&self, suggested_name: &str, reply: DestinationReply);
}
