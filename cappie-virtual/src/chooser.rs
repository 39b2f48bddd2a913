use std::path::PathBuf;

use cappie_core::traits::destination_chooser::{DestinationChooser, DestinationReply};

/// A `DestinationChooser` that answers the same way every time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresetChooser {
    /// Confirm this path.
    Confirm(PathBuf),
    /// Cancel the choice.
    Cancel,
    /// Drop the reply without answering, like a panel torn down mid-prompt.
    Abandon,
}

impl DestinationChooser for PresetChooser {
    fn choose(&self, suggested_name: &str, reply: DestinationReply) {
        log::debug!("Destination requested, suggested {:?}", suggested_name);
        match self {
            Self::Confirm(path) => reply(Some(path.clone())),
            Self::Cancel => reply(None),
            Self::Abandon => drop(reply),
        }
    }
}
