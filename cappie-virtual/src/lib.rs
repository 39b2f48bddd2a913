//! # cappie-virtual
//!
//! In-process backend for cappie-core.
//!
//! Provides:
//! - `VirtualDeviceProvider`: hot-pluggable synthetic cameras and microphones
//! - `VirtualAuthorizer`: scripted per-kind capture authorization
//! - `VirtualBackend`: capture pipeline emitting synthetic frames on demand or on a clock
//! - `FileMuxer`: movie file writer with SHA-256 checksums
//! - `PresetChooser`: destination chooser with a fixed answer
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use cappie_core::{SessionConfiguration, SessionManager};
//! use cappie_virtual::{PromptPolicy, VirtualAuthorizer, VirtualBackend};
//!
//! let backend = Arc::new(VirtualBackend::new());
//! let authorizer = Arc::new(VirtualAuthorizer::new(PromptPolicy::AutoGrant));
//! let manager = SessionManager::new(backend, authorizer, SessionConfiguration::default())?;
//! ```

pub mod authorization;
pub mod backend;
pub mod chooser;
pub mod device;
pub mod metadata;
pub mod muxer;
pub mod provider;

pub use authorization::{PromptPolicy, VirtualAuthorizer};
pub use backend::{RenderedAudio, VirtualBackend};
pub use chooser::PresetChooser;
pub use device::VirtualDevice;
pub use muxer::{FileMuxer, RawMovieWriter};
pub use provider::VirtualDeviceProvider;
