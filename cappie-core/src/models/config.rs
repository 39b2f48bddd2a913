use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::device::Resolution;
use super::error::CaptureError;
use super::output::VideoCodec;

/// Configuration for a capture session and the controllers layered on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct SessionConfiguration {
    /// Frame rate requested from video devices (default: 30).
    pub frame_rate: f64,

    /// Exact video format size to negotiate, or None to accept any size.
    pub resolution: Option<Resolution>,

    /// Directory for generated recording file names.
    pub output_directory: PathBuf,

    /// Prefix of generated recording file names (default: "cappie").
    pub file_prefix: String,

    /// Codecs to try for the record output, in order of preference.
    pub preferred_codecs: Vec<VideoCodec>,

    /// Maximum number of inputs of one media kind (default: 1).
    pub max_inputs_per_kind: usize,

    /// Volume of a newly attached audio-forward output, 0.0–1.0.
    pub initial_volume: f32,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.frame_rate > 0.0) {
            return Err(format!("frame rate must be positive, got {}", self.frame_rate));
        }
        if let Some(r) = self.resolution {
            if r.width == 0 || r.height == 0 {
                return Err(format!("resolution must be non-zero, got {r}"));
            }
        }
        if self.file_prefix.is_empty() {
            return Err("file prefix must not be empty".into());
        }
        if self.max_inputs_per_kind == 0 {
            return Err("max inputs per kind must be at least 1".into());
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(format!("initial volume must be within 0.0–1.0, got {}", self.initial_volume));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self, CaptureError> {
        let config: SessionConfiguration = serde_json::from_str(json)
            .map_err(|e| CaptureError::ConfigurationFailed(format!("invalid configuration: {}", e)))?;
        config.validate().map_err(CaptureError::ConfigurationFailed)?;
        Ok(config)
    }

    /// Read a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let json = fs::read_to_string(path).map_err(|e| {
            CaptureError::ConfigurationFailed(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            frame_rate: 30.0,
            resolution: None,
            output_directory: PathBuf::from("."),
            file_prefix: "cappie".into(),
            preferred_codecs: vec![VideoCodec::H264],
            max_inputs_per_kind: 1,
            initial_volume: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(SessionConfiguration::default().validate().is_ok());
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = SessionConfiguration::from_json_str(
            r#"{ "frameRate": 60, "resolution": { "width": 1920, "height": 1080 } }"#,
        )
        .unwrap();

        assert_eq!(config.frame_rate, 60.0);
        assert_eq!(config.resolution, Some(Resolution::new(1920, 1080)));
        assert_eq!(config.file_prefix, "cappie");
        assert_eq!(config.preferred_codecs, vec![VideoCodec::H264]);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = SessionConfiguration::from_json_str(r#"{ "fps": 60 }"#).unwrap_err();
        assert!(matches!(err, CaptureError::ConfigurationFailed(_)));
    }

    #[test]
    fn rejects_invalid_values() {
        let mut config = SessionConfiguration::default();
        config.frame_rate = 0.0;
        assert!(config.validate().is_err());

        let mut config = SessionConfiguration::default();
        config.initial_volume = 1.5;
        assert!(config.validate().is_err());

        let mut config = SessionConfiguration::default();
        config.max_inputs_per_kind = 0;
        assert!(config.validate().is_err());
    }
}
