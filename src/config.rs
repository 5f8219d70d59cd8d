//! Recorder configuration
//!
//! Loaded from a JSON file by the headless binary; every field has a
//! default so an empty object is a valid configuration.

use crate::recorder::state::StreamDescriptor;
use crate::utils::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecorderConfig {
    /// Capture tool executable
    pub ffmpeg_path: String,

    /// Preview tool executable
    pub ffplay_path: String,

    /// Arguments inserted before the generated capture arguments
    pub capture_args_prefix: Vec<String>,

    /// Container extension of recorded files
    pub container_ext: String,

    /// How long to wait for a capture process after the quit signal
    pub stop_timeout_secs: u64,

    /// Status broadcast interval in milliseconds
    pub status_interval_ms: u64,

    /// Streams to register, in order
    pub streams: Vec<StreamDescriptor>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffplay_path: "ffplay".to_string(),
            capture_args_prefix: Vec::new(),
            container_ext: "mkv".to_string(),
            stop_timeout_secs: 10,
            status_interval_ms: 1000,
            streams: Vec::new(),
        }
    }
}

impl RecorderConfig {
    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let config: RecorderConfig = serde_json::from_str(&content)?;

        tracing::debug!(
            "Loaded config from {:?}: {} stream(s)",
            path,
            config.streams.len()
        );

        Ok(config)
    }

    /// Subset handed to every capture process
    pub fn capture_settings(&self) -> CaptureSettings {
        CaptureSettings {
            program: self.ffmpeg_path.clone(),
            args_prefix: self.capture_args_prefix.clone(),
            container_ext: self.container_ext.clone(),
            stop_timeout: Duration::from_secs(self.stop_timeout_secs),
        }
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(1))
    }
}

/// How capture processes are launched and stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    pub program: String,
    pub args_prefix: Vec<String>,
    pub container_ext: String,
    pub stop_timeout: Duration,
}
