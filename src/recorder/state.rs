//! Recording state management
//!
//! Stream descriptors, the session state machine, and the pure helpers that
//! derive output paths and elapsed-time strings.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Elapsed time shown for sessions that are not recording
pub const ZERO_ELAPSED: &str = "00:00:00";

/// One network stream to record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    /// Network address of the stream (e.g. `rtsp://host/path`)
    pub source_address: String,

    /// Root directory recordings are written under
    pub output_root: PathBuf,

    /// Prepended to every output file name
    pub file_prefix: String,
}

impl StreamDescriptor {
    pub fn new(
        source_address: impl Into<String>,
        output_root: impl Into<PathBuf>,
        file_prefix: impl Into<String>,
    ) -> Self {
        Self {
            source_address: source_address.into(),
            output_root: output_root.into(),
            file_prefix: file_prefix.into(),
        }
    }

    /// Build a descriptor from an imported `(address, root, prefix)` record.
    ///
    /// Returns `None` unless the record has exactly three fields.
    pub fn from_record<S: AsRef<str>>(fields: &[S]) -> Option<Self> {
        match fields {
            [address, root, prefix] => Some(Self::new(
                address.as_ref(),
                root.as_ref(),
                prefix.as_ref(),
            )),
            _ => None,
        }
    }

    /// Where a recording started at `started_at` is written
    pub fn output_path<Tz: TimeZone>(
        &self,
        started_at: &DateTime<Tz>,
        container_ext: &str,
    ) -> PathBuf
    where
        Tz::Offset: std::fmt::Display,
    {
        output_path(
            &self.output_root,
            &self.file_prefix,
            started_at,
            container_ext,
        )
    }
}

/// Lifecycle of a recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    /// Registered, capture not launched yet
    NotStarted,
    /// Capture process running
    Recording,
    /// Finished; a session is never restarted
    Stopped,
}

impl Default for SessionState {
    fn default() -> Self {
        Self::NotStarted
    }
}

/// Directory a recording started at `started_at` lands in:
/// `{root}/{YYYYMMDD}/{HH}/{MM}`
pub fn output_dir<Tz: TimeZone>(root: &Path, started_at: &DateTime<Tz>) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    root.join(started_at.format("%Y%m%d").to_string())
        .join(started_at.format("%H").to_string())
        .join(started_at.format("%M").to_string())
}

/// Full output file path: `{output_dir}/{prefix}{YYYYMMDD_HHMMSS}.{ext}`
pub fn output_path<Tz: TimeZone>(
    root: &Path,
    prefix: &str,
    started_at: &DateTime<Tz>,
    container_ext: &str,
) -> PathBuf
where
    Tz::Offset: std::fmt::Display,
{
    let file_name = format!(
        "{}{}.{}",
        prefix,
        started_at.format("%Y%m%d_%H%M%S"),
        container_ext
    );
    output_dir(root, started_at).join(file_name)
}

/// Format a duration as `HH:MM:SS`, truncating sub-second precision.
/// Hours are not wrapped at 24.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}",
        total / 3600,
        (total % 3600) / 60,
        total % 60
    )
}
