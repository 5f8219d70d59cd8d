//! Error types and handling
//!
//! Error kinds raised by capture processes, recording sessions and the
//! session supervisor.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A capture process could not be launched
#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("Invalid source address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("Failed to create output directory {path:?}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to capture stdin of the capture process")]
    MissingStdin,
}

/// A capture process could not be shut down cleanly
#[derive(Error, Debug)]
pub enum ShutdownError {
    #[error("Failed to deliver quit signal: {0}")]
    Signal(#[source] std::io::Error),

    #[error("Failed to wait for capture process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("Capture process did not exit within {timeout:?} and was killed")]
    ForceKilled { timeout: Duration },

    #[error("Failed to kill capture process: {0}")]
    Kill(#[source] std::io::Error),
}

/// Failure of a single session lifecycle transition
#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Shutdown(#[from] ShutdownError),

    #[error("Session task failed: {0}")]
    Task(String),
}

/// One failed session inside a bulk operation
#[derive(Debug)]
pub struct SessionFailure {
    /// Registration position of the session
    pub index: usize,
    pub source_address: String,
    pub file_prefix: String,
    pub error: SessionError,
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} {} ({}): {}",
            self.index, self.source_address, self.file_prefix, self.error
        )
    }
}

/// Per-session failures collected from `start_all` / `stop_all`
#[derive(Debug, Default)]
pub struct AggregateError {
    pub failures: Vec<SessionFailure>,
}

impl AggregateError {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn push(&mut self, failure: SessionFailure) {
        self.failures.push(failure);
    }

    /// `Ok(())` when nothing failed, otherwise `Err(self)`
    pub fn into_result(mut self) -> Result<(), AggregateError> {
        if self.failures.is_empty() {
            return Ok(());
        }
        self.failures.sort_by_key(|f| f.index);
        Err(self)
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} session(s) failed", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "\n  {}", failure)?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

/// Supervisor misuse
#[derive(Error, Debug)]
pub enum SupervisorError {
    #[error("Cannot register streams while recording is running")]
    RegistrationClosed,
}

/// Configuration loading errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}
