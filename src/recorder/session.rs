//! Recording session
//!
//! Pairs a stream with its capture process and tracks when it started.
//! The clock lives behind a short-lived `parking_lot` lock so status reads
//! never wait on a capture process that is slow to exit; the process itself
//! sits behind an async mutex held for the whole start/stop transition.

use super::state::{format_elapsed, SessionState, StreamDescriptor};
use crate::capture::CaptureProcess;
use crate::config::CaptureSettings;
use crate::utils::error::{LaunchError, ShutdownError};
use chrono::{DateTime, Local};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Timing state of a session
#[derive(Debug, Default)]
struct SessionClock {
    state: SessionState,
    /// Wall-clock start; set iff `state == Recording`
    started_at: Option<DateTime<Local>>,
    /// Monotonic start used for elapsed time
    started_instant: Option<Instant>,
    /// Output file of the current or last recording
    output_path: Option<PathBuf>,
}

/// One stream's recording lifecycle
pub struct RecordingSession {
    id: Uuid,
    descriptor: StreamDescriptor,
    container_ext: String,
    clock: Mutex<SessionClock>,
    process: tokio::sync::Mutex<CaptureProcess>,
}

impl RecordingSession {
    pub fn new(descriptor: StreamDescriptor, settings: CaptureSettings) -> Self {
        Self {
            id: Uuid::new_v4(),
            descriptor,
            container_ext: settings.container_ext.clone(),
            clock: Mutex::new(SessionClock::default()),
            process: tokio::sync::Mutex::new(CaptureProcess::new(settings)),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn descriptor(&self) -> &StreamDescriptor {
        &self.descriptor
    }

    pub fn state(&self) -> SessionState {
        self.clock.lock().state
    }

    pub fn started_at(&self) -> Option<DateTime<Local>> {
        self.clock.lock().started_at
    }

    /// Output file of the current or most recent recording
    pub fn output_path(&self) -> Option<PathBuf> {
        self.clock.lock().output_path.clone()
    }

    /// Launch the capture process. Only valid from `NotStarted`.
    pub async fn start(&self) -> Result<(), LaunchError> {
        let mut process = self.process.lock().await;
        if self.state() != SessionState::NotStarted {
            return Ok(());
        }

        let started_at = Local::now();
        let started_instant = Instant::now();
        let output_path = self.descriptor.output_path(&started_at, &self.container_ext);

        process.start(&self.descriptor.source_address, &output_path)?;

        let mut clock = self.clock.lock();
        clock.state = SessionState::Recording;
        clock.started_at = Some(started_at);
        clock.started_instant = Some(started_instant);
        clock.output_path = Some(output_path);
        drop(clock);

        tracing::info!(
            "Session {} recording {} since {}",
            self.id,
            self.descriptor.source_address,
            started_at.format("%Y-%m-%d %H:%M:%S")
        );
        Ok(())
    }

    /// Stop the capture process. Only valid from `Recording`.
    ///
    /// The session ends up `Stopped` whenever the process is gone afterwards,
    /// even if it had to be killed; the shutdown error is still returned.
    pub async fn stop(&self) -> Result<(), ShutdownError> {
        let mut process = self.process.lock().await;
        if self.state() != SessionState::Recording {
            return Ok(());
        }

        let result = process.stop().await;

        if !process.is_running() {
            let mut clock = self.clock.lock();
            clock.state = SessionState::Stopped;
            clock.started_at = None;
            clock.started_instant = None;
            drop(clock);

            tracing::info!("Session {} stopped ({})", self.id, self.descriptor.source_address);
        }
        result
    }

    /// Time spent recording, truncated to whole seconds; zero unless recording
    pub fn elapsed(&self) -> Duration {
        let clock = self.clock.lock();
        match (clock.state, clock.started_instant) {
            (SessionState::Recording, Some(started)) => {
                Duration::from_secs(started.elapsed().as_secs())
            }
            _ => Duration::ZERO,
        }
    }

    /// `elapsed()` as `HH:MM:SS`
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed())
    }

    /// Whether the capture process is alive; `false` while a transition holds it
    pub fn is_capturing(&self) -> bool {
        match self.process.try_lock() {
            Ok(mut process) => process.is_running(),
            Err(_) => false,
        }
    }

    /// Move a recording session whose capture exited on its own to `Stopped`.
    ///
    /// Returns `true` if the session was stopped by this call. Skipped while a
    /// start or stop holds the process.
    pub fn reap_exited(&self) -> bool {
        let Ok(mut process) = self.process.try_lock() else {
            return false;
        };
        if self.state() != SessionState::Recording || process.is_running() {
            return false;
        }

        let mut clock = self.clock.lock();
        clock.state = SessionState::Stopped;
        clock.started_at = None;
        clock.started_instant = None;
        drop(clock);
        drop(process);

        tracing::warn!(
            "Session {} capture for {} exited unexpectedly",
            self.id,
            self.descriptor.source_address
        );
        true
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("descriptor", &self.descriptor)
            .field("state", &self.state())
            .finish()
    }
}
