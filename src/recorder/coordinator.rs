//! Session supervisor
//!
//! Owns the registered recording sessions, starts and stops them in bulk,
//! and runs the periodic status broadcast while recording.

use super::observer::{StatusObserver, StatusSnapshot, SupervisorEvent};
use super::session::RecordingSession;
use super::state::{SessionState, StreamDescriptor};
use crate::config::{CaptureSettings, RecorderConfig};
use crate::utils::error::{AggregateError, SessionError, SessionFailure, SupervisorError};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::MissedTickBehavior;

type Observers = Arc<RwLock<Vec<Arc<dyn StatusObserver>>>>;

/// Running broadcast task and its close signal
struct Broadcaster {
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Manages a fixed, ordered set of recording sessions
pub struct SessionSupervisor {
    settings: CaptureSettings,
    status_interval: Duration,

    /// Sessions in registration order
    sessions: Vec<Arc<RecordingSession>>,

    /// True from `start_all` until `stop_all` completes
    running: bool,

    observers: Observers,
    event_tx: broadcast::Sender<SupervisorEvent>,
    broadcaster: Option<Broadcaster>,
}

impl SessionSupervisor {
    pub fn new(settings: CaptureSettings, status_interval: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            settings,
            status_interval,
            sessions: Vec::new(),
            running: false,
            observers: Arc::new(RwLock::new(Vec::new())),
            event_tx,
            broadcaster: None,
        }
    }

    /// Build a supervisor with every configured stream registered
    pub fn from_config(config: &RecorderConfig) -> Self {
        let mut supervisor = Self::new(config.capture_settings(), config.status_interval());
        for descriptor in &config.streams {
            supervisor.push_session(descriptor.clone());
        }
        supervisor
    }

    /// Register a stream. Closed while recording is running.
    pub fn register(&mut self, descriptor: StreamDescriptor) -> Result<(), SupervisorError> {
        if self.running {
            return Err(SupervisorError::RegistrationClosed);
        }
        self.push_session(descriptor);
        Ok(())
    }

    /// Register imported streams in order; returns how many were added
    pub fn register_batch<I>(&mut self, descriptors: I) -> Result<usize, SupervisorError>
    where
        I: IntoIterator<Item = StreamDescriptor>,
    {
        if self.running {
            return Err(SupervisorError::RegistrationClosed);
        }
        let before = self.sessions.len();
        for descriptor in descriptors {
            self.push_session(descriptor);
        }
        Ok(self.sessions.len() - before)
    }

    fn push_session(&mut self, descriptor: StreamDescriptor) {
        let session = RecordingSession::new(descriptor, self.settings.clone());
        tracing::info!(
            "Registered stream #{} {} (session {})",
            self.sessions.len(),
            session.descriptor().source_address,
            session.id()
        );
        self.sessions.push(Arc::new(session));
    }

    pub fn sessions(&self) -> &[Arc<RecordingSession>] {
        &self.sessions
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Add a callback observer; takes effect from the next tick
    pub fn add_observer(&self, observer: Arc<dyn StatusObserver>) {
        self.observers.write().push(observer);
    }

    /// Subscribe to snapshot and finished events
    pub fn subscribe(&self) -> broadcast::Receiver<SupervisorEvent> {
        self.event_tx.subscribe()
    }

    /// Current elapsed time of every session, in registration order
    pub fn elapsed_times(&self) -> Vec<String> {
        self.sessions.iter().map(|s| s.elapsed_display()).collect()
    }

    /// Start every session in registration order and begin broadcasting.
    ///
    /// Every session is attempted; launch failures are collected and
    /// returned together. Broadcasting starts even if some sessions failed.
    /// Sessions left `Stopped` by an earlier run are replaced by fresh ones.
    pub async fn start_all(&mut self) -> Result<(), AggregateError> {
        if self.running {
            tracing::warn!("start_all called while already recording");
            return Ok(());
        }

        for slot in self.sessions.iter_mut() {
            if slot.state() == SessionState::Stopped {
                let descriptor = slot.descriptor().clone();
                *slot = Arc::new(RecordingSession::new(descriptor, self.settings.clone()));
            }
        }

        tracing::info!("Starting {} recording session(s)", self.sessions.len());

        let mut errors = AggregateError::default();
        for (index, session) in self.sessions.iter().enumerate() {
            if let Err(e) = session.start().await {
                tracing::warn!(
                    "Failed to start {}: {}",
                    session.descriptor().source_address,
                    e
                );
                errors.push(failure(index, session, e.into()));
            }
        }

        self.running = true;
        self.spawn_broadcaster();

        errors.into_result()
    }

    /// Stop every session concurrently, end broadcasting, then notify
    /// observers that recording finished.
    ///
    /// No-op when not running.
    pub async fn stop_all(&mut self) -> Result<(), AggregateError> {
        if !self.running {
            return Ok(());
        }

        tracing::info!("Stopping {} recording session(s)", self.sessions.len());

        let mut stops = JoinSet::new();
        for (index, session) in self.sessions.iter().enumerate() {
            let session = Arc::clone(session);
            stops.spawn(async move { (index, session.stop().await) });
        }

        let mut errors = AggregateError::default();
        let mut pending: Vec<usize> = (0..self.sessions.len()).collect();
        while let Some(joined) = stops.join_next().await {
            match joined {
                Ok((index, result)) => {
                    pending.retain(|&i| i != index);
                    if let Err(e) = result {
                        let session = &self.sessions[index];
                        tracing::warn!(
                            "Failed to stop {} cleanly: {}",
                            session.descriptor().source_address,
                            e
                        );
                        errors.push(failure(index, session, e.into()));
                    }
                }
                Err(e) => tracing::error!("Stop task failed: {}", e),
            }
        }
        // Tasks that panicked or were cancelled never reported their index.
        for index in pending {
            let session = &self.sessions[index];
            errors.push(failure(
                index,
                session,
                SessionError::Task("stop task did not complete".to_string()),
            ));
        }

        self.running = false;
        self.shutdown_broadcaster().await;

        for observer in self.observers.read().iter() {
            observer.on_finished();
        }
        let _ = self.event_tx.send(SupervisorEvent::Finished);
        tracing::info!("All recording sessions stopped");

        errors.into_result()
    }

    fn spawn_broadcaster(&mut self) {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let sessions: Arc<[Arc<RecordingSession>]> = self.sessions.clone().into();
        let task = tokio::spawn(broadcast_loop(
            sessions,
            Arc::clone(&self.observers),
            self.event_tx.clone(),
            self.status_interval,
            shutdown_rx,
        ));
        self.broadcaster = Some(Broadcaster { shutdown_tx, task });
    }

    async fn shutdown_broadcaster(&mut self) {
        let Some(Broadcaster { shutdown_tx, task }) = self.broadcaster.take() else {
            return;
        };
        let _ = shutdown_tx.send(true);
        if let Err(e) = task.await {
            tracing::error!("Status broadcast task failed: {}", e);
        }
    }
}

impl Drop for SessionSupervisor {
    fn drop(&mut self) {
        if let Some(broadcaster) = self.broadcaster.take() {
            broadcaster.task.abort();
        }
        if !self.running {
            return;
        }

        tracing::warn!("Supervisor dropped while recording; call stop_all before dropping it");

        // Hand the sessions to a detached task so each capture still gets the
        // quit signal. Without a runtime they are killed when dropped.
        let sessions = std::mem::take(&mut self.sessions);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                for session in sessions {
                    handle.spawn(async move {
                        if let Err(e) = session.stop().await {
                            tracing::warn!(
                                "Failed to stop {} after drop: {}",
                                session.descriptor().source_address,
                                e
                            );
                        }
                    });
                }
            }
            Err(_) => tracing::warn!(
                "No async runtime available; {} capture process(es) will be killed",
                sessions.len()
            ),
        }
    }
}

fn failure(index: usize, session: &RecordingSession, error: SessionError) -> SessionFailure {
    let descriptor = session.descriptor();
    SessionFailure {
        index,
        source_address: descriptor.source_address.clone(),
        file_prefix: descriptor.file_prefix.clone(),
        error,
    }
}

/// Emit one snapshot per tick until the close signal arrives
async fn broadcast_loop(
    sessions: Arc<[Arc<RecordingSession>]>,
    observers: Observers,
    event_tx: broadcast::Sender<SupervisorEvent>,
    interval: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut sequence = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => break,
            _ = ticker.tick() => {
                for session in sessions.iter() {
                    session.reap_exited();
                }
                let snapshot = StatusSnapshot {
                    sequence,
                    elapsed: sessions.iter().map(|s| s.elapsed_display()).collect(),
                };
                sequence += 1;

                tracing::debug!("Status snapshot {}: {:?}", snapshot.sequence, snapshot.elapsed);
                for observer in observers.read().iter() {
                    observer.on_snapshot(&snapshot);
                }
                let _ = event_tx.send(SupervisorEvent::Snapshot(snapshot));
            }
        }
    }

    tracing::debug!("Status broadcast stopped after {} snapshot(s)", sequence);
}
