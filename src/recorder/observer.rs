//! Status observers
//!
//! Consumers of the supervisor's periodic elapsed-time snapshots.

use serde::{Deserialize, Serialize};

/// Elapsed time of every registered session, in registration order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSnapshot {
    /// Tick counter, starting at 0 for each run
    pub sequence: u64,

    /// `HH:MM:SS` per session; entry `i` is the `i`-th registered stream
    pub elapsed: Vec<String>,
}

impl StatusSnapshot {
    pub fn len(&self) -> usize {
        self.elapsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elapsed.is_empty()
    }
}

/// Events emitted by the supervisor
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorEvent {
    /// Periodic status update
    Snapshot(StatusSnapshot),
    /// All sessions stopped; no snapshot follows until the next start
    Finished,
}

/// Receives supervisor status callbacks.
///
/// Called from the broadcast task, so implementations should return quickly.
pub trait StatusObserver: Send + Sync {
    fn on_snapshot(&self, snapshot: &StatusSnapshot);

    fn on_finished(&self);
}

/// Logs snapshots through `tracing`
#[derive(Debug, Default)]
pub struct LoggingObserver;

impl StatusObserver for LoggingObserver {
    fn on_snapshot(&self, snapshot: &StatusSnapshot) {
        tracing::info!("Recording times: [{}]", snapshot.elapsed.join(", "));
    }

    fn on_finished(&self) {
        tracing::info!("All recordings finished");
    }
}
