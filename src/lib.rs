//! Stream Recorder - supervised multi-stream network video recording.
//!
//! Runs one external capture process per stream, tracks how long each has
//! been recording, and reports per-second status snapshots to observers.

pub mod capture;
pub mod config;
pub mod recorder;
pub mod utils;

pub use config::{CaptureSettings, RecorderConfig};
pub use recorder::{
    LoggingObserver, RecordingSession, SessionState, SessionSupervisor, StatusObserver,
    StatusSnapshot, StreamDescriptor, SupervisorEvent,
};
pub use utils::error::{AggregateError, LaunchError, SessionError, ShutdownError};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stream_recorder=debug,stream_recorder_lib=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
