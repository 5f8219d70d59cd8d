//! Recording system module
//!
//! This module implements the multi-stream recording core:
//! - RecordingSession pairing one stream with its capture process
//! - SessionSupervisor to start, stop and observe all sessions
//! - StatusObserver for consumers of the periodic status snapshots

pub mod coordinator;
pub mod observer;
pub mod session;
pub mod state;

pub use coordinator::SessionSupervisor;
pub use observer::{LoggingObserver, StatusObserver, StatusSnapshot, SupervisorEvent};
pub use session::RecordingSession;
pub use state::{SessionState, StreamDescriptor};
