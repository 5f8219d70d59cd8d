//! Shared utilities

pub mod error;

pub use error::{
    AggregateError, ConfigError, LaunchError, SessionError, SessionFailure, ShutdownError,
    SupervisorError,
};
