//! External capture tooling
//!
//! Command-line builders for the capture and preview tools, and the
//! process wrapper that owns one running capture.

pub mod command;
pub mod process;

pub use command::{launch_preview, validate_source_address, QUIT_SIGNAL};
pub use process::CaptureProcess;
