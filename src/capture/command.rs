//! Command lines for the external capture and preview tools

use crate::utils::error::LaunchError;
use std::path::Path;
use std::process::{Command, Stdio};

/// Byte written to the capture tool's stdin to make it finalize and exit
pub const QUIT_SIGNAL: u8 = b'q';

/// Check that `address` looks like `scheme://rest` before spawning anything
pub fn validate_source_address(address: &str) -> Result<(), LaunchError> {
    let invalid = |reason: &str| LaunchError::InvalidAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };

    if address.is_empty() {
        return Err(invalid("address is empty"));
    }
    if address.chars().any(char::is_whitespace) {
        return Err(invalid("address contains whitespace"));
    }

    let (scheme, rest) = address
        .split_once("://")
        .ok_or_else(|| invalid("missing scheme"))?;

    let scheme_ok = scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !scheme_ok {
        return Err(invalid("malformed scheme"));
    }
    if rest.is_empty() {
        return Err(invalid("missing host"));
    }

    Ok(())
}

/// Arguments for a lossless network-to-file copy of `source_address`
pub fn capture_args(source_address: &str, output_path: &Path) -> Vec<String> {
    vec![
        "-rtsp_transport".to_string(),
        "tcp".to_string(),
        "-use_wallclock_as_timestamps".to_string(),
        "1".to_string(),
        "-i".to_string(),
        source_address.to_string(),
        "-c".to_string(),
        "copy".to_string(),
        "-y".to_string(),
        output_path.to_string_lossy().to_string(),
    ]
}

/// Arguments for a low-latency preview of `source_address`
pub fn preview_args(source_address: &str) -> Vec<String> {
    [
        "-rtsp_transport",
        "tcp",
        "-i",
        source_address,
        "-fflags",
        "nobuffer",
        "-flags",
        "low_delay",
        "-framedrop",
        "-sync",
        "ext",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Open a live preview window for a stream.
///
/// Fire-and-forget: the preview process is reaped on a background thread
/// and its exit status is only logged.
pub fn launch_preview(program: &str, source_address: &str) -> Result<(), LaunchError> {
    validate_source_address(source_address)?;

    let args = preview_args(source_address);
    tracing::debug!("Starting preview: {} {:?}", program, args);

    let mut child = Command::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| LaunchError::Spawn {
            program: program.to_string(),
            source,
        })?;

    let address = source_address.to_string();
    std::thread::spawn(move || match child.wait() {
        Ok(status) => tracing::debug!("Preview of {} exited: {}", address, status),
        Err(e) => tracing::warn!("Failed to wait for preview of {}: {}", address, e),
    });

    Ok(())
}
