//! Capture process wrapper
//!
//! Owns at most one live capture subprocess. Stopping goes through the
//! tool's own quit key so the container trailer gets written; killing is
//! only the fallback once the bounded wait runs out.

use super::command::{capture_args, validate_source_address, QUIT_SIGNAL};
use crate::config::CaptureSettings;
use crate::utils::error::{LaunchError, ShutdownError};
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};

/// A live capture subprocess and its input channel
struct CaptureHandle {
    child: Child,
    stdin: ChildStdin,
}

/// One external capture process for one stream
pub struct CaptureProcess {
    settings: CaptureSettings,
    handle: Option<CaptureHandle>,
}

impl CaptureProcess {
    pub fn new(settings: CaptureSettings) -> Self {
        Self {
            settings,
            handle: None,
        }
    }

    /// Launch the capture tool writing `source_address` to `output_path`.
    ///
    /// Parent directories of `output_path` are created. Does nothing if a
    /// capture is already running.
    pub fn start(&mut self, source_address: &str, output_path: &Path) -> Result<(), LaunchError> {
        if self.is_running() {
            return Ok(());
        }

        validate_source_address(source_address)?;

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LaunchError::OutputDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let mut args = self.settings.args_prefix.clone();
        args.extend(capture_args(source_address, output_path));

        tracing::debug!("Starting capture: {} {:?}", self.settings.program, args);

        let mut child = Command::new(&self.settings.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| LaunchError::Spawn {
                program: self.settings.program.clone(),
                source,
            })?;

        let stdin = match child.stdin.take() {
            Some(stdin) => stdin,
            None => {
                let _ = child.start_kill();
                return Err(LaunchError::MissingStdin);
            }
        };

        tracing::info!(
            "Capture started for {} (pid {:?}) -> {:?}",
            source_address,
            child.id(),
            output_path
        );

        self.handle = Some(CaptureHandle { child, stdin });
        Ok(())
    }

    /// Ask the capture tool to finalize and exit, then wait for it.
    ///
    /// Waits at most `stop_timeout`; after that the process is killed and
    /// `ShutdownError::ForceKilled` is returned. Either way the handle is
    /// released once the process is gone.
    pub async fn stop(&mut self) -> Result<(), ShutdownError> {
        if !self.is_running() {
            return Ok(());
        }
        let Some(CaptureHandle { mut child, mut stdin }) = self.handle.take() else {
            return Ok(());
        };

        let signal_result = match stdin.write_all(&[QUIT_SIGNAL]).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        // Closing stdin as well: tools that ignore the quit byte still see EOF.
        drop(stdin);

        if let Err(e) = &signal_result {
            tracing::warn!("Failed to send quit signal (pid {:?}): {}", child.id(), e);
        }

        let timeout = self.settings.stop_timeout;
        match tokio::time::timeout(timeout, child.wait()).await {
            Ok(Ok(status)) => {
                tracing::info!("Capture process exited: {}", status);
                Ok(())
            }
            Ok(Err(e)) => {
                // The child may still be alive; make sure it does not outlive us.
                let _ = child.kill().await;
                Err(ShutdownError::Wait(e))
            }
            Err(_) => {
                tracing::warn!(
                    "Capture process (pid {:?}) did not exit within {:?}, killing it",
                    child.id(),
                    timeout
                );
                child.kill().await.map_err(ShutdownError::Kill)?;
                match signal_result {
                    Err(e) => Err(ShutdownError::Signal(e)),
                    Ok(()) => Err(ShutdownError::ForceKilled { timeout }),
                }
            }
        }
    }

    /// Non-blocking liveness check.
    ///
    /// A process that exited on its own is reaped and its handle released.
    pub fn is_running(&mut self) -> bool {
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        match handle.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                tracing::warn!("Capture process exited unexpectedly: {}", status);
                self.handle = None;
                false
            }
            Err(e) => {
                tracing::warn!("Failed to poll capture process: {}", e);
                true
            }
        }
    }

    /// OS process id of the running capture, if any
    pub fn id(&self) -> Option<u32> {
        self.handle.as_ref().and_then(|h| h.child.id())
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::tempdir;

    /// Stand-in capture tool: waits for stdin to close, ignores its arguments
    pub(crate) fn cooperative_settings() -> CaptureSettings {
        CaptureSettings {
            program: "sh".to_string(),
            args_prefix: vec![
                "-c".to_string(),
                "read -r _ ; exit 0".to_string(),
                "capture".to_string(),
            ],
            container_ext: "mkv".to_string(),
            stop_timeout: Duration::from_secs(5),
        }
    }

    /// Stand-in capture tool that never reacts to the quit signal
    pub(crate) fn stubborn_settings() -> CaptureSettings {
        CaptureSettings {
            program: "sh".to_string(),
            args_prefix: vec![
                "-c".to_string(),
                "exec sleep 30".to_string(),
                "capture".to_string(),
            ],
            container_ext: "mkv".to_string(),
            stop_timeout: Duration::from_millis(200),
        }
    }

    #[tokio::test]
    async fn test_start_creates_parent_dirs_and_stops() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("20240101/10/00/cam_20240101_100000.mkv");
        let mut process = CaptureProcess::new(cooperative_settings());

        process.start("rtsp://cam/1", &output).unwrap();
        assert!(process.is_running());
        assert!(output.parent().unwrap().is_dir());
        assert!(process.id().is_some());

        process.stop().await.unwrap();
        assert!(!process.is_running());
        assert!(process.id().is_none());
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("a.mkv");
        let mut process = CaptureProcess::new(cooperative_settings());

        process.start("rtsp://cam/1", &output).unwrap();
        let pid = process.id();
        process.start("rtsp://cam/1", &output).unwrap();
        assert_eq!(process.id(), pid);

        process.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_when_not_running_is_noop() {
        let mut process = CaptureProcess::new(cooperative_settings());
        assert!(process.stop().await.is_ok());
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_invalid_address_does_not_spawn() {
        let dir = tempdir().unwrap();
        let mut process = CaptureProcess::new(cooperative_settings());

        let err = process
            .start("not a url", &dir.path().join("a.mkv"))
            .unwrap_err();
        assert!(matches!(err, LaunchError::InvalidAddress { .. }));
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempdir().unwrap();
        let mut settings = cooperative_settings();
        settings.program = "definitely-not-a-real-capture-tool".to_string();
        let mut process = CaptureProcess::new(settings);

        let err = process
            .start("rtsp://cam/1", &dir.path().join("a.mkv"))
            .unwrap_err();
        assert!(matches!(err, LaunchError::Spawn { .. }));
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_stubborn_process_is_force_killed() {
        let dir = tempdir().unwrap();
        let mut process = CaptureProcess::new(stubborn_settings());
        process.start("rtsp://cam/1", &dir.path().join("a.mkv")).unwrap();

        let err = process.stop().await.unwrap_err();
        assert!(matches!(
            err,
            ShutdownError::ForceKilled { timeout } if timeout == Duration::from_millis(200)
        ));
        assert!(!process.is_running());
    }

    #[tokio::test]
    async fn test_abnormal_exit_releases_handle() {
        let dir = tempdir().unwrap();
        let mut settings = cooperative_settings();
        settings.args_prefix[1] = "exit 1".to_string();
        let mut process = CaptureProcess::new(settings);
        process.start("rtsp://cam/1", &dir.path().join("a.mkv")).unwrap();

        let mut exited = false;
        for _ in 0..50 {
            if !process.is_running() {
                exited = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(exited);
        assert!(process.stop().await.is_ok());
    }
}
