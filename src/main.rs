//! Headless recorder: records every configured stream until Ctrl-C.
//!
//! Usage:
//!   stream-recorder <config.json>
//!   stream-recorder preview <config.json> <source-address>

use anyhow::{bail, Context};
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use stream_recorder_lib::capture::launch_preview;
use stream_recorder_lib::{
    init_logging, AggregateError, LoggingObserver, RecorderConfig, SessionSupervisor,
};

const USAGE: &str =
    "usage: stream-recorder <config.json> | stream-recorder preview <config.json> <address>";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    tracing::info!("Starting Stream Recorder v{}", env!("CARGO_PKG_VERSION"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.as_slice() {
        [config_path] => record(PathBuf::from(config_path)).await,
        [command, config_path, address] if command == "preview" => {
            let config = RecorderConfig::load(&PathBuf::from(config_path))
                .with_context(|| format!("loading {}", config_path))?;
            launch_preview(&config.ffplay_path, address)?;
            Ok(())
        }
        _ => bail!(USAGE),
    }
}

async fn record(config_path: PathBuf) -> anyhow::Result<()> {
    let config = RecorderConfig::load(&config_path)
        .with_context(|| format!("loading {:?}", config_path))?;
    if config.streams.is_empty() {
        bail!("no streams configured in {:?}", config_path);
    }

    let mut supervisor = SessionSupervisor::from_config(&config);
    supervisor.add_observer(Arc::new(LoggingObserver));

    record_until(&mut supervisor, tokio::signal::ctrl_c()).await;
    Ok(())
}

/// Record until `shutdown` resolves, then stop every session.
///
/// A failing `shutdown` future still ends in `stop_all`, so captures always
/// get their quit signal.
async fn record_until<F>(supervisor: &mut SessionSupervisor, shutdown: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = supervisor.start_all().await {
        report("start", &e);
    }

    match shutdown.await {
        Ok(()) => tracing::info!("Interrupt received, stopping recordings"),
        Err(e) => tracing::error!("Failed to wait for Ctrl-C, stopping recordings: {}", e),
    }

    if let Err(e) = supervisor.stop_all().await {
        report("stop", &e);
    }
}

fn report(action: &str, errors: &AggregateError) {
    for failure in &errors.failures {
        tracing::error!(
            "Failed to {} {} ({}): {}",
            action,
            failure.source_address,
            failure.file_prefix,
            failure.error
        );
    }
}
